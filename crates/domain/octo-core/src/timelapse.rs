use crate::Item;
use serde::{Deserialize, Serialize};

/// Timelapse recording settings. Servers omit most fields when recording is off.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelapseConfig {
    pub capture_post_roll: bool,
    pub fps: u32,
    pub interval: u32,
    pub post_roll: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A rendered timelapse video as listed by `/api/timelapse`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timelapse {
    #[serde(rename = "bytes")]
    pub size: u64,
    #[serde(default)]
    pub date: String,
    pub name: String,
    #[serde(rename = "size", default)]
    pub size_str: String,
    #[serde(rename = "url")]
    pub path: String,
}

/// Response body of `GET /api/timelapse`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelapseListing {
    #[serde(default)]
    pub config: TimelapseConfig,
    #[serde(default)]
    pub files: Vec<Timelapse>,
}

impl From<&Timelapse> for Item {
    fn from(t: &Timelapse) -> Item {
        Item::new(t.name.clone(), t.size, t.path.clone())
    }
}

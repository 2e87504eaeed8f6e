use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Reads an explicit `null` as `0.0`, the way OctoPrint reports unset setpoints.
pub(crate) fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Option::<f64>::deserialize(d).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrinterTempState {
    #[serde(deserialize_with = "null_as_zero")]
    pub actual: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub offset: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub target: f64,
}

impl fmt::Display for PrinterTempState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:.2}, target: {:.1}}}", self.actual, self.target)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoricalTempEntry {
    #[serde(rename = "time")]
    pub timestamp: i64,
    pub bed: Option<PrinterTempState>,
    pub tool0: Option<PrinterTempState>,
    pub tool1: Option<PrinterTempState>,
}

impl HistoricalTempEntry {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

fn fmt_temp(t: &Option<PrinterTempState>) -> String {
    match t {
        Some(t) => t.to_string(),
        None => "-".to_string(),
    }
}

impl fmt::Display for HistoricalTempEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time() {
            Some(t) => write!(f, "{{@{t}: bed={}", fmt_temp(&self.bed))?,
            None => write!(f, "{{@{}: bed={}", self.timestamp, fmt_temp(&self.bed))?,
        }
        if let Some(t) = &self.tool0 {
            write!(f, ", tool0={t}")?;
        }
        if let Some(t) = &self.tool1 {
            write!(f, ", tool1={t}")?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrinterStateFlags {
    pub closed_or_error: bool,
    pub error: bool,
    pub operational: bool,
    pub paused: bool,
    pub printing: bool,
    pub ready: bool,
    pub sd_ready: bool,
}

impl PrinterStateFlags {
    /// Names of the set flags, in a fixed order.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.closed_or_error, "ClosedOrError"),
            (self.error, "Error"),
            (self.operational, "Operational"),
            (self.paused, "Paused"),
            (self.printing, "Printing"),
            (self.ready, "Ready"),
            (self.sd_ready, "SDReady"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrinterStateText {
    pub flags: PrinterStateFlags,
    pub text: String,
}

impl fmt::Display for PrinterStateText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (flags: {})", self.text, self.flags.names().join("|"))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SdState {
    pub ready: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Temperatures {
    pub bed: Option<PrinterTempState>,
    pub history: Vec<HistoricalTempEntry>,
    pub tool0: Option<PrinterTempState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool1: Option<PrinterTempState>,
}

/// Response body of `GET /api/printer`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PrinterState {
    pub sd: SdState,
    pub state: PrinterStateText,
    pub temperature: Temperatures,
}

use crate::printer::null_as_zero;
use serde::{Deserialize, Serialize};

// An idle server reports most job fields as `null`.

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilamentUsage {
    #[serde(deserialize_with = "null_as_zero")]
    pub length: f64,
    #[serde(deserialize_with = "null_as_zero")]
    pub volume: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Filament {
    pub tool0: Option<FilamentUsage>,
    pub tool1: Option<FilamentUsage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobFile {
    #[serde(rename = "date")]
    pub timestamp: Option<i64>,
    pub name: Option<String>,
    pub origin: Option<String>,
    pub path: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Job {
    pub average_print_time: Option<f64>,
    pub estimated_print_time: Option<f64>,
    pub filament: Option<Filament>,
    pub file: JobFile,
    #[serde(rename = "lastPrintTime")]
    pub last_print_timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobProgress {
    pub completion: Option<f64>,
    pub filepos: Option<u64>,
    pub print_time: Option<u64>,
    pub print_time_left: Option<u64>,
    pub print_time_left_origin: Option<String>,
}

/// Response body of `GET /api/job`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobState {
    pub job: Job,
    pub progress: JobProgress,
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_job_with_nulls_parses() {
        let body = r#"{
            "job": {
                "averagePrintTime": null,
                "estimatedPrintTime": null,
                "filament": null,
                "file": {"date": null, "name": null, "origin": null, "path": null, "size": null},
                "lastPrintTime": null
            },
            "progress": {
                "completion": null,
                "filepos": null,
                "printTime": null,
                "printTimeLeft": null,
                "printTimeLeftOrigin": null
            },
            "state": "Operational"
        }"#;
        let st: JobState = serde_json::from_str(body).unwrap();
        assert_eq!(st.state, "Operational");
        assert!(st.job.file.name.is_none());
        assert!(st.progress.completion.is_none());
    }

    #[test]
    fn active_job_parses() {
        let body = r#"{
            "job": {
                "averagePrintTime": 5120.4,
                "estimatedPrintTime": 4900.0,
                "filament": {"tool0": {"length": 810.5, "volume": 1.95}},
                "file": {
                    "date": 1709400000,
                    "name": "benchy.gcode",
                    "origin": "local",
                    "path": "benchy.gcode",
                    "size": 1048576
                },
                "lastPrintTime": 5002.1
            },
            "progress": {
                "completion": 42.5,
                "filepos": 445645,
                "printTime": 2100,
                "printTimeLeft": 2800,
                "printTimeLeftOrigin": "estimate"
            },
            "state": "Printing"
        }"#;
        let st: JobState = serde_json::from_str(body).unwrap();
        assert_eq!(st.job.file.name.as_deref(), Some("benchy.gcode"));
        assert_eq!(st.job.file.size, Some(1_048_576));
        let tool0 = st.job.filament.unwrap().tool0.unwrap();
        assert!((tool0.length - 810.5).abs() < f64::EPSILON);
        assert_eq!(st.progress.print_time_left, Some(2800));
        assert_eq!(st.progress.print_time_left_origin.as_deref(), Some("estimate"));
    }

    #[test]
    fn null_filament_figures_read_as_zero() {
        let body = r#"{"job": {"filament": {"tool0": {"length": null, "volume": null}}}}"#;
        let st: JobState = serde_json::from_str(body).unwrap();
        let tool0 = st.job.filament.unwrap().tool0.unwrap();
        assert_eq!(tool0, FilamentUsage::default());
    }
}

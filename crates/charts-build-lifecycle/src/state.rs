//! Machine-readable snapshot of the last status run (`logs/state.json`)

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::status::Status;

pub const STATE_FILE: &str = "state.json";

#[derive(Serialize)]
struct State<'a> {
    state_file: String,
    #[serde(flatten)]
    status: &'a Status,
}

/// Write `status` as pretty JSON into `logs_dir`
pub fn write_state(logs_dir: &Path, status: &Status) -> Result<PathBuf> {
    std::fs::create_dir_all(logs_dir)?;
    let path = logs_dir.join(STATE_FILE);
    let state = State {
        state_file: path.display().to_string(),
        status,
    };
    let mut json = serde_json::to_string_pretty(&state)?;
    json.push('\n');
    std::fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), "wrote lifecycle state");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::assets_from;
    use tempfile::TempDir;

    #[test]
    fn test_write_state() {
        let temp = TempDir::new().unwrap();
        let status = Status {
            to_be_forward_ported: assets_from([("fleet", vec!["103.2.0"])]),
            ..Default::default()
        };

        let path = write_state(temp.path(), &status).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["to_be_forward_ported"]["fleet"][0]["version"], "103.2.0");
        assert_eq!(value["released_in_lifecycle"], serde_json::json!({}));
        assert!(value["state_file"].as_str().unwrap().ends_with("state.json"));
    }
}

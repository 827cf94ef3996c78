//! Read/write the session store JSON.
//!
//! The session file stands in for the dashboard's client-side store:
//! - the last committed `WidgetState`
//! - the commodity panels computed under that state
//! - the data fingerprint those panels were computed from
//!
//! A missing file means a first render (no prior state).

use std::collections::BTreeMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{DataFingerprint, WidgetState};
use crate::error::AppError;
use crate::pipeline::CommodityPanel;

/// Persisted session contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub tool: String,
    #[serde(default)]
    pub fingerprint: Option<DataFingerprint>,
    pub state: Option<WidgetState>,
    #[serde(default)]
    pub panels: BTreeMap<String, CommodityPanel>,
}

impl SessionFile {
    pub fn new(
        fingerprint: Option<DataFingerprint>,
        state: Option<WidgetState>,
        panels: BTreeMap<String, CommodityPanel>,
    ) -> Self {
        Self {
            tool: "fpt".to_string(),
            fingerprint,
            state,
            panels,
        }
    }

    /// Keep the stored state only if it was computed from `fingerprint`.
    pub fn retain_if_matching(mut self, fingerprint: &DataFingerprint) -> Self {
        if self.fingerprint.as_ref() != Some(fingerprint) {
            if self.state.is_some() || !self.panels.is_empty() {
                info!(panels = self.panels.len(), "discarding session computed from other data");
            }
            self.state = None;
            self.panels.clear();
        }
        self.fingerprint = Some(fingerprint.clone());
        self
    }
}

/// Write the session file.
pub fn write_session_json(path: &Path, session: &SessionFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create session JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, session)
        .map_err(|e| AppError::io(format!("Failed to write session JSON: {e}")))?;
    Ok(())
}

/// Read the session file; a missing file yields an empty session.
pub fn read_session_json(path: &Path) -> Result<SessionFile, AppError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SessionFile::new(None, None, BTreeMap::new())),
        Err(e) => {
            return Err(AppError::io(format!("Failed to open session JSON '{}': {e}", path.display())));
        }
    };
    serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid session JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CleanConfig, DateRange, FilterParameters, SourceKind, SummaryStat};
    use chrono::NaiveDate;

    #[test]
    fn missing_file_is_first_render() {
        let dir = tempfile::tempdir().unwrap();
        let session = read_session_json(&dir.path().join("absent.json")).unwrap();
        assert!(session.state.is_none());
        assert!(session.panels.is_empty());
    }

    fn sample_fingerprint(seed: u64) -> DataFingerprint {
        DataFingerprint {
            source: SourceKind::Sample,
            seed: Some(seed),
            data_dir: None,
            base_url: None,
            clean: CleanConfig::default(),
        }
    }

    fn stored_session() -> SessionFile {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2021, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 15).unwrap(),
        )
        .unwrap();
        let params = FilterParameters::new("Japan", range, ["Rice"], ["Tokyo"]);
        let panels = BTreeMap::from([(
            "Rice".to_string(),
            CommodityPanel {
                commodity: "Rice".to_string(),
                summary: SummaryStat::empty("Rice"),
                series: Vec::new(),
            },
        )]);
        SessionFile::new(
            Some(sample_fingerprint(1)),
            Some(WidgetState::from_params(&params, false)),
            panels,
        )
    }

    #[test]
    fn session_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let session = stored_session();

        write_session_json(&path, &session).unwrap();
        assert_eq!(read_session_json(&path).unwrap(), session);
    }

    #[test]
    fn other_data_discards_state_and_panels() {
        let kept = stored_session().retain_if_matching(&sample_fingerprint(1));
        assert!(kept.state.is_some());
        assert_eq!(kept.panels.len(), 1);

        let reseeded = stored_session().retain_if_matching(&sample_fingerprint(2));
        assert!(reseeded.state.is_none());
        assert!(reseeded.panels.is_empty());
        assert_eq!(reseeded.fingerprint, Some(sample_fingerprint(2)));

        let mut stricter = sample_fingerprint(1);
        stricter.clean.market_abundance_threshold = 0.9;
        assert!(stored_session().retain_if_matching(&stricter).panels.is_empty());
    }

    #[test]
    fn session_without_fingerprint_is_discarded() {
        let json = r#"{"tool":"fpt","state":null,"panels":{}}"#;
        let legacy: SessionFile = serde_json::from_str(json).unwrap();
        assert!(legacy.fingerprint.is_none());

        let mut with_panels = stored_session();
        with_panels.fingerprint = None;
        assert!(with_panels.retain_if_matching(&sample_fingerprint(1)).panels.is_empty());
    }
}

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Reads a submission payload from a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, PayloadLoadError> {
    let content = fs::read_to_string(path).map_err(|e| PayloadLoadError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| PayloadLoadError::Json {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Data required to submit a sequence to the template-selection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitSelectTemplate {
    pub query_id: String,
    pub query_sequence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub meta: Option<Value>,
}

impl SubmitSelectTemplate {
    pub fn new(query_id: impl Into<String>, query_sequence: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            query_sequence: query_sequence.into(),
            task_id: None,
            meta: None,
        }
    }
}

/// Data required to submit an alignment to the homology-modelling service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAlignment {
    pub target_sequence: String,
    pub template_sequence: String,
    pub template_seqres_offset: i64,
    pub pdb_id: String,
    pub auth_asym_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub meta: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::fields_from;
    use tempfile::tempdir;

    #[test]
    fn select_template_omits_absent_task_id() {
        let fields = fields_from(&SubmitSelectTemplate::new("query", "MKV")).unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["query_id"], "query");
        assert_eq!(fields["query_sequence"], "MKV");
    }

    #[test]
    fn alignment_wire_form_has_exact_fields() {
        let payload = SubmitAlignment {
            target_sequence: "AAA".to_string(),
            template_sequence: "AAB".to_string(),
            template_seqres_offset: 3,
            pdb_id: "1abc".to_string(),
            auth_asym_id: "A".to_string(),
            assembly_id: Some(1),
            project_id: None,
            meta: Some(serde_json::json!({"note": "local only"})),
        };

        let fields = fields_from(&payload).unwrap();

        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "assembly_id",
                "auth_asym_id",
                "pdb_id",
                "target_sequence",
                "template_seqres_offset",
                "template_sequence"
            ]
        );
        assert_eq!(fields["template_seqres_offset"], "3");
    }

    #[test]
    fn load_json_accepts_meta_and_missing_optionals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aln.json");
        fs::write(
            &path,
            r#"{
                "target_sequence": "AAA",
                "template_sequence": "AAB",
                "template_seqres_offset": 10,
                "pdb_id": "1abc",
                "auth_asym_id": "B",
                "meta": {"source": "test"}
            }"#,
        )
        .unwrap();

        let payload: SubmitAlignment = load_json(&path).unwrap();

        assert_eq!(payload.template_seqres_offset, 10);
        assert!(payload.assembly_id.is_none());
        assert!(payload.meta.is_some());
    }

    #[test]
    fn load_json_reports_bad_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        let missing: Result<SubmitSelectTemplate, _> = load_json(&dir.path().join("missing.json"));
        let bad: Result<SubmitSelectTemplate, _> = load_json(&path);

        assert!(matches!(missing, Err(PayloadLoadError::Io { .. })));
        assert!(matches!(bad, Err(PayloadLoadError::Json { .. })));
    }
}

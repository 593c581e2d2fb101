use super::submission::SubmitAlignment;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A candidate structural template match for a region of the query sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedHit {
    pub uuid: String,
    #[serde(default)]
    pub ff_id: String,
    #[serde(default)]
    pub ff_name: String,
    #[serde(default)]
    pub query_range: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An alignment of the query region onto one template chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAlignment {
    pub pdb_id: String,
    pub auth_asym_id: String,
    pub template_seqres_offset: i64,
    pub target_sequence: String,
    pub template_sequence: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&TemplateAlignment> for SubmitAlignment {
    fn from(aln: &TemplateAlignment) -> Self {
        SubmitAlignment {
            target_sequence: aln.target_sequence.clone(),
            template_sequence: aln.template_sequence.clone(),
            template_seqres_offset: aln.template_seqres_offset,
            pdb_id: aln.pdb_id.clone(),
            auth_asym_id: aln.auth_asym_id.clone(),
            assembly_id: None,
            project_id: None,
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolved_hit_keeps_unknown_fields() {
        let hit: ResolvedHit = serde_json::from_value(json!({
            "uuid": "h1",
            "ff_id": "1.10.8.10-FF-1",
            "ff_name": "Some family",
            "query_range": "12-140",
            "evalue": 1e-20
        }))
        .unwrap();

        assert_eq!(hit.ff_id, "1.10.8.10-FF-1");
        assert_eq!(hit.extra.get("evalue"), Some(&json!(1e-20)));
    }

    #[test]
    fn template_alignment_parses_service_record() {
        let aln: TemplateAlignment = serde_json::from_value(json!({
            "pdb_id": "1cuk",
            "auth_asym_id": "A",
            "template_seqres_offset": 4,
            "target_sequence": "MKV-LA",
            "template_sequence": "MKVQLA"
        }))
        .unwrap();

        assert_eq!(aln.pdb_id, "1cuk");
        assert_eq!(aln.template_seqres_offset, 4);
        assert!(aln.extra.is_empty());
    }

    #[test]
    fn alignment_converts_into_model_submission() {
        let aln: TemplateAlignment = serde_json::from_value(json!({
            "pdb_id": "2xyz",
            "auth_asym_id": "B",
            "template_seqres_offset": 0,
            "target_sequence": "AC-D",
            "template_sequence": "ACGD",
            "score": 12
        }))
        .unwrap();

        let submit = SubmitAlignment::from(&aln);

        assert_eq!(submit.pdb_id, "2xyz");
        assert_eq!(submit.auth_asym_id, "B");
        assert_eq!(submit.target_sequence, "AC-D");
        assert_eq!(submit.assembly_id, None);
        assert_eq!(submit.project_id, None);
    }
}

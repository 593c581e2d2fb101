use super::manager::StageManager;
use crate::core::http::{HttpTransport, Transport};
use crate::core::models::SubmitAlignment;
use crate::engine::error::EngineError;
use crate::engine::job::Sleeper;
use crate::engine::progress::ProgressReporter;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

const COORDINATES_KEY: &str = "coordinates";

#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutcome {
    pub project_id: String,
    pub coordinates: String,
    pub results: Value,
}

/// Builds a 3D model from a target/template alignment.
pub struct HomologyModel<T: Transport = HttpTransport> {
    manager: StageManager<T>,
}

impl<T: Transport> HomologyModel<T> {
    pub fn new(manager: StageManager<T>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &StageManager<T> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut StageManager<T> {
        &mut self.manager
    }

    pub fn run(
        &mut self,
        payload: &SubmitAlignment,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<ModelOutcome, EngineError> {
        let outcome = self.manager.run(payload, sleeper, reporter)?;

        let coordinates = match outcome.results.get(COORDINATES_KEY) {
            Some(Value::String(coords)) if !coords.trim().is_empty() => coords.clone(),
            _ => {
                return Err(EngineError::NoResults(format!(
                    "project <{}> returned no coordinates",
                    outcome.job_id
                )));
            }
        };

        Ok(ModelOutcome {
            project_id: outcome.job_id,
            coordinates,
            results: outcome.results,
        })
    }

    /// Runs the model and writes its coordinates to `path`.
    pub fn run_to_file(
        &mut self,
        payload: &SubmitAlignment,
        path: &Path,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<ModelOutcome, EngineError> {
        let outcome = self.run(payload, sleeper, reporter)?;
        write_coordinates(path, &outcome.coordinates)?;
        Ok(outcome)
    }
}

pub fn write_coordinates(path: &Path, coordinates: &str) -> Result<(), EngineError> {
    info!("Writing coordinates to {}", path.display());
    fs::write(path, coordinates).map_err(|e| EngineError::Output {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::Identity;
    use crate::core::http::RawResponse;
    use crate::core::http::client::testing::ScriptedTransport;
    use crate::core::store::{ConfigSection, ConfigStore, shared};
    use crate::engine::job::testing::RecordingSleeper;
    use crate::workflows::manager::StageSettings;
    use crate::workflows::services::HOMOLOGY_MODEL;
    use tempfile::tempdir;

    fn payload() -> SubmitAlignment {
        SubmitAlignment {
            target_sequence: "MKV-LA".to_string(),
            template_sequence: "MKVQLA".to_string(),
            template_seqres_offset: 4,
            pdb_id: "1cuk".to_string(),
            auth_asym_id: "A".to_string(),
            assembly_id: None,
            project_id: None,
            meta: None,
        }
    }

    fn stage(dir: &Path, results: &str) -> HomologyModel<ScriptedTransport> {
        let store = shared(ConfigStore::open(&dir.join("config.toml")).unwrap());
        let manager = StageManager::new(
            &HOMOLOGY_MODEL,
            &StageSettings::for_profile(&HOMOLOGY_MODEL),
            ScriptedTransport::new([
                RawResponse::json(201, r#"{"project_id": "p9"}"#),
                RawResponse::json(200, r#"{"status": "COMPLETED"}"#),
                RawResponse::json(200, results),
            ]),
            Identity::Token("sm".to_string()),
            ConfigSection::new(store, HOMOLOGY_MODEL.section),
        )
        .unwrap();
        HomologyModel::new(manager)
    }

    #[test]
    fn coordinates_are_written_to_output_path() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("model.pdb");
        let mut stage = stage(dir.path(), r#"{"coordinates": "ATOM      1  N   MET A   1\n"}"#);

        let outcome = stage
            .run_to_file(
                &payload(),
                &out,
                &RecordingSleeper::default(),
                &ProgressReporter::new(),
            )
            .unwrap();

        assert_eq!(outcome.project_id, "p9");
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "ATOM      1  N   MET A   1\n"
        );
        let requests = stage.manager().client().transport().requests();
        assert_eq!(
            requests[0].url,
            "https://beta.swissmodel.expasy.org/alignment/"
        );
        let form = requests[0].form.clone().unwrap();
        assert!(form.contains(&("template_seqres_offset".to_string(), "4".to_string())));
        assert!(!form.iter().any(|(key, _)| key == "assembly_id"));
    }

    #[test]
    fn missing_coordinates_is_no_results() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("model.pdb");
        let mut stage = stage(dir.path(), r#"{"status": "COMPLETED", "model": null}"#);

        let result = stage.run_to_file(
            &payload(),
            &out,
            &RecordingSleeper::default(),
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(EngineError::NoResults(_))));
        assert!(!out.exists());
    }
}

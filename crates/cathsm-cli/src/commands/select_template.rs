use super::{open_store, progress_reporter, stage_credentials};
use crate::cli::SelectTemplateArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use cathsm::core::credentials::EnvNames;
use cathsm::core::http::HttpTransport;
use cathsm::core::models::submission::{SubmitSelectTemplate, load_json};
use cathsm::core::store::ConfigSection;
use cathsm::engine::error::EngineError;
use cathsm::engine::job::ThreadSleeper;
use cathsm::engine::progress::Progress;
use cathsm::workflows::manager::StageManager;
use cathsm::workflows::select_template::{SelectTemplate, SelectTemplateOutcome};
use cathsm::workflows::services::SELECT_TEMPLATE;
use serde_json::json;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task;
use tracing::info;

pub async fn run(args: SelectTemplateArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let config = config::build_select_template_config(&args)?;

    info!("Loading submission from {:?}", &config.input);
    let payload: SubmitSelectTemplate =
        load_json(&config.input).map_err(|e| CliError::FileParsing {
            path: config.input.clone(),
            source: e.into(),
        })?;

    let store = open_store(&config.session)?;
    let section = ConfigSection::new(store, SELECT_TEMPLATE.section);
    let credentials = stage_credentials(
        &SELECT_TEMPLATE,
        &config.credentials,
        &EnvNames::default(),
        &config.session,
    );
    let reporter = progress_reporter(ui_sender);

    let outcome = task::block_in_place(|| -> Result<SelectTemplateOutcome> {
        let transport = HttpTransport::new().map_err(EngineError::from)?;
        let manager = StageManager::resolve(
            &SELECT_TEMPLATE,
            &config.stage,
            transport,
            section,
            &credentials,
        )?;
        let mut workflow = SelectTemplate::new(manager);

        reporter.report(Progress::PhaseStart {
            name: format!("Selecting templates for '{}'", payload.query_id),
        });
        let outcome = workflow.run(&payload, &ThreadSleeper, &reporter)?;
        reporter.report(Progress::PhaseFinish);
        Ok(outcome)
    })?;

    write_outcome(&config.output, &outcome)?;
    println!(
        "✓ Task <{}>: {} resolved hit(s) written to: {}",
        outcome.task_id,
        outcome.hits.len(),
        config.output.display()
    );

    Ok(())
}

fn write_outcome(path: &Path, outcome: &SelectTemplateOutcome) -> Result<()> {
    let document = json!({
        "task_id": outcome.task_id,
        "results": outcome.results,
        "resolved_hits": outcome.hits,
    });
    let text = serde_json::to_string_pretty(&document)?;
    info!("Writing search results to {:?}", path);
    std::fs::write(path, text).map_err(|e| CliError::Output {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cathsm::core::models::hit::ResolvedHit;
    use serde_json::{Map, Value};
    use tempfile::tempdir;

    #[test]
    fn outcome_document_lists_task_results_and_hits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.json");
        let outcome = SelectTemplateOutcome {
            task_id: "t-1".to_string(),
            results: json!({ "funfam_scan": { "results": [] } }),
            hits: vec![ResolvedHit {
                uuid: "h1".to_string(),
                ff_id: "1.10.8.10/FF/14534".to_string(),
                ff_name: "Some family".to_string(),
                query_range: "1-120".to_string(),
                extra: Map::new(),
            }],
        };

        write_outcome(&path, &outcome).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["task_id"], "t-1");
        assert_eq!(written["resolved_hits"][0]["uuid"], "h1");
        assert_eq!(written["resolved_hits"][0]["query_range"], "1-120");
        assert!(written["results"]["funfam_scan"].is_object());
    }

    #[test]
    fn unwritable_output_is_reported_with_its_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("search.json");
        let outcome = SelectTemplateOutcome {
            task_id: "t-1".to_string(),
            results: Value::Null,
            hits: Vec::new(),
        };

        match write_outcome(&path, &outcome) {
            Err(CliError::Output { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result {other:?}"),
        }
    }
}

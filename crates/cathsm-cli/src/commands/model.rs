use super::{open_store, progress_reporter, stage_credentials};
use crate::cli::ModelArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use cathsm::core::credentials::EnvNames;
use cathsm::core::http::HttpTransport;
use cathsm::core::models::submission::{SubmitAlignment, load_json};
use cathsm::core::store::ConfigSection;
use cathsm::engine::error::EngineError;
use cathsm::engine::job::ThreadSleeper;
use cathsm::engine::progress::Progress;
use cathsm::workflows::homology_model::{HomologyModel, ModelOutcome};
use cathsm::workflows::manager::StageManager;
use cathsm::workflows::services::HOMOLOGY_MODEL;
use tokio::sync::mpsc;
use tokio::task;
use tracing::info;

pub async fn run(args: ModelArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let config = config::build_model_config(&args)?;

    info!("Loading alignment from {:?}", &config.input);
    let payload: SubmitAlignment = load_json(&config.input).map_err(|e| CliError::FileParsing {
        path: config.input.clone(),
        source: e.into(),
    })?;

    let store = open_store(&config.session)?;
    let section = ConfigSection::new(store, HOMOLOGY_MODEL.section);
    let credentials = stage_credentials(
        &HOMOLOGY_MODEL,
        &config.credentials,
        &EnvNames::default(),
        &config.session,
    );
    let reporter = progress_reporter(ui_sender);

    let outcome = task::block_in_place(|| -> Result<ModelOutcome> {
        let transport = HttpTransport::new().map_err(EngineError::from)?;
        let manager = StageManager::resolve(
            &HOMOLOGY_MODEL,
            &config.stage,
            transport,
            section,
            &credentials,
        )?;
        let mut workflow = HomologyModel::new(manager);

        reporter.report(Progress::PhaseStart {
            name: format!(
                "Modelling on template {}.{}",
                payload.pdb_id, payload.auth_asym_id
            ),
        });
        let outcome = workflow.run_to_file(&payload, &config.output, &ThreadSleeper, &reporter)?;
        reporter.report(Progress::PhaseFinish);
        Ok(outcome)
    })?;

    println!(
        "✓ Model for project <{}> ({} bytes of coordinates) written to: {}",
        outcome.project_id,
        outcome.coordinates.len(),
        config.output.display()
    );

    Ok(())
}

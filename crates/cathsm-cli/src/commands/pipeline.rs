use super::{open_store, progress_reporter, stage_credentials};
use crate::cli::PipelineArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use cathsm::core::credentials::EnvNames;
use cathsm::core::http::HttpTransport;
use cathsm::core::io::fasta;
use cathsm::engine::error::EngineError;
use cathsm::engine::job::ThreadSleeper;
use cathsm::workflows::pipeline::{BatchReport, Pipeline, SequenceOutcome};
use cathsm::workflows::services::{HOMOLOGY_MODEL, SELECT_TEMPLATE};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{info, warn};

pub async fn run(args: PipelineArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let config = config::build_pipeline_config(&args)?;

    info!("Reading sequences from {:?}", &config.input);
    let records = fasta::read_from_path(&config.input).map_err(|e| CliError::FileParsing {
        path: config.input.clone(),
        source: e.into(),
    })?;
    if records.is_empty() {
        warn!("No sequences found in {:?}", &config.input);
    }

    let store = open_store(&config.session)?;
    let template_credentials = stage_credentials(
        &SELECT_TEMPLATE,
        &config.template_credentials,
        &EnvNames::with_prefix(SELECT_TEMPLATE.env_prefix),
        &config.session,
    );
    let model_credentials = stage_credentials(
        &HOMOLOGY_MODEL,
        &config.model_credentials,
        &EnvNames::with_prefix(HOMOLOGY_MODEL.env_prefix),
        &config.session,
    );
    let reporter = progress_reporter(ui_sender);

    let transport = HttpTransport::new().map_err(EngineError::from)?;
    let pipeline = Pipeline::new(config.settings, transport, store);

    let report = task::block_in_place(|| -> Result<BatchReport> {
        let tokens = pipeline.authenticate(&template_credentials, &model_credentials)?;
        println!(
            "Processing {} sequence(s) from {} ...",
            records
                .len()
                .saturating_sub(pipeline.settings().start_seq.saturating_sub(1)),
            config.input.display()
        );
        Ok(pipeline.run(&records, &tokens, &ThreadSleeper, &reporter)?)
    })?;

    print_summary(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::BatchFailed {
            failed: report.sequences.iter().filter(|s| s.is_failure()).count(),
            total: report.sequences.len(),
        })
    }
}

fn summary_lines(report: &BatchReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .sequences
        .iter()
        .map(|sequence| match &sequence.outcome {
            SequenceOutcome::Modelled {
                models,
                failed_hits: 0,
            } => format!(
                "  ✓ {:>4} {}: {} model(s) in {}",
                sequence.index,
                sequence.id,
                models.len(),
                sequence.dir.display()
            ),
            SequenceOutcome::Modelled {
                models,
                failed_hits,
            } => format!(
                "  ! {:>4} {}: {} model(s), {} hit(s) failed",
                sequence.index,
                sequence.id,
                models.len(),
                failed_hits
            ),
            SequenceOutcome::Skipped { reason } => format!(
                "  - {:>4} {}: skipped ({})",
                sequence.index, sequence.id, reason
            ),
            SequenceOutcome::Failed { error } => format!(
                "  ✗ {:>4} {}: failed ({})",
                sequence.index, sequence.id, error
            ),
        })
        .collect();

    lines.push(format!(
        "{} modelled ({} models), {} skipped, {} failed",
        report.modelled(),
        report.model_count(),
        report.skipped(),
        report.failed()
    ));
    lines
}

fn print_summary(report: &BatchReport) {
    for line in summary_lines(report) {
        println!("{}", line);
    }
}

use super::homology_model::HomologyModel;
use super::manager::{StageCredentials, StageManager, StageSettings};
use super::select_template::SelectTemplate;
use super::services::{HOMOLOGY_MODEL, SELECT_TEMPLATE, ServiceProfile};
use crate::core::credentials::Identity;
use crate::core::http::{HttpTransport, Transport};
use crate::core::io::fasta::SequenceRecord;
use crate::core::io::{hits, safe_name};
use crate::core::models::{SubmitAlignment, SubmitSelectTemplate};
use crate::core::store::{ConfigSection, SharedStore};
use crate::engine::error::EngineError;
use crate::engine::job::Sleeper;
use crate::engine::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

pub const HITS_FILE_NAME: &str = "hits.tsv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub template: StageSettings,
    pub model: StageSettings,
    pub out_dir: PathBuf,
    /// 1-based index of the first sequence to process.
    pub start_seq: usize,
}

impl PipelineSettings {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            template: StageSettings::for_profile(&SELECT_TEMPLATE),
            model: StageSettings::for_profile(&HOMOLOGY_MODEL),
            out_dir: out_dir.into(),
            start_seq: 1,
        }
    }
}

/// Tokens shared by every worker of a batch.
#[derive(Clone, PartialEq, Eq)]
pub struct StageTokens {
    pub template: String,
    pub model: String,
}

impl std::fmt::Debug for StageTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StageTokens(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    Modelled {
        models: Vec<PathBuf>,
        failed_hits: usize,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub index: usize,
    pub id: String,
    pub dir: PathBuf,
    pub outcome: SequenceOutcome,
}

impl SequenceReport {
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            SequenceOutcome::Failed { .. } => true,
            SequenceOutcome::Modelled { failed_hits, .. } => *failed_hits > 0,
            SequenceOutcome::Skipped { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sequences: Vec<SequenceReport>,
}

impl BatchReport {
    pub fn modelled(&self) -> usize {
        self.count(|o| matches!(o, SequenceOutcome::Modelled { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SequenceOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SequenceOutcome::Failed { .. }))
    }

    pub fn model_count(&self) -> usize {
        self.sequences
            .iter()
            .map(|s| match &s.outcome {
                SequenceOutcome::Modelled { models, .. } => models.len(),
                _ => 0,
            })
            .sum()
    }

    /// True when no sequence and no modelled hit failed.
    pub fn is_success(&self) -> bool {
        !self.sequences.iter().any(SequenceReport::is_failure)
    }

    fn count(&self, predicate: impl Fn(&SequenceOutcome) -> bool) -> usize {
        self.sequences.iter().filter(|s| predicate(&s.outcome)).count()
    }
}

/// Runs template selection then homology modelling for every sequence of a batch.
pub struct Pipeline<T: Transport + Clone = HttpTransport> {
    settings: PipelineSettings,
    transport: T,
    template_config: ConfigSection,
    model_config: ConfigSection,
}

impl<T: Transport + Clone> Pipeline<T> {
    pub fn new(settings: PipelineSettings, transport: T, store: SharedStore) -> Self {
        Self {
            settings,
            transport,
            template_config: ConfigSection::new(store.clone(), SELECT_TEMPLATE.section),
            model_config: ConfigSection::new(store, HOMOLOGY_MODEL.section),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Resolves credentials for both stages and authenticates each exactly once.
    pub fn authenticate(
        &self,
        template: &StageCredentials<'_>,
        model: &StageCredentials<'_>,
    ) -> Result<StageTokens, EngineError> {
        let mut template_manager = StageManager::resolve(
            &SELECT_TEMPLATE,
            &self.settings.template,
            self.transport.clone(),
            self.template_config.clone(),
            template,
        )?;
        let mut model_manager = StageManager::resolve(
            &HOMOLOGY_MODEL,
            &self.settings.model,
            self.transport.clone(),
            self.model_config.clone(),
            model,
        )?;

        info!("Authenticating with {}", self.settings.template.base_url);
        let template_token = template_manager.authenticate()?;
        info!("Authenticating with {}", self.settings.model.base_url);
        let model_token = model_manager.authenticate()?;

        Ok(StageTokens {
            template: template_token,
            model: model_token,
        })
    }

    /// Processes every sequence from `start_seq` on, in parallel on the current rayon pool.
    ///
    /// A failing sequence is recorded in the report and does not stop the batch.
    pub fn run(
        &self,
        records: &[SequenceRecord],
        tokens: &StageTokens,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<BatchReport, EngineError> {
        let start = self.settings.start_seq.max(1);
        let selected: Vec<(usize, &SequenceRecord)> = records
            .iter()
            .enumerate()
            .map(|(offset, record)| (offset + 1, record))
            .skip(start - 1)
            .collect();
        if selected.is_empty() {
            warn!(
                "No sequences to process ({} in input, starting at {})",
                records.len(),
                start
            );
        }

        fs::create_dir_all(&self.settings.out_dir).map_err(|e| EngineError::Output {
            path: self.settings.out_dir.display().to_string(),
            source: e,
        })?;

        reporter.report(Progress::PhaseStart {
            name: format!("Modelling {} sequences", selected.len()),
        });
        reporter.report(Progress::TaskStart {
            total: selected.len() as u64,
        });

        let dir_names = directory_names(&selected);
        let sequences: Vec<SequenceReport> = selected
            .par_iter()
            .zip(dir_names.par_iter())
            .map(|((index, record), dir_name)| {
                let report =
                    self.run_sequence(*index, record, dir_name, tokens, sleeper, reporter);
                reporter.report(Progress::TaskIncrement { amount: 1 });
                report
            })
            .collect();

        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);

        let report = BatchReport { sequences };
        info!(
            "DONE: {} modelled ({} models), {} skipped, {} failed",
            report.modelled(),
            report.model_count(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    fn run_sequence(
        &self,
        index: usize,
        record: &SequenceRecord,
        dir_name: &str,
        tokens: &StageTokens,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> SequenceReport {
        let dir = self.settings.out_dir.join(dir_name);
        let _span = info_span!("sequence", index, id = %record.id).entered();

        let outcome =
            match self.model_sequence(index, record, dir_name, &dir, tokens, sleeper, reporter) {
                Ok(outcome) => outcome,
                Err(EngineError::NoResults(reason)) => {
                    warn!("SEQUENCE {} ({}): {} (skipping)", index, record.id, reason);
                    SequenceOutcome::Skipped { reason }
                }
                Err(e) => {
                    error!("SEQUENCE {} ({}) failed: {}", index, record.id, e);
                    reporter.report(Progress::Message(format!("{} failed: {}", record.id, e)));
                    SequenceOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

        SequenceReport {
            index,
            id: record.id.clone(),
            dir,
            outcome,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn model_sequence(
        &self,
        index: usize,
        record: &SequenceRecord,
        dir_name: &str,
        dir: &Path,
        tokens: &StageTokens,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<SequenceOutcome, EngineError> {
        info!("SEQUENCE {}: {} ({} residues)", index, record.id, record.len());
        if record.is_empty() {
            warn!("Sequence '{}' has no residues (skipping)", record.id);
            return Ok(SequenceOutcome::Skipped {
                reason: "empty sequence".to_string(),
            });
        }

        fs::create_dir_all(dir).map_err(|e| EngineError::Output {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut select = SelectTemplate::new(self.manager(
            &SELECT_TEMPLATE,
            &self.settings.template,
            &self.template_config,
            &tokens.template,
        )?);
        let search = select.run(
            &SubmitSelectTemplate::new(record.id.as_str(), record.sequence.as_str()),
            sleeper,
            reporter,
        )?;

        let table = dir.join(HITS_FILE_NAME);
        hits::write_tsv_to_path(&table, &search.hits).map_err(|e| EngineError::HitTable {
            path: table.display().to_string(),
            source: e,
        })?;

        if search.hits.is_empty() {
            warn!("No resolved hits for '{}' (skipping modelling step)", record.id);
            return Ok(SequenceOutcome::Skipped {
                reason: "no resolved hits".to_string(),
            });
        }

        let mut model = HomologyModel::new(self.manager(
            &HOMOLOGY_MODEL,
            &self.settings.model,
            &self.model_config,
            &tokens.model,
        )?);

        let mut models = Vec::new();
        let mut failed_hits = 0;
        let mut last_error = None;
        for (offset, hit) in search.hits.iter().enumerate() {
            let hit_no = offset + 1;
            info!(
                "SEQUENCE {}, HIT {} [{}]: FunFam '{}': {}",
                index, hit_no, hit.query_range, hit.ff_id, hit.ff_name
            );

            let alignments = select.hit_alignments(&hit.uuid)?;
            let Some(aln) = alignments.first() else {
                warn!(
                    "Found no valid template alignments from hit '{}' (skipping modelling step)",
                    hit.ff_id
                );
                continue;
            };

            info!(
                "HIT{}: Modelling region against template {}, {} (offset {}) ...",
                hit_no, aln.pdb_id, aln.auth_asym_id, aln.template_seqres_offset
            );
            info!("{:>10} {:>8}: {}", "QUERY", hit.query_range, aln.target_sequence);
            info!(
                "{:>10} {:>8}: {}",
                format!("{}, {}", aln.pdb_id, aln.auth_asym_id),
                aln.template_seqres_offset,
                aln.template_sequence
            );

            let path = dir.join(format!("{dir_name}_hit{hit_no}.pdb"));
            match model.run_to_file(&SubmitAlignment::from(aln), &path, sleeper, reporter) {
                Ok(_) => models.push(path),
                Err(e @ (EngineError::JobFailed { .. } | EngineError::NoResults(_))) => {
                    error!("HIT{}: modelling failed: {}", hit_no, e);
                    failed_hits += 1;
                    last_error = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        if models.is_empty() {
            return Ok(match last_error {
                Some(error) => SequenceOutcome::Failed { error },
                None => SequenceOutcome::Skipped {
                    reason: "no hit has a template alignment".to_string(),
                },
            });
        }
        Ok(SequenceOutcome::Modelled {
            models,
            failed_hits,
        })
    }

    fn manager(
        &self,
        profile: &ServiceProfile,
        settings: &StageSettings,
        config: &ConfigSection,
        token: &str,
    ) -> Result<StageManager<T>, EngineError> {
        let mut manager = StageManager::new(
            profile,
            settings,
            self.transport.clone(),
            Identity::Token(token.to_string()),
            config.clone(),
        )?;
        manager.use_token(token);
        Ok(manager)
    }
}

/// Output directory name for each selected sequence, unique within the batch.
///
/// Ids that reduce to the same safe name are suffixed with their 1-based input index.
fn directory_names(selected: &[(usize, &SequenceRecord)]) -> Vec<String> {
    let base: Vec<String> = selected
        .iter()
        .map(|(index, record)| match safe_name(&record.id) {
            name if name.is_empty() => format!("seq{index}"),
            name => name,
        })
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &base {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    let mut taken: HashSet<String> = base
        .iter()
        .filter(|name| counts[name.as_str()] == 1)
        .cloned()
        .collect();
    let mut names = Vec::with_capacity(base.len());
    for ((index, record), name) in selected.iter().zip(&base) {
        if counts[name.as_str()] == 1 {
            names.push(name.clone());
            continue;
        }
        let mut candidate = format!("{name}_{index}");
        while taken.contains(&candidate) {
            candidate.push('_');
        }
        warn!(
            "Sequence {} ('{}') shares output directory '{}', writing to '{}'",
            index, record.id, name, candidate
        );
        taken.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

use super::manager::StageManager;
use crate::core::http::{ClientError, Fields, HttpTransport, Transport};
use crate::core::models::{ResolvedHit, SubmitSelectTemplate, TemplateAlignment};
use crate::engine::error::EngineError;
use crate::engine::job::Sleeper;
use crate::engine::progress::ProgressReporter;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

const RESOLVED_HITS_ACTION: &str = "resolved_hits";
const HIT_ALIGNMENTS_ACTION: &str = "hit_alignments";
const HIT_PLACEHOLDER: &str = "hit_id";

#[derive(Debug, Clone, PartialEq)]
pub struct SelectTemplateOutcome {
    pub task_id: String,
    pub results: Value,
    pub hits: Vec<ResolvedHit>,
}

/// Finds structural templates for a query sequence.
pub struct SelectTemplate<T: Transport = HttpTransport> {
    manager: StageManager<T>,
}

impl<T: Transport> SelectTemplate<T> {
    pub fn new(manager: StageManager<T>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &StageManager<T> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut StageManager<T> {
        &mut self.manager
    }

    /// Runs a template search and collects its resolved hits.
    ///
    /// A search that completes without any hit is a valid, empty outcome.
    pub fn run(
        &mut self,
        payload: &SubmitSelectTemplate,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<SelectTemplateOutcome, EngineError> {
        info!(
            "Searching for template structures for '{}' ({} residues) ...",
            payload.query_id,
            payload.query_sequence.len()
        );
        let outcome = self.manager.run(payload, sleeper, reporter)?;
        let hits = self.resolved_hits(&outcome.job_id)?;

        info!("Resolved FunFam matches: {}", hits.len());
        for (index, hit) in hits.iter().enumerate() {
            info!(
                "{:<3} {} {} {}",
                index + 1,
                hit.query_range,
                hit.ff_id,
                hit.ff_name
            );
        }

        Ok(SelectTemplateOutcome {
            task_id: outcome.job_id,
            results: outcome.results,
            hits,
        })
    }

    pub fn resolved_hits(&self, task_id: &str) -> Result<Vec<ResolvedHit>, EngineError> {
        let placeholder = self.manager.protocol().placeholder.clone();
        let hits = self.fetch_list(RESOLVED_HITS_ACTION, placeholder, task_id)?;
        info!("  ... retrieved {} resolved hits", hits.len());
        Ok(hits)
    }

    pub fn hit_alignments(&self, hit_id: &str) -> Result<Vec<TemplateAlignment>, EngineError> {
        let alignments = self.fetch_list(HIT_ALIGNMENTS_ACTION, HIT_PLACEHOLDER.to_string(), hit_id)?;
        info!("  ... retrieved {} template alignments", alignments.len());
        Ok(alignments)
    }

    fn fetch_list<D: DeserializeOwned>(
        &self,
        action: &str,
        placeholder: String,
        id: &str,
    ) -> Result<Vec<D>, EngineError> {
        let fields = Fields::from([(placeholder, id.to_string())]);
        let json = self.manager.client().get(action, &fields)?.expect(200)?;
        if json.is_null() {
            return Ok(Vec::new());
        }

        serde_json::from_value(json).map_err(|e| {
            ClientError::InvalidResponse {
                action: action.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

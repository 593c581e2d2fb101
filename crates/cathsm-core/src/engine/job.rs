use super::error::EngineError;
use crate::core::http::{ApiClient, ClientError, Fields, Method, Transport};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const SUBMIT_ACTION: &str = "submit";
const STATUS_ACTION: &str = "status";
const RESULTS_ACTION: &str = "results";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Position of a remote job in its submit/status/results lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    NotSubmitted,
    Submitted {
        job_id: String,
    },
    Polling {
        job_id: String,
        attempts: u32,
    },
    Completed {
        job_id: String,
    },
    Failed {
        job_id: String,
        status: String,
        message: String,
    },
}

impl JobState {
    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobState::NotSubmitted => None,
            JobState::Submitted { job_id }
            | JobState::Polling { job_id, .. }
            | JobState::Completed { job_id }
            | JobState::Failed { job_id, .. } => Some(job_id),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::NotSubmitted => write!(f, "NotSubmitted"),
            JobState::Submitted { job_id } => write!(f, "Submitted({job_id})"),
            JobState::Polling { job_id, attempts } => {
                write!(f, "Polling({job_id}, {attempts} checks)")
            }
            JobState::Completed { job_id } => write!(f, "Completed({job_id})"),
            JobState::Failed { job_id, status, .. } => write!(f, "Failed({job_id}, {status})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Succeeded,
    Failed,
}

/// Terminal status values of one service. Anything outside both sets is still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusVocabulary {
    success: Vec<String>,
    failure: Vec<String>,
}

impl StatusVocabulary {
    pub fn new(success: &[&str], failure: &[&str]) -> Self {
        Self {
            success: uppercased(success),
            failure: uppercased(failure),
        }
    }

    pub fn classify(&self, status: &str) -> StatusClass {
        let status = status.trim().to_uppercase();
        if self.success.contains(&status) {
            StatusClass::Succeeded
        } else if self.failure.contains(&status) {
            StatusClass::Failed
        } else {
            StatusClass::Pending
        }
    }
}

fn uppercased(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_uppercase()).collect()
}

/// Service-specific knobs of the submit/status/results protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProtocol {
    pub submit_status: u16,
    pub status_status: u16,
    pub results_status: u16,
    /// Key of the job id in the submit response.
    pub id_key: String,
    /// Placeholder the job id fills in the `status` and `results` templates.
    pub placeholder: String,
    pub vocabulary: StatusVocabulary,
}

impl JobProtocol {
    pub fn new(id_key: &str, placeholder: &str, vocabulary: StatusVocabulary) -> Self {
        Self {
            submit_status: 201,
            status_status: 200,
            results_status: 200,
            id_key: id_key.to_string(),
            placeholder: placeholder.to_string(),
            vocabulary,
        }
    }
}

/// How often, and for how long, a pending job is re-checked.
///
/// Both bounds are unbounded by default: the job is polled until the server reports a
/// terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            timeout: None,
        }
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// One answer from the `status` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: String,
    pub class: StatusClass,
    pub message: Option<String>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "[{}] {}", self.status, message),
            None => write!(f, "[{}]", self.status),
        }
    }
}

/// Drives a single job on a remote service through its lifecycle.
pub struct RemoteJob<'a, T: Transport> {
    client: &'a ApiClient<T>,
    protocol: &'a JobProtocol,
    state: JobState,
}

impl<'a, T: Transport> RemoteJob<'a, T> {
    pub fn new(client: &'a ApiClient<T>, protocol: &'a JobProtocol) -> Self {
        Self {
            client,
            protocol,
            state: JobState::NotSubmitted,
        }
    }

    /// Attaches to a job submitted earlier, e.g. by another process.
    pub fn resume(client: &'a ApiClient<T>, protocol: &'a JobProtocol, job_id: &str) -> Self {
        Self {
            client,
            protocol,
            state: JobState::Submitted {
                job_id: job_id.to_string(),
            },
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn job_id(&self) -> Option<&str> {
        self.state.job_id()
    }

    pub fn submit<P: Serialize + ?Sized>(&mut self, payload: &P) -> Result<String, EngineError> {
        if self.state != JobState::NotSubmitted {
            return Err(self.invalid("submit"));
        }

        let response = self
            .client
            .send(SUBMIT_ACTION, Method::Post, None, Some(payload), None)?;
        let json = response.expect(self.protocol.submit_status)?;
        debug!("Submit response: {}", json);

        let job_id = match json.get(&self.protocol.id_key) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(ClientError::InvalidResponse {
                    action: SUBMIT_ACTION.to_string(),
                    reason: format!("missing job id '{}' in {}", self.protocol.id_key, json),
                }
                .into());
            }
        };

        info!("Submitted job <{}>", job_id);
        self.state = JobState::Submitted {
            job_id: job_id.clone(),
        };
        Ok(job_id)
    }

    /// Checks the job status once and advances the state accordingly.
    pub fn poll(&mut self) -> Result<StatusReport, EngineError> {
        let (job_id, attempts) = match &self.state {
            JobState::Submitted { job_id } => (job_id.clone(), 0),
            JobState::Polling { job_id, attempts } => (job_id.clone(), *attempts),
            _ => return Err(self.invalid("poll")),
        };

        let json = self
            .client
            .get(STATUS_ACTION, &self.id_fields(&job_id))?
            .expect(self.protocol.status_status)?;

        let status = json
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::InvalidResponse {
                action: STATUS_ACTION.to_string(),
                reason: format!("missing 'status' in {json}"),
            })?
            .to_string();
        let message = match json.get("message") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        };
        let class = self.protocol.vocabulary.classify(&status);

        self.state = match class {
            StatusClass::Succeeded => JobState::Completed { job_id },
            StatusClass::Failed => JobState::Failed {
                job_id,
                status: status.clone(),
                message: message.clone().unwrap_or_default(),
            },
            StatusClass::Pending => JobState::Polling {
                job_id,
                attempts: attempts + 1,
            },
        };

        Ok(StatusReport {
            status,
            class,
            message,
        })
    }

    /// Polls until the job reaches a terminal status or the policy gives up.
    ///
    /// `on_status` sees every status report, including the final one.
    pub fn wait(
        &mut self,
        policy: &PollPolicy,
        sleeper: &dyn Sleeper,
        mut on_status: impl FnMut(&StatusReport),
    ) -> Result<StatusReport, EngineError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            let report = self.poll()?;
            attempts += 1;
            info!("   {}", report);
            on_status(&report);

            match report.class {
                StatusClass::Succeeded => return Ok(report),
                StatusClass::Failed => {
                    let job_id = self.job_id().unwrap_or_default().to_string();
                    let message = report.message.unwrap_or_default();
                    error!("Job <{}> failed: {}", job_id, message);
                    return Err(EngineError::JobFailed {
                        job_id,
                        status: report.status,
                        message,
                    });
                }
                StatusClass::Pending => {}
            }

            let attempts_exhausted = policy.max_attempts.is_some_and(|max| attempts >= max);
            let time_exhausted = policy
                .timeout
                .is_some_and(|timeout| started.elapsed() + policy.interval > timeout);
            if attempts_exhausted || time_exhausted {
                let job_id = self.job_id().unwrap_or_default().to_string();
                warn!("Giving up on job <{}> after {} status checks", job_id, attempts);
                return Err(EngineError::PollTimeout {
                    job_id,
                    attempts,
                    elapsed_secs: started.elapsed().as_secs(),
                });
            }

            sleeper.sleep(policy.interval);
        }
    }

    /// Fetches the results document of a submitted job.
    ///
    /// An empty document (`null`, `{}`, `[]` or `""`) is reported as
    /// [`EngineError::NoResults`].
    pub fn fetch_results(&self) -> Result<Value, EngineError> {
        let job_id = self.job_id().ok_or_else(|| self.invalid("fetch results of"))?;
        if !matches!(self.state, JobState::Completed { .. }) {
            warn!("Fetching results of job <{}> in state {}", job_id, self.state);
        }

        let json = self
            .client
            .get(RESULTS_ACTION, &self.id_fields(job_id))?
            .expect(self.protocol.results_status)?;

        if is_empty_payload(&json) {
            return Err(EngineError::NoResults(format!(
                "job <{job_id}> returned an empty result"
            )));
        }
        Ok(json)
    }

    fn id_fields(&self, job_id: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(self.protocol.placeholder.clone(), job_id.to_string());
        fields
    }

    fn invalid(&self, operation: &'static str) -> EngineError {
        EngineError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}

pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

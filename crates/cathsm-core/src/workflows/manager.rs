use super::services::ServiceProfile;
use crate::core::credentials::{
    CredentialResolver, CredentialSources, EnvLookup, Identity, Prompter,
};
use crate::core::http::{ApiClient, HttpTransport, Transport};
use crate::core::store::{API_TOKEN_KEY, ConfigSection};
use crate::engine::error::EngineError;
use crate::engine::job::{JobProtocol, PollPolicy, RemoteJob, Sleeper};
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Per-stage connection and polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    pub base_url: String,
    pub auth_scheme: String,
    pub poll: PollPolicy,
}

impl StageSettings {
    pub fn for_profile(profile: &ServiceProfile) -> Self {
        Self {
            base_url: profile.default_base_url.to_string(),
            auth_scheme: profile.auth_scheme.to_string(),
            poll: PollPolicy::default(),
        }
    }
}

/// Everything needed to turn credential sources into an [`Identity`] for one stage.
pub struct StageCredentials<'a> {
    pub sources: CredentialSources,
    pub env: &'a dyn EnvLookup,
    pub prompter: Option<&'a dyn Prompter>,
    /// Drop the stage's persisted config before resolving.
    pub clear_config: bool,
}

impl<'a> StageCredentials<'a> {
    pub fn identity(&self, config: &ConfigSection, context: &str) -> Result<Identity, EngineError> {
        if self.clear_config {
            config.clear()?;
        }

        let mut resolver = CredentialResolver::new(self.env)
            .with_config(config)
            .with_context(context);
        if let Some(prompter) = self.prompter {
            resolver = resolver.with_prompter(prompter);
        }
        Ok(resolver.resolve(&self.sources)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub job_id: String,
    pub results: Value,
}

/// Wires an identity, a client and a job protocol together for one named stage.
///
/// A manager reads and writes only its own config section.
pub struct StageManager<T: Transport = HttpTransport> {
    name: String,
    client: ApiClient<T>,
    protocol: JobProtocol,
    poll: PollPolicy,
    identity: Identity,
    config: ConfigSection,
}

impl<T: Transport> StageManager<T> {
    pub fn new(
        profile: &ServiceProfile,
        settings: &StageSettings,
        transport: T,
        identity: Identity,
        config: ConfigSection,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            name: profile.section.to_string(),
            client: profile.client(settings, transport)?,
            protocol: profile.protocol(),
            poll: settings.poll,
            identity,
            config,
        })
    }

    /// Resolves credentials against `config` and builds the manager.
    pub fn resolve(
        profile: &ServiceProfile,
        settings: &StageSettings,
        transport: T,
        config: ConfigSection,
        credentials: &StageCredentials<'_>,
    ) -> Result<Self, EngineError> {
        let identity = credentials.identity(&config, &settings.base_url)?;
        Self::new(profile, settings, transport, identity, config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    pub fn protocol(&self) -> &JobProtocol {
        &self.protocol
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.auth_header().is_some()
    }

    /// Installs the known token, or logs in to obtain one, and persists it.
    pub fn authenticate(&mut self) -> Result<String, EngineError> {
        let token = match &self.identity {
            Identity::Token(token) => {
                info!("Setting API token ...");
                token.clone()
            }
            Identity::Login { user, password } => {
                info!("Authenticating via user/pass ... (token not provided)");
                debug!("user: {}", user);
                self.client.authenticate(user, password)?
            }
        };

        debug!("Saving API token to config section '{}'", self.name);
        self.config.set(API_TOKEN_KEY, &token)?;
        self.client.set_token(&token);
        self.identity = Identity::Token(token.clone());
        Ok(token)
    }

    /// Installs a token obtained and persisted elsewhere, without touching the config.
    pub fn use_token(&mut self, token: &str) {
        self.client.set_token(token);
        self.identity = Identity::Token(token.to_string());
    }

    /// Authenticates if needed, submits `payload`, waits for a terminal status and fetches
    /// the results.
    ///
    /// If the server rejects the token, it is removed from the config section so the next
    /// run falls back to logging in.
    pub fn run<P: Serialize + ?Sized>(
        &mut self,
        payload: &P,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<StageOutcome, EngineError> {
        if !self.is_authenticated() {
            self.authenticate()?;
        }

        let outcome = self.drive(payload, sleeper, reporter);
        if let Err(e) = &outcome {
            if e.is_invalid_token() {
                warn!(
                    "API token rejected by {}; removing it from config section '{}'",
                    self.client.base_url(),
                    self.name
                );
                self.config.remove(API_TOKEN_KEY)?;
                self.client.clear_token();
            }
        }
        outcome
    }

    fn drive<P: Serialize + ?Sized>(
        &self,
        payload: &P,
        sleeper: &dyn Sleeper,
        reporter: &ProgressReporter,
    ) -> Result<StageOutcome, EngineError> {
        info!("Submitting data to '{}' ...", self.name);
        let mut job = RemoteJob::new(&self.client, &self.protocol);
        let job_id = job.submit(payload)?;

        info!("Checking status of job <{}> ...", job_id);
        job.wait(&self.poll, sleeper, |report| {
            reporter.report(Progress::StatusUpdate {
                text: format!("{}: {}", job_id, report.status),
            })
        })?;

        info!("Retrieving results ...");
        let results = job.fetch_results()?;
        Ok(StageOutcome { job_id, results })
    }
}

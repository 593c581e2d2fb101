use super::store::{API_TOKEN_KEY, ConfigSection, StoreError};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, trace};

pub const TOKEN_ENV: &str = "API_TOKEN";
pub const USER_ENV: &str = "API_USER";
pub const PASSWORD_ENV: &str = "API_PASSWORD";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Insufficient credentials: {0}")]
    Arg(String),

    #[error("Failed to read {kind} from terminal: {source}")]
    Prompt {
        kind: PromptKind,
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Username,
    Password,
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptKind::Username => write!(f, "username"),
            PromptKind::Password => write!(f, "password"),
        }
    }
}

/// Where a single credential value may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Literal(String),
    EnvVar(String),
    ConfigLookup { section: String, key: String },
    InteractivePrompt(PromptKind),
}

/// The identity a stage authenticates with, resolved once up front.
#[derive(Clone, PartialEq, Eq)]
pub enum Identity {
    Token(String),
    Login { user: String, password: String },
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Identity::Login { user, .. } => f
                .debug_struct("Login")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Ordered fallback chains for the token, the username and the password.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub token: Vec<CredentialSource>,
    pub user: Vec<CredentialSource>,
    pub password: Vec<CredentialSource>,
}

/// Environment variable names consulted by [`CredentialSources::standard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvNames {
    pub token: String,
    pub user: String,
    pub password: String,
}

impl EnvNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            token: format!("{prefix}{TOKEN_ENV}"),
            user: format!("{prefix}{USER_ENV}"),
            password: format!("{prefix}{PASSWORD_ENV}"),
        }
    }
}

impl Default for EnvNames {
    fn default() -> Self {
        Self::with_prefix("")
    }
}

impl CredentialSources {
    /// Builds the standard precedence: explicit token, token env var, persisted token,
    /// explicit user/password (falling back to their env vars), then interactive prompts.
    pub fn standard(
        section: &str,
        token: Option<String>,
        user: Option<String>,
        password: Option<String>,
        env: &EnvNames,
    ) -> Self {
        let mut sources = Self::default();

        sources
            .token
            .extend(token.map(CredentialSource::Literal));
        sources
            .token
            .push(CredentialSource::EnvVar(env.token.clone()));
        sources.token.push(CredentialSource::ConfigLookup {
            section: section.to_string(),
            key: API_TOKEN_KEY.to_string(),
        });

        sources.user.extend(user.map(CredentialSource::Literal));
        sources.user.push(CredentialSource::EnvVar(env.user.clone()));
        sources
            .user
            .push(CredentialSource::InteractivePrompt(PromptKind::Username));

        sources
            .password
            .extend(password.map(CredentialSource::Literal));
        sources
            .password
            .push(CredentialSource::EnvVar(env.password.clone()));
        sources
            .password
            .push(CredentialSource::InteractivePrompt(PromptKind::Password));

        sources
    }
}

pub trait EnvLookup {
    fn var(&self, name: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

pub trait Prompter {
    fn prompt(&self, kind: PromptKind, context: &str) -> io::Result<String>;
}

/// Reads the username from stdin and the password without echo.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, kind: PromptKind, context: &str) -> io::Result<String> {
        match kind {
            PromptKind::Username => {
                eprint!("Username ({context}): ");
                io::stderr().flush()?;
                let mut line = String::new();
                io::stdin().lock().read_line(&mut line)?;
                Ok(line.trim().to_string())
            }
            PromptKind::Password => rpassword::prompt_password(format!("Password ({context}): ")),
        }
    }
}

pub struct CredentialResolver<'a> {
    env: &'a dyn EnvLookup,
    prompter: Option<&'a dyn Prompter>,
    config: Option<&'a ConfigSection>,
    context: String,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(env: &'a dyn EnvLookup) -> Self {
        Self {
            env,
            prompter: None,
            config: None,
            context: String::new(),
        }
    }

    pub fn with_prompter(mut self, prompter: &'a dyn Prompter) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn with_config(mut self, config: &'a ConfigSection) -> Self {
        self.config = Some(config);
        self
    }

    /// Text shown next to interactive prompts, typically the service base URL.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn resolve(&self, sources: &CredentialSources) -> Result<Identity, CredentialError> {
        if let Some(token) = self.first_of(&sources.token)? {
            trace!("Resolved API token {}", token);
            debug!("Using API token (user/password not required)");
            return Ok(Identity::Token(token));
        }

        let user = self.first_of(&sources.user)?.ok_or_else(|| {
            CredentialError::Arg("expected 'api_token' or 'api_user'".to_string())
        })?;
        let password = self.first_of(&sources.password)?.ok_or_else(|| {
            CredentialError::Arg(format!("expected a password for api_user '{user}'"))
        })?;
        debug!("Using user/password credentials for '{}'", user);

        Ok(Identity::Login { user, password })
    }

    fn first_of(&self, chain: &[CredentialSource]) -> Result<Option<String>, CredentialError> {
        for source in chain {
            if let Some(value) = self.lookup(source)? {
                if !value.is_empty() {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }

    fn lookup(&self, source: &CredentialSource) -> Result<Option<String>, CredentialError> {
        match source {
            CredentialSource::Literal(value) => Ok(Some(value.clone())),
            CredentialSource::EnvVar(name) => Ok(self.env.var(name)),
            CredentialSource::ConfigLookup { section, key } => match self.config {
                Some(config) if config.name() == section => Ok(config.get(key)?),
                _ => Ok(None),
            },
            CredentialSource::InteractivePrompt(kind) => match self.prompter {
                Some(prompter) => prompter
                    .prompt(*kind, &self.context)
                    .map(Some)
                    .map_err(|e| CredentialError::Prompt {
                        kind: *kind,
                        source: e,
                    }),
                None => Ok(None),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{ConfigStore, shared};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeEnv(HashMap<String, String>);

    impl FakeEnv {
        fn with(mut self, name: &str, value: &str) -> Self {
            self.0.insert(name.to_string(), value.to_string());
            self
        }
    }

    impl EnvLookup for FakeEnv {
        fn var(&self, name: &str) -> Option<String> {
            self.0.get(name).cloned()
        }
    }

    #[derive(Default)]
    struct ScriptedPrompter {
        asked: RefCell<Vec<PromptKind>>,
    }

    impl Prompter for ScriptedPrompter {
        fn prompt(&self, kind: PromptKind, _context: &str) -> io::Result<String> {
            self.asked.borrow_mut().push(kind);
            Ok(match kind {
                PromptKind::Username => "typed-user".to_string(),
                PromptKind::Password => "typed-pass".to_string(),
            })
        }
    }

    fn section_with_token(dir: &std::path::Path, token: Option<&str>) -> ConfigSection {
        let store = shared(ConfigStore::open(&dir.join("config.toml")).unwrap());
        let section = ConfigSection::new(store, "api1");
        if let Some(token) = token {
            section.set(API_TOKEN_KEY, token).unwrap();
        }
        section
    }

    fn sources(token: Option<&str>, user: Option<&str>, password: Option<&str>) -> CredentialSources {
        CredentialSources::standard(
            "api1",
            token.map(str::to_string),
            user.map(str::to_string),
            password.map(str::to_string),
            &EnvNames::default(),
        )
    }

    #[test]
    fn explicit_token_wins_over_everything() {
        let dir = tempdir().unwrap();
        let config = section_with_token(dir.path(), Some("from-config"));
        let env = FakeEnv::default().with(TOKEN_ENV, "from-env");

        let identity = CredentialResolver::new(&env)
            .with_config(&config)
            .resolve(&sources(Some("explicit"), Some("u"), Some("p")))
            .unwrap();

        assert_eq!(identity, Identity::Token("explicit".to_string()));
    }

    #[test]
    fn env_token_wins_over_config_token() {
        let dir = tempdir().unwrap();
        let config = section_with_token(dir.path(), Some("from-config"));
        let env = FakeEnv::default().with(TOKEN_ENV, "from-env");

        let identity = CredentialResolver::new(&env)
            .with_config(&config)
            .resolve(&sources(None, None, None))
            .unwrap();

        assert_eq!(identity, Identity::Token("from-env".to_string()));
    }

    #[test]
    fn config_token_wins_over_explicit_login() {
        let dir = tempdir().unwrap();
        let config = section_with_token(dir.path(), Some("from-config"));
        let env = FakeEnv::default();

        let identity = CredentialResolver::new(&env)
            .with_config(&config)
            .resolve(&sources(None, Some("u"), Some("p")))
            .unwrap();

        assert_eq!(identity, Identity::Token("from-config".to_string()));
    }

    #[test]
    fn config_lookup_ignores_other_sections() {
        let dir = tempdir().unwrap();
        let store = shared(ConfigStore::open(&dir.path().join("config.toml")).unwrap());
        let other = ConfigSection::new(store, "api2");
        other.set(API_TOKEN_KEY, "not-mine").unwrap();
        let env = FakeEnv::default();

        let identity = CredentialResolver::new(&env)
            .with_config(&other)
            .resolve(&sources(None, Some("u"), Some("p")))
            .unwrap();

        assert!(matches!(identity, Identity::Login { .. }));
    }

    #[test]
    fn explicit_login_used_when_no_token_available() {
        let dir = tempdir().unwrap();
        let config = section_with_token(dir.path(), None);
        let env = FakeEnv::default().with(USER_ENV, "env-user");

        let identity = CredentialResolver::new(&env)
            .with_config(&config)
            .resolve(&sources(None, Some("u"), Some("p")))
            .unwrap();

        assert_eq!(
            identity,
            Identity::Login {
                user: "u".to_string(),
                password: "p".to_string()
            }
        );
    }

    #[test]
    fn env_login_fills_missing_arguments() {
        let env = FakeEnv::default()
            .with(USER_ENV, "env-user")
            .with(PASSWORD_ENV, "env-pass");

        let identity = CredentialResolver::new(&env)
            .resolve(&sources(None, None, None))
            .unwrap();

        assert_eq!(
            identity,
            Identity::Login {
                user: "env-user".to_string(),
                password: "env-pass".to_string()
            }
        );
    }

    #[test]
    fn prompts_for_username_then_password_as_last_resort() {
        let env = FakeEnv::default();
        let prompter = ScriptedPrompter::default();

        let identity = CredentialResolver::new(&env)
            .with_prompter(&prompter)
            .resolve(&sources(None, None, None))
            .unwrap();

        assert_eq!(
            *prompter.asked.borrow(),
            vec![PromptKind::Username, PromptKind::Password]
        );
        assert_eq!(
            identity,
            Identity::Login {
                user: "typed-user".to_string(),
                password: "typed-pass".to_string()
            }
        );
    }

    #[test]
    fn only_password_is_prompted_when_user_is_known() {
        let env = FakeEnv::default();
        let prompter = ScriptedPrompter::default();

        CredentialResolver::new(&env)
            .with_prompter(&prompter)
            .resolve(&sources(None, Some("u"), None))
            .unwrap();

        assert_eq!(*prompter.asked.borrow(), vec![PromptKind::Password]);
    }

    #[test]
    fn missing_credentials_without_prompter_is_arg_error() {
        let env = FakeEnv::default();

        let result = CredentialResolver::new(&env).resolve(&sources(None, None, None));

        assert!(matches!(result, Err(CredentialError::Arg(_))));
    }

    #[test]
    fn user_without_password_is_arg_error() {
        let env = FakeEnv::default();

        let result = CredentialResolver::new(&env).resolve(&sources(None, Some("u"), None));

        assert!(matches!(result, Err(CredentialError::Arg(msg)) if msg.contains("'u'")));
    }

    #[test]
    fn empty_values_are_treated_as_absent() {
        let env = FakeEnv::default().with(TOKEN_ENV, "");

        let identity = CredentialResolver::new(&env)
            .resolve(&sources(Some(""), Some("u"), Some("p")))
            .unwrap();

        assert!(matches!(identity, Identity::Login { .. }));
    }

    #[test]
    fn prefixed_env_names_are_used_for_pipeline_stages() {
        let names = EnvNames::with_prefix("MODEL_");
        assert_eq!(names.token, "MODEL_API_TOKEN");
        assert_eq!(names.user, "MODEL_API_USER");
        assert_eq!(names.password, "MODEL_API_PASSWORD");
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let login = Identity::Login {
            user: "u".to_string(),
            password: "hunter2".to_string(),
        };
        let token = Identity::Token("abc123".to_string());

        assert!(!format!("{:?}", login).contains("hunter2"));
        assert!(!format!("{:?}", token).contains("abc123"));
    }
}

pub mod model;
pub mod pipeline;
pub mod select_template;

use crate::cli::CredentialArgs;
use crate::config::SessionOptions;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use cathsm::core::credentials::{
    CredentialSources, EnvNames, ProcessEnv, Prompter, TerminalPrompter,
};
use cathsm::core::store::{self, ConfigStore, SharedStore};
use cathsm::engine::error::EngineError;
use cathsm::engine::progress::ProgressReporter;
use cathsm::workflows::manager::StageCredentials;
use cathsm::workflows::services::ServiceProfile;
use tokio::sync::mpsc;
use tracing::debug;

/// Opens the token store named on the command line, or the platform default.
pub(crate) fn open_store(session: &SessionOptions) -> Result<SharedStore> {
    let store = match &session.config_path {
        Some(path) => ConfigStore::open(path),
        None => ConfigStore::open_default(),
    }
    .map_err(EngineError::from)?;
    debug!("Using token store {:?}", store.path());
    Ok(store::shared(store))
}

pub(crate) fn stage_credentials(
    profile: &ServiceProfile,
    args: &CredentialArgs,
    env_names: &EnvNames,
    session: &SessionOptions,
) -> StageCredentials<'static> {
    let prompter: Option<&'static dyn Prompter> = if session.prompt {
        Some(&TerminalPrompter)
    } else {
        None
    };

    StageCredentials {
        sources: CredentialSources::standard(
            profile.section,
            args.token.clone(),
            args.user.clone(),
            args.password.clone(),
            env_names,
        ),
        env: &ProcessEnv,
        prompter,
        clear_config: session.delete_config,
    }
}

pub(crate) fn progress_reporter(ui_sender: mpsc::Sender<UiEvent>) -> ProgressReporter<'static> {
    let handler = CliProgressHandler::new(ui_sender);
    ProgressReporter::with_callback(handler.get_callback())
}

use crate::cli::CredentialArgs;
use cathsm::workflows::manager::StageSettings;
use cathsm::workflows::pipeline::PipelineSettings;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Token store location; `None` selects the platform default.
    pub config_path: Option<PathBuf>,
    pub delete_config: bool,
    pub prompt: bool,
}

pub struct StageCommandConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stage: StageSettings,
    pub credentials: CredentialArgs,
    pub session: SessionOptions,
}

pub struct PipelineCommandConfig {
    pub input: PathBuf,
    pub settings: PipelineSettings,
    pub template_credentials: CredentialArgs,
    pub model_credentials: CredentialArgs,
    pub session: SessionOptions,
}

use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{PipelineCommandConfig, SessionOptions, StageCommandConfig};
use crate::cli::{CredentialArgs, ModelArgs, PipelineArgs, PollArgs, SelectTemplateArgs, SessionArgs};
use crate::error::{CliError, Result};
use cathsm::engine::job::PollPolicy;
use cathsm::workflows::manager::StageSettings;
use cathsm::workflows::pipeline::PipelineSettings;
use cathsm::workflows::services::{HOMOLOGY_MODEL, SELECT_TEMPLATE, ServiceProfile};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub fn build_select_template_config(args: &SelectTemplateArgs) -> Result<StageCommandConfig> {
    build_stage_config(
        &SELECT_TEMPLATE,
        &args.input,
        &args.output,
        args.base_url.as_deref(),
        &args.credentials,
        &args.poll,
        &args.session,
    )
}

pub fn build_model_config(args: &ModelArgs) -> Result<StageCommandConfig> {
    build_stage_config(
        &HOMOLOGY_MODEL,
        &args.input,
        &args.output,
        args.base_url.as_deref(),
        &args.credentials,
        &args.poll,
        &args.session,
    )
}

pub fn build_pipeline_config(args: &PipelineArgs) -> Result<PipelineCommandConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file_config(&args.session)?;
    let poll = merge_poll_policy(&args.poll, &file_config, &defaults)?;

    let start_seq = usize::try_from(args.start_seq)
        .map_err(|_| CliError::Config(format!("--start-seq {} is out of range", args.start_seq)))?;

    let mut settings = PipelineSettings::new(args.output.clone());
    settings.template = merge_stage_settings(
        &SELECT_TEMPLATE,
        args.template_base_url.as_deref(),
        &file_config,
        poll,
    )?;
    settings.model = merge_stage_settings(
        &HOMOLOGY_MODEL,
        args.model_base_url.as_deref(),
        &file_config,
        poll,
    )?;
    settings.start_seq = start_seq;

    Ok(PipelineCommandConfig {
        input: args.input.clone(),
        settings,
        template_credentials: args.template_credentials(),
        model_credentials: args.model_credentials(),
        session: session_options(&args.session),
    })
}

fn build_stage_config(
    profile: &ServiceProfile,
    input: &Path,
    output: &Path,
    base_url: Option<&str>,
    credentials: &CredentialArgs,
    poll: &PollArgs,
    session: &SessionArgs,
) -> Result<StageCommandConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = load_file_config(session)?;
    let poll = merge_poll_policy(poll, &file_config, &defaults)?;
    let stage = merge_stage_settings(profile, base_url, &file_config, poll)?;
    debug!("Resolved {} settings: {:?}", profile.section, stage);

    Ok(StageCommandConfig {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        stage,
        credentials: credentials.clone(),
        session: session_options(session),
    })
}

fn session_options(session: &SessionArgs) -> SessionOptions {
    SessionOptions {
        config_path: session.config.clone(),
        delete_config: session.delete_config,
        prompt: !session.no_prompt,
    }
}

fn load_file_config(session: &SessionArgs) -> Result<FileConfig> {
    let file_config = match &session.settings {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    apply_set_values(file_config, &session.set_values)
}

fn merge_poll_policy(
    args: &PollArgs,
    file_config: &FileConfig,
    defaults: &DefaultsConfig,
) -> Result<PollPolicy> {
    let sleep_secs = args
        .sleep
        .or(file_config.sleep)
        .unwrap_or(defaults.sleep_secs);
    let max_attempts = args
        .max_polls
        .or(file_config.max_polls)
        .or(defaults.max_polls);
    let timeout_secs = args
        .poll_timeout
        .or(file_config.poll_timeout)
        .or(defaults.poll_timeout_secs);

    if max_attempts == Some(0) {
        return Err(CliError::Config("max-polls must be at least 1".to_string()));
    }
    if timeout_secs == Some(0) {
        return Err(CliError::Config("poll-timeout must be at least 1 second".to_string()));
    }

    Ok(PollPolicy {
        interval: Duration::from_secs(sleep_secs),
        max_attempts,
        timeout: timeout_secs.map(Duration::from_secs),
    })
}

fn merge_stage_settings(
    profile: &ServiceProfile,
    cli_base_url: Option<&str>,
    file_config: &FileConfig,
    poll: PollPolicy,
) -> Result<StageSettings> {
    let file_service = file_config.service(profile.section).cloned().unwrap_or_default();

    let base_url = cli_base_url
        .map(str::to_string)
        .or(file_service.base_url)
        .unwrap_or_else(|| profile.default_base_url.to_string());
    validate_base_url(&base_url)?;

    let auth_scheme = file_service
        .auth_scheme
        .unwrap_or_else(|| profile.auth_scheme.to_string());
    if auth_scheme.trim().is_empty() || auth_scheme.contains(char::is_whitespace) {
        return Err(CliError::Config(format!(
            "Invalid auth scheme for {}: '{}'",
            profile.section, auth_scheme
        )));
    }

    Ok(StageSettings {
        base_url,
        auth_scheme,
        poll,
    })
}

fn validate_base_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(CliError::Config(format!(
            "Invalid base URL '{}': expected http:// or https:// followed by a host",
            url
        ))),
    }
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "sleep" => config.sleep = Some(parse_integer(key, value_str)?),
            "max-polls" => config.max_polls = Some(parse_integer(key, value_str)?),
            "poll-timeout" => config.poll_timeout = Some(parse_integer(key, value_str)?),
            _ => {
                let target = key.split_once('.').and_then(|(section, field)| {
                    config.service_mut(section).map(|service| (service, field))
                });
                match target {
                    Some((service, "base-url")) => service.base_url = Some(value_str.to_string()),
                    Some((service, "auth-scheme")) => {
                        service.auth_scheme = Some(value_str.to_string())
                    }
                    _ => {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    }
                }
            }
        }
    }
    Ok(config)
}

fn parse_integer<N: std::str::FromStr>(key: &str, value_str: &str) -> Result<N> {
    value_str.trim().parse().map_err(|_| {
        CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
    })
}

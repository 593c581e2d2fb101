use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Ian Sillitoe",
    version,
    about = "cathsm - Command-line client for the CATH template-selection and SWISS-MODEL homology-modelling APIs.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of sequences processed in parallel by `pipeline`.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select template structures for a query sequence (CATH API).
    SelectTemplate(SelectTemplateArgs),
    /// Build a 3D model from a target/template alignment (SWISS-MODEL API).
    Model(ModelArgs),
    /// Run template selection and modelling for every sequence in a FASTA file.
    Pipeline(PipelineArgs),
}

/// Credentials for a single service. Missing values fall back to the environment,
/// the token store and finally an interactive prompt.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialArgs {
    /// API user
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// API password
    #[arg(long = "pass", value_name = "PASSWORD")]
    pub password: Option<String>,

    /// API token (takes precedence over user/password)
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

/// Status polling overrides.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PollArgs {
    /// Seconds to wait between status checks
    #[arg(long, value_name = "SECS")]
    pub sleep: Option<u64>,

    /// Give up after this many status checks
    #[arg(long, value_name = "NUM")]
    pub max_polls: Option<u32>,

    /// Give up once a job has been pending for this many seconds
    #[arg(long, value_name = "SECS")]
    pub poll_timeout: Option<u64>,
}

/// Token store and settings file options.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionArgs {
    /// Token store file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Settings file in TOML format
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Remove stored settings (including the API token) for the service before running
    #[arg(long)]
    pub delete_config: bool,

    /// Never prompt for missing credentials
    #[arg(long)]
    pub no_prompt: bool,

    /// Override a settings file value, e.g. `--set homology-model.base-url=https://...`
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

/// Arguments for the `select-template` subcommand.
#[derive(Args, Debug)]
pub struct SelectTemplateArgs {
    /// Submission file (JSON with `query_id` and `query_sequence`)
    #[arg(short, long = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Output file for the search results and resolved hits (JSON)
    #[arg(short, long = "out", value_name = "PATH")]
    pub output: PathBuf,

    /// Override the service base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(flatten)]
    pub poll: PollArgs,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the `model` subcommand.
#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Submission file (JSON alignment with template details)
    #[arg(short, long = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Output file for the model coordinates (PDB)
    #[arg(short, long = "out", value_name = "PATH")]
    pub output: PathBuf,

    /// Override the service base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(flatten)]
    pub poll: PollArgs,

    #[command(flatten)]
    pub session: SessionArgs,
}

/// Arguments for the `pipeline` subcommand.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Input sequences (FASTA)
    #[arg(short, long = "in", value_name = "PATH")]
    pub input: PathBuf,

    /// Output directory (one sub-directory per sequence)
    #[arg(short, long = "out", value_name = "DIR")]
    pub output: PathBuf,

    /// 1-based index of the first sequence to process
    #[arg(long, value_name = "NUM", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub start_seq: u64,

    /// Override the template-selection service base URL
    #[arg(long, value_name = "URL")]
    pub template_base_url: Option<String>,

    /// Override the modelling service base URL
    #[arg(long, value_name = "URL")]
    pub model_base_url: Option<String>,

    /// Template-selection API user
    #[arg(long, value_name = "USER")]
    pub template_user: Option<String>,

    /// Template-selection API password
    #[arg(long, value_name = "PASSWORD")]
    pub template_pass: Option<String>,

    /// Template-selection API token
    #[arg(long, value_name = "TOKEN")]
    pub template_token: Option<String>,

    /// Modelling API user
    #[arg(long, value_name = "USER")]
    pub model_user: Option<String>,

    /// Modelling API password
    #[arg(long, value_name = "PASSWORD")]
    pub model_pass: Option<String>,

    /// Modelling API token
    #[arg(long, value_name = "TOKEN")]
    pub model_token: Option<String>,

    #[command(flatten)]
    pub poll: PollArgs,

    #[command(flatten)]
    pub session: SessionArgs,
}

impl PipelineArgs {
    pub fn template_credentials(&self) -> CredentialArgs {
        CredentialArgs {
            user: self.template_user.clone(),
            password: self.template_pass.clone(),
            token: self.template_token.clone(),
        }
    }

    pub fn model_credentials(&self) -> CredentialArgs {
        CredentialArgs {
            user: self.model_user.clone(),
            password: self.model_pass.clone(),
            token: self.model_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_select_template_with_credentials() {
        let cli = Cli::parse_from([
            "cathsm",
            "-vv",
            "select-template",
            "--in",
            "query.json",
            "--out",
            "hits.json",
            "--user",
            "alice",
            "--pass",
            "secret",
            "--sleep",
            "2",
            "--set",
            "max-polls=10",
        ]);

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::SelectTemplate(args) => {
                assert_eq!(args.input, PathBuf::from("query.json"));
                assert_eq!(args.credentials.user.as_deref(), Some("alice"));
                assert_eq!(args.credentials.password.as_deref(), Some("secret"));
                assert_eq!(args.poll.sleep, Some(2));
                assert!(!args.session.delete_config);
                assert_eq!(args.session.set_values, vec!["max-polls=10".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pipeline_defaults_to_first_sequence() {
        let cli = Cli::parse_from(["cathsm", "pipeline", "--in", "seqs.fa", "--out", "models"]);

        match cli.command {
            Commands::Pipeline(args) => {
                assert_eq!(args.start_seq, 1);
                assert_eq!(args.template_credentials(), CredentialArgs::default());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pipeline_splits_per_stage_credentials() {
        let cli = Cli::parse_from([
            "cathsm",
            "pipeline",
            "--in",
            "seqs.fa",
            "--out",
            "models",
            "--start-seq",
            "3",
            "--template-token",
            "t",
            "--model-user",
            "bob",
        ]);

        match cli.command {
            Commands::Pipeline(args) => {
                assert_eq!(args.start_seq, 3);
                assert_eq!(args.template_credentials().token.as_deref(), Some("t"));
                assert_eq!(args.model_credentials().user.as_deref(), Some("bob"));
                assert_eq!(args.model_credentials().token, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn start_seq_must_be_positive() {
        let result = Cli::try_parse_from([
            "cathsm",
            "pipeline",
            "--in",
            "seqs.fa",
            "--out",
            "models",
            "--start-seq",
            "0",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from([
            "cathsm", "-q", "-v", "model", "--in", "a.json", "--out", "a.pdb",
        ]);

        assert!(result.is_err());
    }
}

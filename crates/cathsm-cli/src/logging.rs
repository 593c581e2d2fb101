use crate::cli::Cli;
use crate::error::{CliError, Result};
use crate::ui::UiEvent;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter, writer::BoxMakeWriter},
    prelude::*,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub verbosity: u8,
    pub quiet: bool,
    pub log_file: Option<PathBuf>,
}

impl From<&Cli> for LoggingConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            verbosity: cli.verbose,
            quiet: cli.quiet,
            log_file: cli.log_file.clone(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::OFF
        } else {
            match self.verbosity {
                0 => LevelFilter::WARN,
                1 => LevelFilter::INFO,
                2 => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            }
        }
    }
}

/// Routes console log lines through the UI task so they print above the progress bars.
#[derive(Clone)]
struct UiLogWriter {
    sender: mpsc::Sender<UiEvent>,
}

impl io::Write for UiLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf).trim_end().to_string();
        if !line.is_empty() {
            if let Err(e) = self.sender.try_send(UiEvent::Log(line)) {
                if let UiEvent::Log(line) = e.into_inner() {
                    eprintln!("{line}");
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for UiLogWriter {
    type Writer = UiLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

pub fn setup_logging(config: &LoggingConfig, ui: Option<mpsc::Sender<UiEvent>>) -> Result<()> {
    let console_writer = match ui {
        Some(sender) => BoxMakeWriter::new(UiLogWriter { sender }),
        None => BoxMakeWriter::new(io::stderr),
    };

    let console_layer = fmt::layer()
        .with_writer(console_writer)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = File::create(path).map_err(CliError::Io)?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(config.level_filter())
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Config(format!("failed to install logger: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use std::thread;
    use std::time::Duration;
    use tracing::{debug, error, info, trace, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            let config = LoggingConfig {
                verbosity: 3,
                ..LoggingConfig::default()
            };
            setup_logging(&config, None).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    fn verbosity_maps_to_level_filter() {
        let level = |verbosity, quiet| {
            LoggingConfig {
                verbosity,
                quiet,
                log_file: None,
            }
            .level_filter()
        };

        assert_eq!(level(0, false), LevelFilter::WARN);
        assert_eq!(level(1, false), LevelFilter::INFO);
        assert_eq!(level(2, false), LevelFilter::DEBUG);
        assert_eq!(level(7, false), LevelFilter::TRACE);
        assert_eq!(level(2, true), LevelFilter::OFF);
    }

    #[test]
    #[serial]
    fn initialization_and_macros_work() {
        ensure_global_logger_is_set();

        error!("This is an error");
        warn!("This is a warning");
        info!("This is info");
        debug!("This is debug");
        trace!("This is trace");
    }

    #[test]
    #[serial]
    fn file_logging_can_be_added_to_global_logger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let file = File::create(log_path.clone()).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!("Message for file-only test.");
        });

        thread::sleep(Duration::from_millis(100));

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Message for file-only test."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn console_lines_are_forwarded_to_ui_channel() {
        let (sender, mut receiver) = mpsc::channel(8);
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(UiLogWriter { sender })
                .with_ansi(false)
                .with_target(false),
        );

        tracing::subscriber::with_default(subscriber, || {
            info!("Submitted job <p1>");
        });

        match receiver.try_recv().unwrap() {
            UiEvent::Log(line) => {
                assert!(line.contains("Submitted job <p1>"));
                assert!(!line.ends_with('\n'));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let config = LoggingConfig {
                log_file: Some(invalid_path),
                ..LoggingConfig::default()
            };
            let result = setup_logging(&config, None);
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}

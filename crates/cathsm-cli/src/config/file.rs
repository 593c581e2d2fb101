use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Per-service overrides, one table per service section.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileServiceConfig {
    pub base_url: Option<String>,
    pub auth_scheme: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub sleep: Option<u64>,
    pub max_polls: Option<u32>,
    pub poll_timeout: Option<u64>,
    pub select_template: Option<FileServiceConfig>,
    pub homology_model: Option<FileServiceConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading settings file {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// The table for a service section, if the file has one.
    pub fn service(&self, section: &str) -> Option<&FileServiceConfig> {
        match section {
            "select-template" => self.select_template.as_ref(),
            "homology-model" => self.homology_model.as_ref(),
            _ => None,
        }
    }

    pub fn service_mut(&mut self, section: &str) -> Option<&mut FileServiceConfig> {
        match section {
            "select-template" => Some(self.select_template.get_or_insert_with(Default::default)),
            "homology-model" => Some(self.homology_model.get_or_insert_with(Default::default)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_polling_and_service_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            r#"
            sleep = 2
            max-polls = 30

            [homology-model]
            base-url = "https://swissmodel.expasy.org"
            auth-scheme = "Token"
            "#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();

        assert_eq!(config.sleep, Some(2));
        assert_eq!(config.max_polls, Some(30));
        assert_eq!(config.poll_timeout, None);
        let model = config.service("homology-model").unwrap();
        assert_eq!(model.base_url.as_deref(), Some("https://swissmodel.expasy.org"));
        assert!(config.service("select-template").is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "slep = 2\n").unwrap();

        let result = FileConfig::from_file(&path);

        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn missing_file_is_a_parsing_error_naming_the_path() {
        let path = Path::new("/nonexistent/cathsm/settings.toml");

        match FileConfig::from_file(path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result {other:?}"),
        }
    }
}

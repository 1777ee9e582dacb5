//! Repository config file (`key=value` lines, `#` comments).

use crate::error::{Error, Result};
use crate::hash::Algorithm;
use std::fs;
use std::path::Path;

/// Supported config format version.
pub const CONFIG_VERSION: &str = "1";

/// Settings fixed at `init` time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoConfig {
    pub algorithm: Algorithm,
}

impl RepoConfig {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    /// Read and parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Write the config file to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        crate::store::write_atomic(path, self.render().as_bytes())
    }

    /// Parse config file content.
    pub fn parse(content: &str) -> Result<Self> {
        let mut version = None;
        let mut algo = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some(CONFIG_VERSION) {
            return Err(Error::invalid_config(format!(
                "Unsupported config version: {:?}",
                version
            )));
        }

        let algo_str = algo.ok_or_else(|| Error::invalid_config("Missing algo in config"))?;
        Ok(Self {
            algorithm: Algorithm::parse(algo_str)?,
        })
    }

    /// Render config file content.
    pub fn render(&self) -> String {
        format!(
            "version={}\nalgo={}\n",
            CONFIG_VERSION,
            self.algorithm.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let config = RepoConfig::parse("version=1\nalgo=sha1\n").unwrap();
        assert_eq!(config.algorithm, Algorithm::Sha1);
    }

    #[test]
    fn test_parse_config_with_comments() {
        let config =
            RepoConfig::parse("# Comment\nversion=1\nalgo=blake3-160\n# Another comment\n").unwrap();
        assert_eq!(config.algorithm, Algorithm::Blake3);
    }

    #[test]
    fn test_parse_config_invalid_version() {
        assert!(RepoConfig::parse("version=99\nalgo=sha1\n").is_err());
        assert!(RepoConfig::parse("algo=sha1\n").is_err());
    }

    #[test]
    fn test_parse_config_missing_algo() {
        assert!(RepoConfig::parse("version=1\n").is_err());
    }

    #[test]
    fn test_parse_config_unknown_algo() {
        let err = RepoConfig::parse("version=1\nalgo=md5\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm { .. }));
    }

    #[test]
    fn test_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");

        let config = RepoConfig::new(Algorithm::Blake3);
        config.save(&path).unwrap();

        assert_eq!(RepoConfig::load(&path).unwrap(), config);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "version=1\nalgo=blake3-160\n"
        );
    }
}

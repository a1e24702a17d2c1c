use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::matching::Granularity;

/// File name looked up in a package root when no config path is given.
pub const CONFIG_FILE_NAME: &str = ".daa.toml";

/// Top-level DAA configuration, matching `.daa.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaaConfig {
    #[serde(default)]
    pub scope: ScopeSection,
    #[serde(default)]
    pub normalize: NormalizeSection,
    #[serde(default)]
    pub matching: MatchingSection,
}

/// Which files of a revision are captured and indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeSection {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for ScopeSection {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*.py".into(), "**/*.pyi".into(), "**/*.java".into()],
            exclude_patterns: vec![
                "**/.git/**".into(),
                "**/__pycache__/**".into(),
                "**/.venv/**".into(),
                "**/venv/**".into(),
                "**/node_modules/**".into(),
                "**/target/**".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSection {
    /// Remove `'` and `"` from rule names, descriptions and messages.
    pub strip_quotes: bool,
    /// Extra path prefixes removed from reported file paths, e.g. `build`.
    pub strip_prefixes: Vec<String>,
}

impl Default for NormalizeSection {
    fn default() -> Self {
        Self {
            strip_quotes: true,
            strip_prefixes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingSection {
    pub granularity: Granularity,
}

impl DaaConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        let config = Self::parse(&text)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load `.daa.toml` from `dir`, or defaults when there is none.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scope.include_patterns.is_empty() {
            return Err(ConfigError::Invalid(
                "scope.include_patterns must not be empty".to_string(),
            ));
        }
        for pattern in self
            .scope
            .include_patterns
            .iter()
            .chain(&self.scope.exclude_patterns)
        {
            glob::Pattern::new(pattern)
                .map_err(|e| ConfigError::Invalid(format!("bad glob {pattern:?}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = DaaConfig::parse("").unwrap();
        assert!(config.normalize.strip_quotes);
        assert_eq!(config.matching.granularity, Granularity::Context);
        assert!(config.scope.include_patterns.iter().any(|p| p == "**/*.java"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = DaaConfig::parse(
            r#"
            [normalize]
            strip_prefixes = ["build"]
            strip_quotes = false

            [matching]
            granularity = "package"
            "#,
        )
        .unwrap();

        assert!(!config.normalize.strip_quotes);
        assert_eq!(config.normalize.strip_prefixes, vec!["build".to_string()]);
        assert_eq!(config.matching.granularity, Granularity::Package);
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = DaaConfig::parse("[matching\ngranularity = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_granularity_is_rejected() {
        let err = DaaConfig::parse("[matching]\ngranularity = \"line\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_include_list_is_invalid() {
        let err = DaaConfig::parse("[scope]\ninclude_patterns = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_or_default_reads_package_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DaaConfig::load_or_default(dir.path()).unwrap().normalize.strip_quotes);

        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[normalize]\nstrip_quotes = false\n",
        )
        .unwrap();
        assert!(!DaaConfig::load_or_default(dir.path()).unwrap().normalize.strip_quotes);
    }

    #[test]
    fn missing_explicit_config_is_not_found() {
        let err = DaaConfig::load(Path::new("/nonexistent/.daa.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}

use crate::link::AnchorStyle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default file name looked up by the command-line front end.
pub const CONFIG_FILE_NAME: &str = "classdex.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Inputs for building and using a class index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct IndexConfig {
    /// Dotted namespace that scopes which classes are indexed.
    pub base_package: String,
    /// Directories and archives to scan, in priority order. An entry may hold
    /// several paths joined by the platform path separator.
    pub classpath: Vec<String>,
    pub duplicate_classes: DuplicateClassPolicy,
    /// Base URL of the published Javadoc, used when rendering links.
    pub javadoc_url: Option<String>,
    pub anchor_style: AnchorStyle,
}

impl IndexConfig {
    pub fn new(base_package: impl Into<String>) -> Self {
        Self {
            base_package: base_package.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Classpath entries split into individual roots.
    pub fn roots(&self) -> Vec<PathBuf> {
        expand_classpath(&self.classpath)
    }
}

impl FromStr for IndexConfig {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(text)?)
    }
}

/// What to do when two roots both provide a class with the same
/// fully-qualified name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateClassPolicy {
    /// The definition scanned last replaces earlier ones.
    #[default]
    LastWriteWins,
    /// Abort index construction.
    Fail,
}

impl fmt::Display for DuplicateClassPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DuplicateClassPolicy::LastWriteWins => "last-write-wins",
            DuplicateClassPolicy::Fail => "fail",
        };
        f.write_str(label)
    }
}

pub fn expand_classpath(raw: &[String]) -> Vec<PathBuf> {
    let mut result = Vec::new();
    let separator = if cfg!(windows) { ';' } else { ':' };
    for entry in raw {
        for part in entry.split(separator) {
            if part.trim().is_empty() {
                continue;
            }
            result.push(PathBuf::from(part));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IndexConfig::default();
        assert!(config.base_package.is_empty());
        assert!(config.classpath.is_empty());
        assert_eq!(config.duplicate_classes, DuplicateClassPolicy::LastWriteWins);
        assert_eq!(config.anchor_style, AnchorStyle::Legacy);
        assert!(config.javadoc_url.is_none());
    }

    #[test]
    fn parses_toml() {
        let config: IndexConfig = r#"
            base-package = "com.example"
            classpath = ["build/classes", "lib/a.jar"]
            duplicate-classes = "fail"
            javadoc-url = "https://docs.example.com/api/"
            anchor-style = "modern"
        "#
        .parse()
        .expect("valid configuration");

        assert_eq!(config.base_package, "com.example");
        assert_eq!(
            config.roots(),
            vec![PathBuf::from("build/classes"), PathBuf::from("lib/a.jar")]
        );
        assert_eq!(config.duplicate_classes, DuplicateClassPolicy::Fail);
        assert_eq!(config.javadoc_url.as_deref(), Some("https://docs.example.com/api/"));
        assert_eq!(config.anchor_style, AnchorStyle::Modern);
    }

    #[test]
    fn rejects_unknown_keys() {
        let error = "base-pakage = \"typo\"".parse::<IndexConfig>().unwrap_err();
        assert!(matches!(error, ConfigError::Toml(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let error = IndexConfig::load(Path::new("/definitely/missing/classdex.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn expands_joined_classpath_entries() {
        let raw = vec!["a:b".to_string(), " ".to_string(), "c::".to_string()];
        assert_eq!(
            expand_classpath(&raw),
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::{error::ConfigError, writer::Output};

pub const DEFAULT_TOOL: &str = "pbgen";
pub const DEFAULT_SCHEMA_EXT: &str = "proto";

/// Settings shared by every backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Glob fragments relative to the schema root; `*` matches within one
    /// path segment.
    pub skip:       Vec<String>,
    pub out_dir:    PathBuf,
    /// Output extension including the dot; backends supply their own default.
    pub file_ext:   Option<String>,
    /// Name stamped into the generated-file marker.
    pub tool:       String,
    /// Extension picked up when expanding directories.
    pub schema_ext: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            skip:       Vec::new(),
            out_dir:    PathBuf::from("generated"),
            file_ext:   None,
            tool:       DEFAULT_TOOL.to_string(),
            schema_ext: DEFAULT_SCHEMA_EXT.to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn skip_list(&self) -> Result<SkipList, ConfigError> {
        SkipList::new(&self.skip)
    }

    /// Creates the output root and hands back the output handle for it.
    pub fn output(&self, default_ext: &str) -> Result<Output, ConfigError> {
        let unusable = |reason: String| ConfigError::OutputRoot {
            path: self.out_dir.clone(),
            reason,
        };
        fs::create_dir_all(&self.out_dir).map_err(|e| unusable(e.to_string()))?;
        let meta = fs::metadata(&self.out_dir).map_err(|e| unusable(e.to_string()))?;
        if !meta.is_dir() {
            return Err(unusable("not a directory".to_string()));
        }
        if meta.permissions().readonly() {
            return Err(unusable("read-only".to_string()));
        }
        let ext = self.file_ext.as_deref().unwrap_or(default_ext);
        Ok(Output::new(&self.out_dir, ext, &self.tool))
    }
}

/// Compiled skip patterns.
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    patterns: Vec<Regex>,
}

impl SkipList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(SkipList { patterns })
    }

    /// `relpath` uses `/` separators and is relative to the schema root.
    /// Patterns match a prefix of the path.
    pub fn matches(&self, relpath: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(relpath))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]*");
    Regex::new(&format!("^{}", body)).map_err(|source| ConfigError::SkipPattern {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_star_stays_inside_one_segment() {
        let skip = SkipList::new(&["legacy/*.proto"]).unwrap();
        assert!(skip.matches("legacy/old.proto"));
        assert!(!skip.matches("legacy/v1/old.proto"));
        assert!(!skip.matches("app/legacy/old.proto"));
    }

    #[test]
    fn test_patterns_match_prefixes_literally() {
        let skip = SkipList::new(&["vendor/", "a.b"]).unwrap();
        assert!(skip.matches("vendor/x/y.proto"));
        assert!(skip.matches("a.b.proto"));
        assert!(!skip.matches("axb.proto"));
        assert!(!SkipList::default().matches("anything"));
    }

    #[test]
    fn test_config_from_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pbgen.json");
        fs::write(&path, r#"{ "skip": ["tmp/*"], "out_dir": "out", "file_ext": ".kt" }"#).unwrap();

        let config = CompilerConfig::from_path(&path).unwrap();
        assert_eq!(config.skip, vec!["tmp/*".to_string()]);
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.file_ext.as_deref(), Some(".kt"));
        assert_eq!(config.tool, DEFAULT_TOOL);
        assert_eq!(config.schema_ext, DEFAULT_SCHEMA_EXT);
    }

    #[test]
    fn test_unknown_config_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pbgen.json");
        fs::write(&path, r#"{ "skipp": [] }"#).unwrap();
        assert!(matches!(CompilerConfig::from_path(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_output_root_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("taken");
        fs::write(&file, "").unwrap();
        let config = CompilerConfig {
            out_dir: file,
            ..CompilerConfig::default()
        };
        assert!(matches!(config.output(".java"), Err(ConfigError::OutputRoot { .. })));

        let config = CompilerConfig {
            out_dir: dir.path().join("fresh/out"),
            ..CompilerConfig::default()
        };
        let output = config.output(".java").unwrap();
        assert!(dir.path().join("fresh/out").is_dir());
        assert_eq!(output.file_ext(), ".java");
    }
}

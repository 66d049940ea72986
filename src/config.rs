use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, StrataError};
use crate::store::wal::Durability;

pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";
pub const DEFAULT_KEY_ENV: &str = "STRATA_LEDGER_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub project: ProjectConfig,
    pub scan: ScanConfig,
    pub architecture: ArchitectureConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig { name: "strata".to_string() }
    }
}

/// File selection and scoring knobs for a scan pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directories relative to the repository root. Entries escaping the root are ignored.
    pub include_dirs: Vec<PathBuf>,
    /// Directory names pruned anywhere in the walk, compared case-insensitively.
    pub exclude_dirs: Vec<String>,
    pub max_file_kb: u64,
    pub include_tests: bool,
    /// Cyclomatic estimate at which a function is listed as a hotspot.
    pub hotspot_threshold: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            include_dirs: vec![PathBuf::from(".")],
            exclude_dirs: Vec::new(),
            max_file_kb: 512,
            include_tests: true,
            hotspot_threshold: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayerRule {
    pub name: String,
    pub markers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForbiddenRule {
    pub from: String,
    pub to: String,
}

/// Layer classification table (ordered, first match wins) and the forbidden
/// layer pairs checked by the reachability guard.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerRule>,
    pub forbidden: Vec<ForbiddenRule>,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        let layer = |name: &str, markers: &[&str]| LayerRule {
            name: name.to_string(),
            markers: markers.iter().map(|m| m.to_string()).collect(),
        };

        ArchitectureConfig {
            layers: vec![
                layer("core", &["core"]),
                layer("io", &["io", "db", "storage", "net", "network", "http", "fs", "adapters"]),
                layer("policy", &["policy", "governance", "rules"]),
            ],
            forbidden: vec![ForbiddenRule {
                from: "core".to_string(),
                to: "io".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ledger file; falls back to the platform data directory when unset.
    pub path: Option<PathBuf>,
    /// Environment variable holding the HMAC key.
    pub key_env: String,
    pub durability: Durability,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            path: None,
            key_env: DEFAULT_KEY_ENV.to_string(),
            durability: Durability::Buffered,
        }
    }
}

impl LedgerConfig {
    /// Resolve the ledger path (~/.local/share/strata/ledger.log or platform equivalent)
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let data_dir = directories::ProjectDirs::from("", "", "strata")
            .ok_or_else(|| StrataError::Config {
                path: PathBuf::from(DEFAULT_CONFIG_FILE),
                message: "could not determine data directory; set [ledger] path".to_string(),
            })?
            .data_dir()
            .to_path_buf();

        Ok(data_dir.join("ledger.log"))
    }
}

impl Config {
    /// Parse a config file. A file that is missing or malformed is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StrataError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            StrataError::Toml(err) => StrataError::Config {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` when given, else `<root>/strata.toml` if present, else defaults.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = root.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Config::default())
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |message: String| StrataError::Config {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            message,
        };

        for rule in &self.architecture.layers {
            if rule.name.is_empty() || rule.markers.is_empty() {
                return Err(invalid(format!("layer '{}' needs a name and at least one marker", rule.name)));
            }
        }

        for rule in &self.architecture.forbidden {
            if rule.from == rule.to {
                return Err(invalid(format!("forbidden rule {} -> {} names the same layer twice", rule.from, rule.to)));
            }
        }

        if self.ledger.key_env.is_empty() {
            return Err(invalid("[ledger] key_env must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.scan.max_file_kb, 512);
        assert!(config.scan.include_tests);
        assert_eq!(config.architecture.layers[0].name, "core");
        assert_eq!(config.architecture.forbidden, vec![ForbiddenRule { from: "core".into(), to: "io".into() }]);
        assert_eq!(config.ledger.key_env, DEFAULT_KEY_ENV);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
[project]
name = "demo"

[scan]
exclude_dirs = ["venv"]
max_file_kb = 64
include_tests = false

[[architecture.layers]]
name = "domain"
markers = ["domain"]

[[architecture.forbidden]]
from = "domain"
to = "unknown"

[ledger]
path = "audit/ledger.log"
durability = "fsync"
"#,
        )
        .unwrap();

        assert_eq!(config.project.name, "demo");
        assert_eq!(config.scan.exclude_dirs, vec!["venv".to_string()]);
        assert_eq!(config.scan.max_file_kb, 64);
        assert!(!config.scan.include_tests);
        assert_eq!(config.architecture.layers.len(), 1);
        assert_eq!(config.ledger.durability, Durability::Fsync);
        assert_eq!(config.ledger.resolve_path().unwrap(), PathBuf::from("audit/ledger.log"));
    }

    #[test]
    fn layer_without_markers_is_rejected() {
        let result = Config::parse("[[architecture.layers]]\nname = \"core\"\nmarkers = []\n");
        assert!(matches!(result, Err(StrataError::Config { .. })));
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(Config::parse("[uml]\nengine = \"plantuml\"\n").is_err());
    }

    #[test]
    fn missing_explicit_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::discover(dir.path(), Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(StrataError::Config { .. })));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(dir.path(), None).unwrap();
        assert_eq!(config.project.name, "strata");
    }
}

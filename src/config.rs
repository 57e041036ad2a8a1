//! Input resolution for a publish run.
//!
//! Inputs arrive in three layers (highest wins):
//! 1. CLI flags
//! 2. `INPUT_*` environment variables, as set by the GitHub Actions runner
//! 3. An optional TOML file passed with `--config`
//!
//! Layers 1 and 2 are merged by clap; this module fills the gaps from the file
//! and validates the result into an immutable [`PublishConfig`]. The workflow
//! environment (`GITHUB_SHA`, `GITHUB_REPOSITORY`, ...) is read separately into
//! [`GitHubEnv`].
//!
//! Empty or whitespace-only values at any layer are treated as absent. The
//! runner exports every declared input, so an unset optional input shows up as
//! an empty `INPUT_*` variable.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::github::{DEFAULT_API_URL, RepoSlug};
use crate::template::{NameTemplate, TemplateError};

/// Number of commit SHA characters used to tag assets.
pub const SHORT_HASH_LEN: usize = 6;

const SHA_ENV_VAR: &str = "GITHUB_SHA";
const REPOSITORY_ENV_VAR: &str = "GITHUB_REPOSITORY";
const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
const API_URL_ENV_VAR: &str = "GITHUB_API_URL";

/// Configuration errors. All of them are raised before any remote call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    #[error("Input '{input}' must be a positive integer, got '{value}'")]
    InvalidInteger { input: &'static str, value: String },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Environment variable {0} is required but not set")]
    MissingEnv(&'static str),

    #[error("Repository must be in 'owner/repo' form, got '{0}'")]
    InvalidRepository(String),

    #[error("Commit SHA must be at least 6 characters, got '{0}'")]
    InvalidSha(String),
}

// ---------------------------------------------------------------------------
// Raw inputs
// ---------------------------------------------------------------------------

/// Unvalidated input values, as strings, from one or more layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishInputs {
    pub upload_url: Option<String>,
    pub asset_path: Option<String>,
    pub asset_content_type: Option<String>,
    pub max_releases: Option<String>,
    pub release_id: Option<String>,
    pub asset_name: Option<String>,
}

impl PublishInputs {
    /// Fill every absent or blank field from `fallback`.
    pub fn or(self, fallback: PublishInputs) -> PublishInputs {
        fn pick(primary: Option<String>, fallback: Option<String>) -> Option<String> {
            non_empty_trimmed(primary).or_else(|| non_empty_trimmed(fallback))
        }
        PublishInputs {
            upload_url: pick(self.upload_url, fallback.upload_url),
            asset_path: pick(self.asset_path, fallback.asset_path),
            asset_content_type: pick(self.asset_content_type, fallback.asset_content_type),
            max_releases: pick(self.max_releases, fallback.max_releases),
            release_id: pick(self.release_id, fallback.release_id),
            asset_name: pick(self.asset_name, fallback.asset_name),
        }
    }
}

/// Optional TOML file supplying defaults for inputs and workflow settings.
///
/// ```toml
/// upload_url = "https://uploads.github.com/repos/octo/widgets/releases/42/assets{?name,label}"
/// release_id = 42
/// asset_path = "target/dist/widgets.zip"
/// asset_content_type = "application/zip"
/// asset_name = "widgets-$$.zip"
/// max_releases = 7
/// repository = "octo/widgets"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub upload_url: Option<String>,
    pub asset_path: Option<String>,
    pub asset_content_type: Option<String>,
    pub max_releases: Option<u64>,
    pub release_id: Option<u64>,
    pub asset_name: Option<String>,
    /// Fallback for `GITHUB_API_URL`.
    pub api_url: Option<String>,
    /// Fallback for `GITHUB_REPOSITORY`.
    pub repository: Option<String>,
}

impl FileConfig {
    /// Load and parse a config file. Unlike an absent `--config` flag, a path
    /// that cannot be read is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file at {}", path.display()))
    }

    /// The input layer this file contributes.
    pub fn inputs(&self) -> PublishInputs {
        PublishInputs {
            upload_url: self.upload_url.clone(),
            asset_path: self.asset_path.clone(),
            asset_content_type: self.asset_content_type.clone(),
            max_releases: self.max_releases.map(|n| n.to_string()),
            release_id: self.release_id.map(|n| n.to_string()),
            asset_name: self.asset_name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated configuration
// ---------------------------------------------------------------------------

/// Validated inputs for one publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub upload_url: String,
    pub asset_path: PathBuf,
    pub content_type: String,
    /// `None` disables pruning.
    pub max_releases: Option<NonZeroUsize>,
    pub release_id: u64,
    pub template: NameTemplate,
}

impl PublishConfig {
    pub fn from_inputs(inputs: &PublishInputs) -> Result<Self, ConfigError> {
        let upload_url = required(&inputs.upload_url, "upload_url")?;
        let asset_path = required(&inputs.asset_path, "asset_path")?;
        let content_type = required(&inputs.asset_content_type, "asset_content_type")?;
        let release_id = parse_positive(required(&inputs.release_id, "release_id")?, "release_id")?;
        let asset_name = required(&inputs.asset_name, "asset_name")?;

        let max_releases = match non_empty(&inputs.max_releases) {
            Some(raw) => {
                let n = parse_positive(raw, "max_releases")?;
                let n = usize::try_from(n).map_err(|_| ConfigError::InvalidInteger {
                    input: "max_releases",
                    value: raw.to_string(),
                })?;
                NonZeroUsize::new(n)
            }
            None => None,
        };

        Ok(Self {
            upload_url: upload_url.to_string(),
            asset_path: PathBuf::from(asset_path),
            content_type: content_type.to_string(),
            max_releases,
            release_id,
            template: NameTemplate::parse(asset_name)?,
        })
    }
}

/// Workflow environment: which commit, which repository, which credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubEnv {
    pub short_hash: String,
    pub repository: RepoSlug,
    pub token: String,
    pub api_url: String,
}

impl GitHubEnv {
    /// Read the workflow environment from the process environment.
    pub fn from_env(file: &FileConfig) -> Result<Self, ConfigError> {
        Self::from_env_with(file, |key| std::env::var(key).ok())
    }

    /// Internal resolver that accepts an env lookup for testability.
    pub fn from_env_with<F>(file: &FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sha = non_empty_trimmed(lookup(SHA_ENV_VAR))
            .ok_or(ConfigError::MissingEnv(SHA_ENV_VAR))?;
        let short_hash = short_hash(&sha)?;

        let repository = non_empty_trimmed(lookup(REPOSITORY_ENV_VAR))
            .or_else(|| non_empty_trimmed(file.repository.clone()))
            .ok_or(ConfigError::MissingEnv(REPOSITORY_ENV_VAR))?;
        let repository =
            RepoSlug::parse(&repository).ok_or(ConfigError::InvalidRepository(repository))?;

        let token = non_empty_trimmed(lookup(TOKEN_ENV_VAR))
            .ok_or(ConfigError::MissingEnv(TOKEN_ENV_VAR))?;

        let api_url = non_empty_trimmed(lookup(API_URL_ENV_VAR))
            .or_else(|| non_empty_trimmed(file.api_url.clone()))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            short_hash,
            repository,
            token,
            api_url,
        })
    }
}

/// The first [`SHORT_HASH_LEN`] characters of a commit SHA.
pub fn short_hash(sha: &str) -> Result<String, ConfigError> {
    sha.trim()
        .get(..SHORT_HASH_LEN)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::InvalidSha(sha.to_string()))
}

fn required<'a>(value: &'a Option<String>, input: &'static str) -> Result<&'a str, ConfigError> {
    non_empty(value).ok_or(ConfigError::MissingInput(input))
}

fn parse_positive(raw: &str, input: &'static str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidInteger {
            input,
            value: raw.to_string(),
        }),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Return the trimmed value if non-empty after trimming, otherwise `None`.
fn non_empty_trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn full_inputs() -> PublishInputs {
        PublishInputs {
            upload_url: Some("https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}".into()),
            asset_path: Some("dist/app.zip".into()),
            asset_content_type: Some("application/zip".into()),
            max_releases: Some("3".into()),
            release_id: Some("1".into()),
            asset_name: Some("app-$$.zip".into()),
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn workflow_env() -> impl Fn(&str) -> Option<String> {
        env(&[
            ("GITHUB_SHA", "1234567890abcdef1234567890abcdef12345678"),
            ("GITHUB_REPOSITORY", "octo/widgets"),
            ("GITHUB_TOKEN", "ghs_secret"),
        ])
    }

    // -----------------------------------------------------------------------
    // PublishConfig
    // -----------------------------------------------------------------------

    #[test]
    fn test_from_inputs_full() {
        let cfg = PublishConfig::from_inputs(&full_inputs()).unwrap();
        assert_eq!(cfg.release_id, 1);
        assert_eq!(cfg.asset_path, PathBuf::from("dist/app.zip"));
        assert_eq!(cfg.content_type, "application/zip");
        assert_eq!(cfg.max_releases, NonZeroUsize::new(3));
        assert_eq!(cfg.template.prefix(), "app-");
        assert_eq!(cfg.template.suffix(), ".zip");
    }

    #[test]
    fn test_missing_required_input() {
        let mut inputs = full_inputs();
        inputs.asset_path = None;
        let err = PublishConfig::from_inputs(&inputs).unwrap_err();
        assert!(matches!(err, ConfigError::MissingInput("asset_path")));
        assert_eq!(err.to_string(), "Input required and not supplied: asset_path");
    }

    #[test]
    fn test_blank_input_counts_as_missing() {
        let mut inputs = full_inputs();
        inputs.upload_url = Some("   ".into());
        assert!(matches!(
            PublishConfig::from_inputs(&inputs),
            Err(ConfigError::MissingInput("upload_url"))
        ));
    }

    #[test]
    fn test_max_releases_is_optional() {
        let mut inputs = full_inputs();
        inputs.max_releases = Some(String::new());
        let cfg = PublishConfig::from_inputs(&inputs).unwrap();
        assert_eq!(cfg.max_releases, None);

        inputs.max_releases = None;
        assert_eq!(PublishConfig::from_inputs(&inputs).unwrap().max_releases, None);
    }

    #[test]
    fn test_max_releases_rejects_zero_and_garbage() {
        for bad in ["0", "-1", "three", "3abc"] {
            let mut inputs = full_inputs();
            inputs.max_releases = Some(bad.into());
            let err = PublishConfig::from_inputs(&inputs).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidInteger { input: "max_releases", .. }),
                "expected invalid integer for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_release_id_must_be_numeric() {
        let mut inputs = full_inputs();
        inputs.release_id = Some("v1.0".into());
        let err = PublishConfig::from_inputs(&inputs).unwrap_err();
        assert!(err.to_string().contains("release_id"));
    }

    #[test]
    fn test_asset_name_template_is_validated() {
        let mut inputs = full_inputs();
        inputs.asset_name = Some("app.zip".into());
        let err = PublishConfig::from_inputs(&inputs).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Template(TemplateError::MissingPlaceholder(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Layering
    // -----------------------------------------------------------------------

    #[test]
    fn test_or_prefers_primary_and_skips_blank() {
        let primary = PublishInputs {
            release_id: Some("7".into()),
            asset_name: Some("  ".into()),
            ..Default::default()
        };
        let merged = primary.or(full_inputs());
        assert_eq!(merged.release_id.as_deref(), Some("7"));
        assert_eq!(merged.asset_name.as_deref(), Some("app-$$.zip"));
        assert_eq!(merged.asset_path.as_deref(), Some("dist/app.zip"));
    }

    #[test]
    fn test_file_config_load_and_inputs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("publish.toml");
        std::fs::write(
            &path,
            r#"
release_id = 42
max_releases = 5
asset_name = "nightly-$$.tar.gz"
repository = "octo/widgets"
"#,
        )
        .unwrap();

        let file = FileConfig::load_from(&path).unwrap();
        assert_eq!(file.repository.as_deref(), Some("octo/widgets"));
        let inputs = file.inputs();
        assert_eq!(inputs.release_id.as_deref(), Some("42"));
        assert_eq!(inputs.max_releases.as_deref(), Some("5"));
        assert_eq!(inputs.upload_url, None);
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("publish.toml");
        std::fs::write(&path, "max_release = 5\n").unwrap();
        let err = FileConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn test_file_config_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = FileConfig::load_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(format!("{err}").contains("failed to read config file"));
    }

    // -----------------------------------------------------------------------
    // GitHubEnv
    // -----------------------------------------------------------------------

    #[test]
    fn test_github_env_from_lookup() {
        let gh = GitHubEnv::from_env_with(&FileConfig::default(), workflow_env()).unwrap();
        assert_eq!(gh.short_hash, "123456");
        assert_eq!(gh.repository.owner, "octo");
        assert_eq!(gh.repository.repo, "widgets");
        assert_eq!(gh.token, "ghs_secret");
        assert_eq!(gh.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_github_env_api_url_precedence() {
        let file = FileConfig {
            api_url: Some("https://file.example.com/api/v3".into()),
            ..Default::default()
        };
        let gh = GitHubEnv::from_env_with(&file, workflow_env()).unwrap();
        assert_eq!(gh.api_url, "https://file.example.com/api/v3");

        let lookup = env(&[
            ("GITHUB_SHA", "abcdef0"),
            ("GITHUB_REPOSITORY", "octo/widgets"),
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_API_URL", "https://ghe.example.com/api/v3"),
        ]);
        let gh = GitHubEnv::from_env_with(&file, lookup).unwrap();
        assert_eq!(gh.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_github_env_repository_falls_back_to_file() {
        let file = FileConfig {
            repository: Some("octo/gadgets".into()),
            ..Default::default()
        };
        let lookup = env(&[("GITHUB_SHA", "abcdef0"), ("GITHUB_TOKEN", "t")]);
        let gh = GitHubEnv::from_env_with(&file, lookup).unwrap();
        assert_eq!(gh.repository.to_string(), "octo/gadgets");
    }

    #[test]
    fn test_github_env_missing_token() {
        let lookup = env(&[("GITHUB_SHA", "abcdef0"), ("GITHUB_REPOSITORY", "o/r")]);
        let err = GitHubEnv::from_env_with(&FileConfig::default(), lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv("GITHUB_TOKEN")));
    }

    #[test]
    fn test_github_env_bad_repository() {
        let lookup = env(&[
            ("GITHUB_SHA", "abcdef0"),
            ("GITHUB_REPOSITORY", "just-a-name"),
            ("GITHUB_TOKEN", "t"),
        ]);
        let err = GitHubEnv::from_env_with(&FileConfig::default(), lookup).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository(ref r) if r == "just-a-name"));
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("abcdef0123").unwrap(), "abcdef");
        assert_eq!(short_hash("abcdef").unwrap(), "abcdef");
        assert!(matches!(short_hash("abc"), Err(ConfigError::InvalidSha(_))));
    }
}

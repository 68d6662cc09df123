//! Configuration loading and resolution of effective settings.
//!
//! Precedence, highest first: command-line flags, `qlreport.toml`
//! (or `--config`), built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use qlreport_types::{
    ConfigFile, DEFAULT_MAX_CHARS, DEFAULT_MAX_PROMOTED, DEFAULT_PACING_MS, PLATFORM_MAX_CHARS,
    ReadErrorPolicy,
};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "qlreport.toml";

/// Loads the explicit config, else `./qlreport.toml` if present, else defaults.
pub fn load_config<F>(path: Option<&Path>, expand_env: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Result<String>,
{
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.exists() {
                debug!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
                return Ok(ConfigFile::default());
            }
            p
        }
    };

    info!("Loading config from: {}", path.display());
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let expanded = expand_env(&text)?;
    let config: ConfigFile =
        toml::from_str(&expanded).with_context(|| format!("parse config '{}'", path.display()))?;

    validate_config(&config).with_context(|| format!("validate config '{}'", path.display()))?;
    Ok(config)
}

fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.defaults.max_chars == Some(0) {
        bail!("defaults.max_chars must be greater than zero");
    }
    if let Some(git_ref) = &config.defaults.git_ref {
        if git_ref.trim().is_empty() {
            bail!("defaults.git_ref must not be empty");
        }
    }
    Ok(())
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub max_chars: usize,
    pub max_promoted: usize,
    pub pacing: Duration,
    pub git_ref: Option<String>,
    pub on_read_error: ReadErrorPolicy,
}

impl Settings {
    pub fn from_config(config: &ConfigFile) -> Self {
        let d = &config.defaults;
        Self {
            max_chars: d.max_chars.unwrap_or(DEFAULT_MAX_CHARS),
            max_promoted: d.max_promoted.unwrap_or(DEFAULT_MAX_PROMOTED),
            pacing: Duration::from_millis(d.pacing_ms.unwrap_or(DEFAULT_PACING_MS)),
            git_ref: d.git_ref.clone(),
            on_read_error: d.on_read_error.unwrap_or(ReadErrorPolicy::Abort),
        }
    }

    /// Character budget after a command-line override. Budgets above the
    /// platform limit are allowed; documents are still cut at the platform limit.
    pub fn budget(&self, flag: Option<usize>) -> Result<usize> {
        let budget = flag.unwrap_or(self.max_chars);
        if budget == 0 {
            bail!("--max-chars must be greater than zero");
        }
        if budget > PLATFORM_MAX_CHARS {
            warn!(
                "character budget {budget} exceeds the platform limit of {PLATFORM_MAX_CHARS}; \
                 documents are cut at the platform limit instead"
            );
        }
        Ok(budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_expand(s: &str) -> Result<String> {
        Ok(s.to_string())
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = load_config(None, no_expand);
        // The test runs in the crate directory, which has no qlreport.toml.
        assert_eq!(cfg.unwrap(), ConfigFile::default());
    }

    #[test]
    fn explicit_file_is_parsed_and_resolved() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[defaults]
max_chars = 30000
pacing_ms = 0
git_ref = "main"
on_read_error = "skip"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path), no_expand).unwrap();
        let settings = Settings::from_config(&cfg);
        assert_eq!(
            settings,
            Settings {
                max_chars: 30_000,
                max_promoted: DEFAULT_MAX_PROMOTED,
                pacing: Duration::ZERO,
                git_ref: Some("main".to_string()),
                on_read_error: ReadErrorPolicy::Skip,
            }
        );
    }

    #[test]
    fn expansion_runs_before_parsing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("qlreport.toml");
        fs::write(&path, "[defaults]\nmax_promoted = @CAP@\n").unwrap();

        let cfg = load_config(Some(&path), |s| Ok(s.replace("@CAP@", "7"))).unwrap();
        assert_eq!(cfg.defaults.max_promoted, Some(7));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[defaults]\nmax_chars = 0\n").unwrap();

        let err = load_config(Some(&path), no_expand).unwrap_err();
        assert!(format!("{err:#}").contains("max_chars must be greater than zero"));
    }

    #[test]
    fn unknown_policy_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "[defaults]\non_read_error = \"retry\"\n").unwrap();

        let err = load_config(Some(&path), no_expand).unwrap_err();
        assert!(err.to_string().starts_with("parse config"));
    }

    #[test]
    fn flag_overrides_configured_budget() {
        let settings = Settings::from_config(&ConfigFile::default());
        assert_eq!(settings.budget(None).unwrap(), DEFAULT_MAX_CHARS);
        assert_eq!(settings.budget(Some(100)).unwrap(), 100);
        assert!(settings.budget(Some(0)).is_err());
    }
}

//! Locates and loads `llm-lint.toml`.
//!
//! Resolution order:
//!
//! 1. `--config` flag
//! 2. `{project}/llm-lint.toml`, then `{project}/.llm-lint.toml`
//! 3. `$LLM_LINT_CONFIG_DIR/config.toml`, else `~/.llm-lint/config.toml`
//! 4. built-in defaults with no rules
//!
//! The same file carries the pipeline settings and the `[[rule]]` definitions.

use anyhow::{Context, Result};
use llm_lint_core::{load_rules_from_toml, Config, RuleSet};
use std::path::{Path, PathBuf};

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Path of the config file, if one was found.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }
}

/// Settings and rules read from one config file.
#[derive(Debug)]
pub struct LoadedConfig {
    /// Pipeline settings.
    pub config: Config,
    /// Rule definitions.
    pub rules: RuleSet,
    /// Where they were read from.
    pub source: ConfigSource,
}

const PROJECT_CONFIG_NAMES: &[&str] = &["llm-lint.toml", ".llm-lint.toml"];
const GLOBAL_CONFIG_NAME: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "LLM_LINT_CONFIG_DIR";

/// Resolves which config file applies to `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir().as_deref())
}

/// Resolves and reads the config, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the resolved file cannot be read or its settings or
/// rule definitions are invalid.
pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let source = resolve(project_dir, explicit);
    load_from(source)
}

fn load_from(source: ConfigSource) -> Result<LoadedConfig> {
    let Some(path) = source.path() else {
        tracing::debug!("No config file found, using defaults");
        return Ok(LoadedConfig {
            config: Config::default(),
            rules: RuleSet::default(),
            source,
        });
    };
    if matches!(source, ConfigSource::Global(_)) {
        tracing::info!("Using global config: {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config = Config::parse(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    let rules = load_rules_from_toml(&content, Some(path))
        .with_context(|| format!("Invalid rule definitions in {}", path.display()))?;
    tracing::debug!("Loaded {} rule(s) from {}", rules.len(), path.display());

    Ok(LoadedConfig {
        config,
        rules,
        source,
    })
}

fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<&Path>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(found) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.is_file())
    {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, ConfigSource::Global)
}

/// `$LLM_LINT_CONFIG_DIR`, else `~/.llm-lint`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    std::env::var_os(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".llm-lint")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const RULE_CONFIG: &str = r#"
[linter]
concurrency = 3

[rules]
no-console = "warn"

[[rule]]
name = "no-console"
description = "Use the logger."
"#;

    #[test]
    fn explicit_wins_without_existence_check() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("llm-lint.toml"), "").unwrap();

        let result = resolve_in(project.path(), Some(Path::new("/nowhere.toml")), None);
        assert_eq!(result, ConfigSource::Explicit(PathBuf::from("/nowhere.toml")));
    }

    #[test]
    fn plain_name_preferred_over_dotfile() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("llm-lint.toml"), "").unwrap();
        fs::write(project.path().join(".llm-lint.toml"), "").unwrap();

        let result = resolve_in(project.path(), None, None);
        assert_eq!(
            result,
            ConfigSource::Project(project.path().join("llm-lint.toml"))
        );
    }

    #[test]
    fn dotfile_found_alone() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join(".llm-lint.toml"), "").unwrap();

        let result = resolve_in(project.path(), None, None);
        assert_eq!(
            result,
            ConfigSource::Project(project.path().join(".llm-lint.toml"))
        );
    }

    #[test]
    fn global_used_only_without_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config.toml"), "").unwrap();

        let result = resolve_in(project.path(), None, Some(global.path()));
        assert_eq!(
            result,
            ConfigSource::Global(global.path().join("config.toml"))
        );

        fs::write(project.path().join("llm-lint.toml"), "").unwrap();
        let result = resolve_in(project.path(), None, Some(global.path()));
        assert!(matches!(result, ConfigSource::Project(_)));
    }

    #[test]
    fn empty_global_dir_means_defaults() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        assert_eq!(
            resolve_in(project.path(), None, Some(global.path())),
            ConfigSource::Default
        );
        assert!(ConfigSource::Default.path().is_none());
    }

    #[test]
    fn load_reads_settings_and_rules_from_one_file() {
        let project = TempDir::new().unwrap();
        let path = project.path().join("llm-lint.toml");
        fs::write(&path, RULE_CONFIG).unwrap();

        let loaded = load_from(ConfigSource::Project(path)).unwrap();
        assert_eq!(loaded.config.linter.concurrency, 3);
        assert_eq!(loaded.rules.len(), 1);
        assert!(loaded.rules.get("no-console").is_some());
    }

    #[test]
    fn load_defaults_has_no_rules() {
        let loaded = load_from(ConfigSource::Default).unwrap();
        assert!(loaded.rules.is_empty());
        assert_eq!(loaded.config.linter.concurrency, 16);
    }

    #[test]
    fn load_reports_invalid_rule_with_path() {
        let project = TempDir::new().unwrap();
        let path = project.path().join("llm-lint.toml");
        fs::write(&path, "[[rule]]\nname = \"Bad Name\"\ndescription = \"x\"\n").unwrap();

        let err = load_from(ConfigSource::Project(path)).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("Invalid rule definitions"));
        assert!(chain.contains("rule[0].name"));
    }
}

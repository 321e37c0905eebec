//! Shared configuration loader for the cligram tools.
//!
//! `defaults/cligram.default.toml` is embedded so that documented defaults and runtime behavior
//! agree. [`Loader`] layers, lowest first:
//!
//!   - the embedded defaults,
//!   - a user file (`--config`),
//!   - `CLIGRAM_*` environment variables, `__` separating section and key, as in
//!     `CLIGRAM_MATCHING__CASE_INSENSITIVE=true`,
//!   - the tree named on the command line.

use cligram_engine::MatchOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/cligram.default.toml");

const ENV_PREFIX: &str = "CLIGRAM";

/// Top-level configuration consumed by cligram applications.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CligramConfig {
    pub matching: MatchingConfig,
    pub completion: CompletionConfig,
    pub session: SessionConfig,
}

/// How input words select grammar objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchingConfig {
    pub exclude_keys: bool,
    pub case_insensitive: bool,
    pub prefer_specific_types: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionConfig {
    pub show_hidden: bool,
}

/// Interactive and script sessions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    pub tree: String,
    pub prompt: String,
}

impl CligramConfig {
    /// Engine options for matching and completion.
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            exclude_keys: self.matching.exclude_keys,
            case_insensitive: self.matching.case_insensitive,
            prefer_specific_types: self.matching.prefer_specific_types,
            show_hidden: self.completion.show_hidden,
        }
    }
}

/// Builds a [`CligramConfig`] from the layers listed in the crate docs.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a TOML file. A missing file is an error when building.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer the `CLIGRAM_*` variables of the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_vars(None)
    }

    fn with_env_vars(mut self, vars: Option<Map<String, String>>) -> Self {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(vars);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Match against `tree`, whatever the other layers say.
    pub fn with_tree(mut self, tree: &str) -> Result<Self, ConfigError> {
        self.builder = self.builder.set_override("session.tree", tree)?;
        Ok(self)
    }

    pub fn build(self) -> Result<CligramConfig, ConfigError> {
        let config: CligramConfig = self.builder.build()?.try_deserialize()?;
        if config.session.tree.trim().is_empty() {
            return Err(ConfigError::Message(
                "session.tree must name a grammar tree".to_string(),
            ));
        }
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_default_config() {
        let config = Loader::new().build().expect("defaults to deserialize");
        assert!(config.matching.exclude_keys);
        assert!(!config.completion.show_hidden);
        assert_eq!(config.session.tree, "main");
        assert_eq!(config.session.prompt, "cli> ");
        assert_eq!(config.match_options(), MatchOptions::default());
    }

    #[test]
    fn environment_overrides_matching_options() {
        let config = Loader::new()
            .with_env_vars(Some(vars(&[
                ("CLIGRAM_MATCHING__CASE_INSENSITIVE", "true"),
                ("CLIGRAM_COMPLETION__SHOW_HIDDEN", "true"),
                ("CLIGRAM_SESSION__TREE", "config"),
                ("OTHER_MATCHING__EXCLUDE_KEYS", "false"),
            ])))
            .build()
            .expect("config to build");
        let opts = config.match_options();
        assert!(opts.case_insensitive);
        assert!(opts.show_hidden);
        assert!(opts.exclude_keys);
        assert_eq!(config.session.tree, "config");
    }

    #[test]
    fn tree_flag_wins_over_every_layer() {
        let config = Loader::new()
            .with_env_vars(Some(vars(&[("CLIGRAM_SESSION__TREE", "config")])))
            .with_tree("ops")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.session.tree, "ops");
        assert!(config.match_options().prefer_specific_types);
    }

    #[test]
    fn layers_user_files_under_the_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[completion]\nshow_hidden = true\n\n[session]\nprompt = \"r1# \"").unwrap();

        let config = Loader::new()
            .with_file(file.path())
            .with_env_vars(Some(vars(&[("CLIGRAM_SESSION__PROMPT", "env> ")])))
            .build()
            .unwrap();
        assert!(config.match_options().show_hidden);
        assert_eq!(config.session.prompt, "env> ");
        assert_eq!(config.session.tree, "main");
    }

    #[test]
    fn rejects_missing_files_and_empty_trees() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Loader::new().with_file(dir.path().join("absent.toml")).build().is_err());

        let err = Loader::new().with_tree(" ").unwrap().build().unwrap_err();
        assert!(err.to_string().contains("session.tree"));
    }
}

//! Tokenizer settings.
//!
//! `defaults/stlex.default.toml` is embedded into the library so that the
//! documented defaults and runtime behavior stay in sync. Applications layer
//! their own files on top via [`Loader`] before deserializing into [`Settings`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/stlex.default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub tokenizer: TokenizerSettings,
}

/// Knobs of the match loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenizerSettings {
    /// Token type for input no rule and no default token claims.
    pub fallback_token: String,
    /// Pushes beyond this depth are refused.
    pub max_stack_depth: usize,
    /// Consecutive zero-width transitions allowed at one offset.
    pub max_zero_width_steps: usize,
    /// Merge adjacent unmatched characters of the same type into one token.
    pub merge_unmatched: bool,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            fallback_token: "text".to_string(),
            max_stack_depth: 256,
            max_zero_width_steps: 32,
            merge_unmatched: true,
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
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

    /// Layer a settings file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional settings file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `tokenizer.fallback_token`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<Settings, ConfigError> {
    Loader::new().build()
}

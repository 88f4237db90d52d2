//! Translator configuration

use crate::error::{TranslateError, TranslateResult};
use serde::{Deserialize, Serialize};

/// Mode switches for a translation run
///
/// Options are copied into each analysis context, so changing them between
/// runs leaves nothing behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorOptions {
    /// Also functionize non-private methods that cannot be overridden
    /// (final methods, methods of final types, static methods)
    pub functionize_final_methods: bool,
}

/// Layout of `trama.toml`
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    translator: TranslatorOptions,
}

impl TranslatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functionize_final_methods(mut self, enabled: bool) -> Self {
        self.functionize_final_methods = enabled;
        self
    }

    /// Parse options from a `trama.toml` document (the `[translator]` table)
    pub fn from_toml_str(content: &str) -> TranslateResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| TranslateError::Config {
            message: e.to_string(),
        })?;
        Ok(file.translator)
    }
}

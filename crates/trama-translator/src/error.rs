//! Translation errors
//!
//! Every variant is fatal for the unit being translated. Ineligibility and
//! naming collisions are normal outcomes and never surface here.

use thiserror::Error;
use trama_ast::BindingsError;

pub type TranslateResult<T> = Result<T, TranslateError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslateError {
    #[error("Unresolved binding: {binding}")]
    UnresolvedBinding { binding: String },

    #[error("No scope recorded for {owner}")]
    UnknownScope { owner: String },

    #[error("No enclosing instance of {target} is reachable from {site}")]
    UnreachableInstance { site: String, target: String },

    #[error("Inconsistent nesting of {ty}: {message}")]
    InconsistentNesting { ty: String, message: String },

    #[error("Invalid translator configuration: {message}")]
    Config { message: String },

    #[error("Binding collection failed: {0}")]
    Bindings(#[from] BindingsError),
}

impl TranslateError {
    pub fn unresolved(binding: impl ToString) -> Self {
        TranslateError::UnresolvedBinding {
            binding: binding.to_string(),
        }
    }
}

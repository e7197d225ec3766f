//! Error types for whisker-core.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by a translation backend.
pub type TranslateError = Box<dyn std::error::Error + Send + Sync>;

/// All errors that abort a render call.
///
/// Anything not listed here degrades silently: unknown variables render
/// empty, unterminated sections and unrecognized tags stay literal.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template declared a pragma this renderer does not implement.
    #[error("this renderer does not understand the '{name}' pragma")]
    UnsupportedPragma { name: String },

    /// The template included a partial missing from the partial source.
    #[error("unknown partial '{name}'")]
    UnknownPartial { name: String },

    /// Partials nested deeper than the configured limit (usually a partial
    /// that includes itself unconditionally).
    #[error("partial '{name}' nested deeper than {limit} levels")]
    RecursionLimit { name: String, limit: usize },

    /// The translation backend failed on an i18n block.
    #[error("translation failed: {0}")]
    Translation(#[source] TranslateError),

    /// Context data converted to something other than a mapping.
    #[error("render context must be a mapping, found {found}")]
    InvalidContext { found: &'static str },

    /// JSON conversion error while building a context.
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from loading or validating [`RenderOptions`](crate::RenderOptions).
#[derive(Debug, Error)]
pub enum OptionsError {
    /// Underlying I/O failure while reading an options file.
    #[error("options io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse options at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML parse error for in-memory options text.
    #[error("YAML options error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Options parsed but describe an unusable configuration.
    #[error("invalid render options: {reason}")]
    Invalid { reason: String },
}

//! Render options.
//!
//! Options are plain data with serde defaults, so a YAML document only needs
//! to name the fields it changes:
//!
//! ```yaml
//! open_tag: "<%"
//! close_tag: "%>"
//! implicit_iterator: item
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Tunables for a renderer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Opening tag delimiter active at the start of every render call.
    pub open_tag: String,
    /// Closing tag delimiter active at the start of every render call.
    pub close_tag: String,
    /// Key a bare collection element is exposed under inside a section.
    /// The `IMPLICIT-ITERATOR` pragma overrides it per call.
    pub implicit_iterator: String,
    /// Maximum nesting of partial expansions before a render is aborted.
    pub max_partial_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            open_tag: "{{".to_string(),
            close_tag: "}}".to_string(),
            implicit_iterator: ".".to_string(),
            max_partial_depth: 128,
        }
    }
}

impl RenderOptions {
    /// Parse and validate options from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, OptionsError> {
        let options: RenderOptions = serde_yaml::from_str(yaml)?;
        options.validate()?;
        Ok(options)
    }

    /// Read, parse and validate an options file.
    pub fn load_at(path: &Path) -> Result<Self, OptionsError> {
        let text = std::fs::read_to_string(path).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let options: RenderOptions =
            serde_yaml::from_str(&text).map_err(|source| OptionsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        options.validate()?;
        Ok(options)
    }

    /// Reject configurations the tokenizer cannot work with.
    pub fn validate(&self) -> Result<(), OptionsError> {
        for (field, tag) in [("open_tag", &self.open_tag), ("close_tag", &self.close_tag)] {
            if tag.is_empty() || tag.chars().any(char::is_whitespace) {
                return Err(invalid(format!(
                    "{field} must be non-empty and contain no whitespace, got {tag:?}"
                )));
            }
        }
        if self.implicit_iterator.trim().is_empty() {
            return Err(invalid("implicit_iterator must not be blank"));
        }
        if self.max_partial_depth == 0 {
            return Err(invalid("max_partial_depth must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> OptionsError {
    OptionsError::Invalid {
        reason: reason.into(),
    }
}

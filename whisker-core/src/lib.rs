//! whisker core library: context values, render options, errors.
//!
//! - [`types`]: [`Value`], [`Map`] and the callable variants
//! - [`options`]: [`RenderOptions`]
//! - [`error`]: [`RenderError`], [`OptionsError`]

pub mod error;
pub mod options;
pub mod types;

pub use error::{OptionsError, RenderError, TranslateError};
pub use options::RenderOptions;
pub use types::{Lambda, Map, RenderFn, SectionLambda, Value};

//! Translation blocks: `{{_i}} … {{/i}}`.
//!
//! The block body is handed to a [`Translator`] and whatever comes back is
//! rendered as a template in the block's place.

use whisker_core::{Map, RenderError, TranslateError, Value};

use crate::engine::{self, RenderState};

/// Context key the `TRANSLATION-HINT` mode is published under.
pub const MODE_KEY: &str = "_mode";

/// Translation backend.
///
/// Receives the raw block text (still a template fragment) and the active
/// translation mode, returns replacement template text.
pub trait Translator {
    fn translate(&self, text: &str, mode: Option<&str>) -> Result<String, TranslateError>;
}

impl<F> Translator for F
where
    F: Fn(&str, Option<&str>) -> Result<String, TranslateError>,
{
    fn translate(&self, text: &str, mode: Option<&str>) -> Result<String, TranslateError> {
        self(text, mode)
    }
}

/// Translate one block and render the result against `scope`.
///
/// Without a translator the block body renders unchanged.
pub(crate) fn render_block(
    content: &str,
    scope: &Map,
    state: &mut RenderState<'_>,
) -> Result<String, RenderError> {
    let translated = match state.translator {
        Some(translator) => {
            let mode = translation_mode(scope, state);
            tracing::debug!("translating block ({} bytes, mode {:?})", content.len(), mode);
            translator
                .translate(content, mode.as_deref())
                .map_err(RenderError::Translation)?
        }
        None => content.to_owned(),
    };
    engine::render_fragment(&translated, scope, state)
}

/// The pragma's mode wins; otherwise a truthy `_mode` in the local scope.
fn translation_mode(scope: &Map, state: &RenderState<'_>) -> Option<String> {
    state
        .pragmas
        .translation_mode()
        .map(str::to_owned)
        .or_else(|| {
            scope
                .get(MODE_KEY)
                .filter(|v| v.is_truthy())
                .map(Value::to_text)
        })
}

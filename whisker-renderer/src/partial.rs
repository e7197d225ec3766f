//! Partials: `{{>name}}`.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use whisker_core::{Map, RenderError, Value};

use crate::engine::{self, RenderState};

/// Supplies partial template text by name.
///
/// Where the text comes from (memory, files, network) is up to the caller.
pub trait PartialSource {
    fn get_partial(&self, name: &str) -> Option<Cow<'_, str>>;

    fn contains_partial(&self, name: &str) -> bool {
        self.get_partial(name).is_some()
    }
}

impl<S: BuildHasher> PartialSource for HashMap<String, String, S> {
    fn get_partial(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|s| Cow::Borrowed(s.as_str()))
    }

    fn contains_partial(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

impl PartialSource for BTreeMap<String, String> {
    fn get_partial(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|s| Cow::Borrowed(s.as_str()))
    }

    fn contains_partial(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

/// Expand the partial `name`.
///
/// If the local scope holds a mapping under the same name, the partial
/// renders with that mapping as its scope; otherwise with `scope` itself.
pub(crate) fn render_partial(
    name: &str,
    scope: &Map,
    state: &mut RenderState<'_>,
) -> Result<String, RenderError> {
    let name = name.trim();
    let source = state
        .partials
        .and_then(|partials| partials.get_partial(name))
        .ok_or_else(|| RenderError::UnknownPartial {
            name: name.to_owned(),
        })?;

    let limit = state.options.max_partial_depth;
    if state.partial_depth >= limit {
        return Err(RenderError::RecursionLimit {
            name: name.to_owned(),
            limit,
        });
    }

    tracing::trace!("expanding partial '{}' at depth {}", name, state.partial_depth);
    state.partial_depth += 1;
    let rendered = match scope.get(name) {
        Some(Value::Map(sub)) => engine::render_fragment(&source, sub, state),
        _ => engine::render_fragment(&source, scope, state),
    };
    state.partial_depth -= 1;
    rendered
}

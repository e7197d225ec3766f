//! Variable lookup: local scope first, then the root context.
//!
//! Lookup is single-segment: `{{a.b}}` looks up a key literally named `a.b`.

use std::borrow::Cow;

use whisker_core::{Map, Value};

/// Resolve `name` against `local`, falling back to `root`.
///
/// A scope answers only if its value is present (see
/// [`Value::is_present`]), so `false` and `0` shadow outer values while
/// `null` and `""` do not. A [`Value::Lambda`] is invoked with `local` as its
/// receiver and its result returned. `None` means the name is unknown.
pub fn find<'v>(name: &str, local: &'v Map, root: &'v Map) -> Option<Cow<'v, Value>> {
    let name = name.trim();
    let value = local
        .get(name)
        .filter(|v| v.is_present())
        .or_else(|| root.get(name).filter(|v| v.is_present()))?;
    match value {
        Value::Lambda(lambda) => Some(Cow::Owned(lambda.call(local))),
        other => Some(Cow::Borrowed(other)),
    }
}

/// The scope a section renders one collection element in: a mapping element
/// is used as is, anything else is exposed under `iterator`.
pub fn element_scope<'v>(element: &'v Value, iterator: &str) -> Cow<'v, Map> {
    match element {
        Value::Map(map) => Cow::Borrowed(map),
        other => {
            let mut scope = Map::new();
            scope.insert(iterator, other.clone());
            Cow::Owned(scope)
        }
    }
}

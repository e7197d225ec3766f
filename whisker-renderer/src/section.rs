//! Sections: `{{#name}}…{{/name}}` and `{{^name}}…{{/name}}`.
//!
//! | kind | value | output |
//! |------|-------|--------|
//! | `^` | absent, falsy or empty list | body once, current scope |
//! | `^` | anything else | nothing |
//! | `#` | list | body per element, element scope, concatenated |
//! | `#` | mapping | body once, mapping as scope |
//! | `#` | section lambda | lambda(raw body, render) verbatim |
//! | `#` | other truthy | body once, current scope |
//! | `#` | absent or falsy | nothing |

use whisker_core::{Map, RenderError, Value};

use crate::context;
use crate::engine::{self, RenderState};
use crate::parser::{Section, SectionKind};

pub(crate) fn render_section(
    section: &Section,
    scope: &Map,
    state: &mut RenderState<'_>,
) -> Result<String, RenderError> {
    let root = state.root;
    let value = context::find(&section.name, scope, root);

    match section.kind {
        SectionKind::Inverted => {
            let show = value
                .as_deref()
                .map_or(true, |v| !v.is_truthy() || v.is_empty_list());
            if show {
                engine::render_nodes(&section.children, scope, state)
            } else {
                Ok(String::new())
            }
        }
        SectionKind::Normal => match value.as_deref() {
            Some(Value::List(items)) => {
                let mut out = String::new();
                for item in items {
                    let iterator = state.iterator_key();
                    let element = context::element_scope(item, &iterator);
                    let scoped = state.with_mode(&element);
                    out.push_str(&engine::render_nodes(&section.children, &scoped, state)?);
                }
                Ok(out)
            }
            Some(Value::Map(sub)) => {
                let sub = state.with_mode(sub);
                engine::render_nodes(&section.children, &sub, state)
            }
            Some(Value::Section(lambda)) => {
                let mut render = |text: &str| {
                    state.delimiters = section.delimiters.clone();
                    engine::render_fragment(text, scope, state)
                };
                lambda.call(&section.source, &mut render)
            }
            Some(v) if v.is_truthy() => engine::render_nodes(&section.children, scope, state),
            _ => Ok(String::new()),
        },
    }
}

//! Render pipeline and the public [`Renderer`].
//!
//! Every text fragment goes through the same steps, whether it is the
//! top-level template, a partial, a translated block or text handed back by a
//! section lambda:
//!
//! 1. Fast path: a fragment without any tag marker is returned verbatim.
//! 2. Parse into a [`Template`] under the call's current delimiters.
//! 3. Activate every pragma tag found in the tree.
//! 4. Publish the `TRANSLATION-HINT` mode into the scope as `_mode`.
//! 5. Render the nodes, recursing for sections, partials and i18n blocks.
//!
//! All of this shares one `RenderState` per top-level call, passed by
//! `&mut`: a pragma seen anywhere stays in effect for the rest of that call
//! and never leaks into another one. Delimiters follow the text: an included
//! fragment is parsed under the pair active at its inclusion point.

use std::borrow::Cow;

use serde::Serialize;

use whisker_core::{Map, OptionsError, RenderError, RenderOptions, Value};

use crate::context;
use crate::escape::escape_html;
use crate::i18n::{self, Translator, MODE_KEY};
use crate::parser::{Delimiters, Node, Template, I18N_OPEN};
use crate::partial::{self, PartialSource};
use crate::pragma::{self, PragmaRegistry};
use crate::section;
use crate::sink::{LineBuffer, OutputSink};

// ---------------------------------------------------------------------------
// Per-call state
// ---------------------------------------------------------------------------

/// Mutable configuration of a single top-level render call.
pub(crate) struct RenderState<'a> {
    pub(crate) delimiters: Delimiters,
    pub(crate) pragmas: PragmaRegistry,
    pub(crate) root: &'a Map,
    pub(crate) partials: Option<&'a dyn PartialSource>,
    pub(crate) translator: Option<&'a dyn Translator>,
    pub(crate) options: &'a RenderOptions,
    pub(crate) partial_depth: usize,
}

impl<'a> RenderState<'a> {
    fn new(
        renderer: &'a Renderer,
        root: &'a Map,
        partials: Option<&'a dyn PartialSource>,
    ) -> Self {
        Self {
            delimiters: Delimiters::from_options(&renderer.options),
            pragmas: PragmaRegistry::default(),
            root,
            partials,
            translator: renderer.translator.as_deref(),
            options: &renderer.options,
            partial_depth: 0,
        }
    }

    /// Key bare collection elements are exposed under right now.
    pub(crate) fn iterator_key(&self) -> String {
        self.pragmas
            .iterator_key()
            .unwrap_or(&self.options.implicit_iterator)
            .to_owned()
    }

    /// `scope` with the `TRANSLATION-HINT` mode published under `_mode`.
    pub(crate) fn with_mode<'s>(&self, scope: &'s Map) -> Cow<'s, Map> {
        match self.pragmas.translation_mode() {
            Some(mode) if scope.get(MODE_KEY).and_then(Value::as_str) != Some(mode) => {
                let mut scoped = scope.clone();
                scoped.insert(MODE_KEY, mode);
                Cow::Owned(scoped)
            }
            _ => Cow::Borrowed(scope),
        }
    }

    fn has_tags(&self, text: &str) -> bool {
        text.contains(self.delimiters.open()) || text.contains(I18N_OPEN)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Render a text fragment against `scope`, keeping every line.
pub(crate) fn render_fragment(
    text: &str,
    scope: &Map,
    state: &mut RenderState<'_>,
) -> Result<String, RenderError> {
    if !state.has_tags(text) {
        return Ok(text.to_owned());
    }

    let template = Template::parse(text, &state.delimiters);
    pragma::activate_all(&template, &mut state.pragmas)?;

    let scoped = state.with_mode(scope);
    render_nodes(&template.nodes, &scoped, state)
}

/// Render parsed nodes in order and concatenate the output.
pub(crate) fn render_nodes(
    nodes: &[Node],
    scope: &Map,
    state: &mut RenderState<'_>,
) -> Result<String, RenderError> {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable { name, escape } => {
                let text = context::find(name, scope, state.root)
                    .map(|value| value.to_text())
                    .unwrap_or_default();
                if *escape {
                    out.push_str(&escape_html(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Node::Comment | Node::Pragma { .. } | Node::SetDelimiters(_) => {}
            Node::Partial { name, delimiters } => {
                state.delimiters = delimiters.clone();
                out.push_str(&partial::render_partial(name, scope, state)?);
            }
            Node::Translate {
                content,
                delimiters,
            } => {
                state.delimiters = delimiters.clone();
                out.push_str(&i18n::render_block(content, scope, state)?);
            }
            Node::Section(block) => out.push_str(&section::render_section(block, scope, state)?),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Logic-less template renderer.
///
/// Holds only immutable configuration, so one instance can serve any number
/// of render calls; every call gets fresh delimiters and pragmas.
pub struct Renderer {
    options: RenderOptions,
    translator: Option<Box<dyn Translator>>,
}

impl Renderer {
    /// A renderer with default options and no translator.
    pub fn new() -> Self {
        Self {
            options: RenderOptions::default(),
            translator: None,
        }
    }

    /// A renderer with validated custom options.
    pub fn with_options(options: RenderOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        Ok(Self {
            options,
            translator: None,
        })
    }

    /// Use `translator` for `{{_i}}` blocks.
    pub fn with_translator(mut self, translator: impl Translator + 'static) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    /// Options every render call starts from.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `template` and return the output, non-empty lines joined with
    /// `\n`. A template without tags is returned unchanged.
    pub fn render(
        &self,
        template: &str,
        context: &Map,
        partials: Option<&dyn PartialSource>,
    ) -> Result<String, RenderError> {
        let mut buffer = LineBuffer::new();
        self.render_to(template, context, partials, &mut buffer)?;
        Ok(buffer.join())
    }

    /// Render `template`, pushing each non-empty output line to `sink`.
    ///
    /// Lines are split after all expansion, so blank lines coming from
    /// partials or translated blocks are dropped as well.
    ///
    /// Output is only pushed once the whole template rendered, so a failed
    /// render leaves the sink untouched.
    pub fn render_to(
        &self,
        template: &str,
        context: &Map,
        partials: Option<&dyn PartialSource>,
        sink: &mut dyn OutputSink,
    ) -> Result<(), RenderError> {
        let mut state = RenderState::new(self, context, partials);
        if !state.has_tags(template) {
            if !template.is_empty() {
                sink.send(template);
            }
            return Ok(());
        }

        let output = render_fragment(template, context, &mut state)?;
        for line in output.split('\n').filter(|line| !line.is_empty()) {
            sink.send(line);
        }
        Ok(())
    }

    /// Render with any serializable data as the context.
    pub fn render_serialize<T: Serialize + ?Sized>(
        &self,
        template: &str,
        data: &T,
        partials: Option<&dyn PartialSource>,
    ) -> Result<String, RenderError> {
        let context = Map::from_serialize(data)?;
        self.render(template, &context, partials)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render `template` with a default [`Renderer`].
pub fn render(
    template: &str,
    context: &Map,
    partials: Option<&dyn PartialSource>,
) -> Result<String, RenderError> {
    Renderer::new().render(template, context, partials)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ctx(pairs: &[(&str, Value)]) -> Map {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn tagless_template_is_verbatim() {
        let text = "line one\n\n  line three\n";
        assert_eq!(render(text, &Map::new(), None).unwrap(), text);
    }

    #[test]
    fn empty_lines_are_dropped_at_top_level() {
        let out = render("{{! note }}\nA\n\n{{x}}\nB", &Map::new(), None).unwrap();
        assert_eq!(out, "A\nB");
    }

    #[test]
    fn partial_lines_are_split_at_top_level() {
        let partials: HashMap<String, String> =
            [("p".to_string(), "x\n\ny".to_string())].into_iter().collect();
        let out = render("[{{>p}}]", &Map::new(), Some(&partials)).unwrap();
        assert_eq!(out, "[x\ny]");
    }

    #[test]
    fn state_does_not_leak_between_calls() {
        let renderer = Renderer::new();
        let c = ctx(&[("x", Value::from("1"))]);
        let first = renderer.render("{{=<% %>=}}<%x%>", &c, None).unwrap();
        assert_eq!(first, "1");
        let second = renderer.render("{{x}}<%x%>", &c, None).unwrap();
        assert_eq!(second, "1<%x%>");
    }

    #[test]
    fn custom_default_delimiters() {
        let options = RenderOptions {
            open_tag: "[[".to_string(),
            close_tag: "]]".to_string(),
            ..RenderOptions::default()
        };
        let renderer = Renderer::with_options(options).unwrap();
        let c = ctx(&[("who", Value::from("you"))]);
        assert_eq!(renderer.render("{{who}} [[who]]", &c, None).unwrap(), "{{who}} you");
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = RenderOptions {
            close_tag: String::new(),
            ..RenderOptions::default()
        };
        assert!(Renderer::with_options(options).is_err());
    }

    #[test]
    fn failed_render_sends_nothing() {
        let mut lines: Vec<String> = Vec::new();
        let mut sink = |line: &str| lines.push(line.to_owned());
        let result = Renderer::new().render_to("ok\n{{>missing}}", &Map::new(), None, &mut sink);
        assert!(matches!(result, Err(RenderError::UnknownPartial { .. })));
        assert!(lines.is_empty());
    }
}

//! Tokenizer and parse tree.
//!
//! A template is tokenized in a single pass under the delimiters active when
//! parsing starts. A delimiter-change tag switches the tokenizer's delimiters
//! for everything after it in the same text, including text after the
//! enclosing section closes. Partials, translation blocks and sections record
//! the pair active at their position, so text expanded there later is parsed
//! under that same pair whether or not the change was rendered.
//!
//! Sections are matched with a stack of open frames: a closing tag closes the
//! innermost open section of the same name, so a name repeated inside itself
//! nests correctly. Frames that never close (or are skipped over by an outer
//! close) degrade to literal text, keeping their already-parsed content.
//!
//! # Tag forms
//!
//! | form | node |
//! |------|------|
//! | `{{name}}` | [`Node::Variable`] (escaped) |
//! | `{{{name}}}` | [`Node::Variable`] (raw) |
//! | `{{! text }}` | [`Node::Comment`] |
//! | `{{=<% %>=}}` | [`Node::SetDelimiters`] |
//! | `{{%NAME key=value}}` | [`Node::Pragma`] |
//! | `{{>name}}` | [`Node::Partial`] |
//! | `{{#name}}…{{/name}}`, `{{^name}}…{{/name}}` | [`Node::Section`] |
//! | `{{_i}}…{{/i}}` | [`Node::Translate`] (fixed markers) |

use whisker_core::RenderOptions;

/// Opening marker of a translation block, independent of the delimiters.
pub const I18N_OPEN: &str = "{{_i}}";
/// Closing marker of a translation block.
pub const I18N_CLOSE: &str = "{{/i}}";

// ---------------------------------------------------------------------------
// Delimiters
// ---------------------------------------------------------------------------

/// An open/close tag marker pair. Both markers are matched as literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    open: String,
    close: String,
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn from_options(options: &RenderOptions) -> Self {
        Self::new(options.open_tag.as_str(), options.close_tag.as_str())
    }

    /// Parse the payload of a `{{=OPEN CLOSE=}}` tag: exactly two
    /// whitespace-separated markers.
    pub fn parse(payload: &str) -> Option<Self> {
        let mut parts = payload.split_whitespace();
        let open = parts.next()?;
        let close = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(open, close))
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

// ---------------------------------------------------------------------------
// Parse tree
// ---------------------------------------------------------------------------

/// Normal (`#`) or inverted (`^`) section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Normal,
    Inverted,
}

/// A matched section block.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub name: String,
    /// Unparsed body text, handed to section lambdas.
    pub source: String,
    /// Delimiters active where the body starts.
    pub delimiters: Delimiters,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Variable { name: String, escape: bool },
    Comment,
    SetDelimiters(Delimiters),
    Pragma {
        name: String,
        option: Option<(String, String)>,
    },
    Partial {
        name: String,
        delimiters: Delimiters,
    },
    Translate {
        content: String,
        delimiters: Delimiters,
    },
    Section(Section),
}

/// A parsed template: a sequence of nodes, sections holding their children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    /// Parse `src`, starting with `delimiters` active.
    pub fn parse(src: &str, delimiters: &Delimiters) -> Self {
        parse(src, delimiters)
    }

    /// Every pragma tag in the tree, in document order, including those
    /// inside section bodies.
    pub fn pragmas(&self) -> Vec<(&str, Option<(&str, &str)>)> {
        let mut out = Vec::new();
        collect_pragmas(&self.nodes, &mut out);
        out
    }
}

fn collect_pragmas<'t>(nodes: &'t [Node], out: &mut Vec<(&'t str, Option<(&'t str, &'t str)>)>) {
    for node in nodes {
        match node {
            Node::Pragma { name, option } => out.push((
                name.as_str(),
                option.as_ref().map(|(k, v)| (k.as_str(), v.as_str())),
            )),
            Node::Section(section) => collect_pragmas(&section.children, out),
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Tag<'a> {
    Variable(&'a str),
    Raw(&'a str),
    Comment,
    Delimiters(Delimiters),
    Pragma {
        name: &'a str,
        option: Option<(&'a str, &'a str)>,
    },
    Partial(&'a str),
    Open(SectionKind, &'a str),
    Close(&'a str),
}

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Translate(&'a str),
    Tag { tag: Tag<'a>, raw: &'a str, start: usize },
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    delims: Delimiters,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str, delims: Delimiters) -> Self {
        Self { src, pos: 0, delims }
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let src = self.src;
        let rest = &src[self.pos..];
        if rest.is_empty() {
            return None;
        }

        let tag_at = rest.find(self.delims.open());
        let i18n_at = rest.find(I18N_OPEN);
        let at = match (tag_at, i18n_at) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => {
                self.pos = src.len();
                return Some(Token::Text(rest));
            }
        };
        if at > 0 {
            self.pos += at;
            return Some(Token::Text(&rest[..at]));
        }

        let start = self.pos;
        if i18n_at == Some(0) {
            if let Some(token) = self.lex_translate(start) {
                return Some(token);
            }
        }
        if tag_at == Some(0) {
            if let Some((tag, end)) = self.lex_tag(start) {
                if let Tag::Delimiters(delims) = &tag {
                    tracing::debug!("delimiters changed to '{}' '{}'", delims.open(), delims.close());
                    self.delims = delims.clone();
                }
                self.pos = end;
                return Some(Token::Tag {
                    tag,
                    raw: &src[start..end],
                    start,
                });
            }
            // Not a tag: the opening marker is literal text.
            self.pos += self.delims.open().len();
        } else {
            self.pos += I18N_OPEN.len();
        }
        Some(Token::Text(&src[start..self.pos]))
    }

    fn lex_translate(&mut self, start: usize) -> Option<Token<'a>> {
        let src = self.src;
        let body = start + I18N_OPEN.len();
        let len = src[body..].find(I18N_CLOSE)?;
        self.pos = body + len + I18N_CLOSE.len();
        Some(Token::Translate(src[body..body + len].trim_start()))
    }

    /// Lex the tag opening at `start`. Returns the tag and the byte offset
    /// just past it, or `None` when the text there is not a well-formed tag.
    fn lex_tag(&self, start: usize) -> Option<(Tag<'a>, usize)> {
        let src = self.src;
        let close = self.delims.close();
        let inner = start + self.delims.open().len();
        let line_end = src[inner..].find('\n').map_or(src.len(), |i| inner + i);
        let line = &src[inner..line_end];
        let sigil = line.chars().next()?;

        // Body after a one-byte sigil, terminated by `terminator`.
        let sigil_body = |terminator: &str| -> Option<(&'a str, usize)> {
            let body = &src[inner + 1..line_end];
            let len = body.find(terminator)?;
            Some((&body[..len], inner + 1 + len + terminator.len()))
        };

        let tag = match sigil {
            '{' => {
                let triple = format!("}}{close}");
                let (body, end) = sigil_body(&triple).or_else(|| sigil_body(close))?;
                if !is_variable_name(body) {
                    return None;
                }
                (Tag::Raw(body.trim()), end)
            }
            '=' => {
                let (payload, end) = sigil_body(&format!("={close}"))?;
                (Tag::Delimiters(Delimiters::parse(payload)?), end)
            }
            '!' => {
                let (_, end) = sigil_body(close)?;
                (Tag::Comment, end)
            }
            '%' => {
                let (body, end) = sigil_body(close)?;
                (parse_pragma(body)?, end)
            }
            '>' => {
                let (body, end) = sigil_body(close)?;
                (Tag::Partial(non_blank(body)?), end)
            }
            '#' | '^' => {
                let kind = if sigil == '#' {
                    SectionKind::Normal
                } else {
                    SectionKind::Inverted
                };
                let (body, end) = sigil_body(close)?;
                (Tag::Open(kind, non_blank(body)?), end)
            }
            '/' => {
                let (body, end) = sigil_body(close)?;
                (Tag::Close(body.trim()), end)
            }
            _ => {
                let len = line.find(close)?;
                let body = &line[..len];
                if !is_variable_name(body) {
                    return None;
                }
                (Tag::Variable(body.trim()), inner + len + close.len())
            }
        };
        Some(tag)
    }

    /// Skip newlines directly after a section opening tag.
    fn skip_newlines(&mut self) -> &'a str {
        let rest = &self.src[self.pos..];
        let skipped = rest.len() - rest.trim_start_matches('\n').len();
        self.pos += skipped;
        &rest[..skipped]
    }

    /// Skip whitespace directly after a section closing tag.
    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }
}

fn is_variable_name(body: &str) -> bool {
    !body.is_empty() && !body.contains(['/', '#', '^'])
}

fn non_blank(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `NAME` or `NAME key=value`; the name allows word characters and hyphens.
fn parse_pragma(body: &str) -> Option<Tag<'_>> {
    let name_len = body
        .find(|c: char| !(is_word(c) || c == '-'))
        .unwrap_or(body.len());
    if name_len == 0 {
        return None;
    }
    let (name, rest) = body.split_at(name_len);
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    if rest.is_empty() {
        return Some(Tag::Pragma { name, option: None });
    }
    let (key, value) = rest.split_once('=')?;
    let is_token = |s: &str| !s.is_empty() && s.chars().all(is_word);
    if !is_token(key) || !is_token(value) {
        return None;
    }
    Some(Tag::Pragma {
        name,
        option: Some((key, value)),
    })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Frame<'a> {
    kind: SectionKind,
    name: &'a str,
    open_raw: &'a str,
    skipped: &'a str,
    body_start: usize,
    delimiters: Delimiters,
    nodes: Vec<Node>,
}

fn parse(src: &str, delimiters: &Delimiters) -> Template {
    let mut lexer = Lexer::new(src, delimiters.clone());
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Frame<'_>> = Vec::new();

    while let Some(token) = lexer.next_token() {
        let (tag, raw, start) = match token {
            Token::Text(text) => {
                push_text(current(&mut stack, &mut root), text);
                continue;
            }
            Token::Translate(content) => {
                let node = Node::Translate {
                    content: content.to_owned(),
                    delimiters: lexer.delims.clone(),
                };
                current(&mut stack, &mut root).push(node);
                continue;
            }
            Token::Tag { tag, raw, start } => (tag, raw, start),
        };

        let node = match tag {
            Tag::Open(kind, name) => {
                let skipped = lexer.skip_newlines();
                stack.push(Frame {
                    kind,
                    name,
                    open_raw: raw,
                    skipped,
                    body_start: lexer.pos,
                    delimiters: lexer.delims.clone(),
                    nodes: Vec::new(),
                });
                continue;
            }
            Tag::Close(name) => {
                let Some(depth) = stack.iter().rposition(|frame| frame.name == name) else {
                    tracing::trace!("stray closing tag '{}' kept as text", name);
                    push_text(current(&mut stack, &mut root), raw);
                    continue;
                };
                while stack.len() > depth + 1 {
                    if let Some(unclosed) = stack.pop() {
                        degrade(unclosed, current(&mut stack, &mut root));
                    }
                }
                let Some(frame) = stack.pop() else { continue };
                lexer.skip_whitespace();
                Node::Section(Section {
                    kind: frame.kind,
                    name: frame.name.to_owned(),
                    source: src[frame.body_start..start].to_owned(),
                    delimiters: frame.delimiters,
                    children: frame.nodes,
                })
            }
            Tag::Variable(name) => Node::Variable {
                name: name.to_owned(),
                escape: true,
            },
            Tag::Raw(name) => Node::Variable {
                name: name.to_owned(),
                escape: false,
            },
            Tag::Comment => Node::Comment,
            Tag::Delimiters(delims) => Node::SetDelimiters(delims),
            Tag::Pragma { name, option } => Node::Pragma {
                name: name.to_owned(),
                option: option.map(|(k, v)| (k.to_owned(), v.to_owned())),
            },
            Tag::Partial(name) => Node::Partial {
                name: name.to_owned(),
                delimiters: lexer.delims.clone(),
            },
        };
        current(&mut stack, &mut root).push(node);
    }

    while let Some(frame) = stack.pop() {
        degrade(frame, current(&mut stack, &mut root));
    }
    Template { nodes: root }
}

fn current<'s>(stack: &'s mut [Frame<'_>], root: &'s mut Vec<Node>) -> &'s mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => &mut frame.nodes,
        None => root,
    }
}

/// Splice an unmatched section back into its parent as literal text.
fn degrade(frame: Frame<'_>, parent: &mut Vec<Node>) {
    tracing::debug!("unterminated section '{}' left as literal text", frame.name);
    push_text(parent, frame.open_raw);
    push_text(parent, frame.skipped);
    for node in frame.nodes {
        match node {
            Node::Text(text) => push_text(parent, &text),
            other => parent.push(other),
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_owned()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(src: &str) -> Vec<Node> {
        Template::parse(src, &Delimiters::default()).nodes
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn var(name: &str) -> Node {
        Node::Variable {
            name: name.to_string(),
            escape: true,
        }
    }

    fn section(node: &Node) -> &Section {
        match node {
            Node::Section(s) => s,
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_one_node() {
        assert_eq!(parse_default("just text\nmore"), vec![text("just text\nmore")]);
    }

    #[test]
    fn variables_and_raw() {
        let nodes = parse_default("a {{ name }} b {{{html}}}");
        assert_eq!(
            nodes,
            vec![
                text("a "),
                var("name"),
                text(" b "),
                Node::Variable {
                    name: "html".to_string(),
                    escape: false
                },
            ]
        );
    }

    #[test]
    fn malformed_tags_stay_literal() {
        for src in ["{{}}", "{{a/b}}", "open {{ never closed", "{{split\n}}"] {
            let nodes = parse_default(src);
            assert_eq!(nodes, vec![text(src)], "source {src:?}");
        }
    }

    #[test]
    fn nested_sections_build_tree() {
        let nodes = parse_default("{{#outer}}x{{^inner}}y{{/inner}}{{/outer}}");
        assert_eq!(nodes.len(), 1);
        let outer = section(&nodes[0]);
        assert_eq!(outer.kind, SectionKind::Normal);
        assert_eq!(outer.source, "x{{^inner}}y{{/inner}}");
        let inner = section(&outer.children[1]);
        assert_eq!(inner.kind, SectionKind::Inverted);
        assert_eq!(inner.children, vec![text("y")]);
    }

    #[test]
    fn self_nested_name_matches_by_depth() {
        let nodes = parse_default("{{#a}}1{{#a}}2{{/a}}3{{/a}}4");
        assert_eq!(nodes.len(), 2);
        let outer = section(&nodes[0]);
        assert_eq!(outer.source, "1{{#a}}2{{/a}}3");
        let inner = section(&outer.children[1]);
        assert_eq!(inner.children, vec![text("2")]);
        assert_eq!(nodes[1], text("4"));
    }

    #[test]
    fn unterminated_section_degrades_to_text() {
        let nodes = parse_default("{{#open}}\nhi {{name}}");
        assert_eq!(nodes, vec![text("{{#open}}\nhi "), var("name")]);
    }

    #[test]
    fn mismatched_close_degrades_inner_frame() {
        let nodes = parse_default("{{#a}}{{#b}}x{{/a}}");
        let a = section(&nodes[0]);
        assert_eq!(a.children, vec![text("{{#b}}x")]);
    }

    #[test]
    fn stray_close_is_literal() {
        assert_eq!(parse_default("x{{/nope}}y"), vec![text("x{{/nope}}y")]);
    }

    #[test]
    fn section_whitespace_trimming() {
        let nodes = parse_default("{{#s}}\n\nbody\n{{/s}}\n  after");
        let s = section(&nodes[0]);
        assert_eq!(s.source, "body\n");
        assert_eq!(nodes[1], text("after"));
    }

    #[test]
    fn delimiter_change_applies_to_later_siblings() {
        let nodes = parse_default("{{#a}}{{=<% %>=}}<%x%>{{/a}}<%/a%><%#b%><%y%><%/b%>");
        let a = section(&nodes[0]);
        assert_eq!(
            a.children,
            vec![
                Node::SetDelimiters(Delimiters::new("<%", "%>")),
                var("x"),
                text("{{/a}}"),
            ]
        );
        let b = section(&nodes[1]);
        assert_eq!(b.children, vec![var("y")]);
    }

    #[test]
    fn delimiter_payload_must_have_two_markers() {
        assert_eq!(parse_default("{{=<%=}}"), vec![text("{{=<%=}}")]);
    }

    #[test]
    fn pragma_forms() {
        let template = Template::parse(
            "{{%IMPLICIT-ITERATOR iterator=bob}}{{#l}}{{%TRANSLATION-HINT}}{{/l}}{{%bad tag}}",
            &Delimiters::default(),
        );
        assert_eq!(
            template.pragmas(),
            vec![
                ("IMPLICIT-ITERATOR", Some(("iterator", "bob"))),
                ("TRANSLATION-HINT", None),
            ]
        );
        assert_eq!(template.nodes.last(), Some(&text("{{%bad tag}}")));
    }

    #[test]
    fn translate_block_ignores_custom_delimiters() {
        let nodes = Template::parse("<%x%> {{_i}}  Hello {{name}}{{/i}}", &Delimiters::new("<%", "%>")).nodes;
        assert_eq!(
            nodes,
            vec![
                var("x"),
                text(" "),
                Node::Translate {
                    content: "Hello {{name}}".to_string(),
                    delimiters: Delimiters::new("<%", "%>"),
                },
            ]
        );
    }

    #[test]
    fn partial_and_comment() {
        let nodes = parse_default("{{> header }}{{! ignore / # ^ }}");
        assert_eq!(
            nodes,
            vec![
                Node::Partial {
                    name: "header".to_string(),
                    delimiters: Delimiters::default(),
                },
                Node::Comment,
            ]
        );
    }

    #[test]
    fn inclusions_record_lexical_delimiters() {
        let nodes = parse_default("{{#no}}{{=<% %>=}}<%/no%><%>p%><%#s%>x<%/s%>");
        let no = section(&nodes[0]);
        assert_eq!(no.delimiters, Delimiters::default());
        let new_pair = Delimiters::new("<%", "%>");
        assert_eq!(
            nodes[1],
            Node::Partial {
                name: "p".to_string(),
                delimiters: new_pair.clone(),
            }
        );
        assert_eq!(section(&nodes[2]).delimiters, new_pair);
    }
}

//! # whisker-renderer
//!
//! Logic-less template renderer: variables, sections, partials, pragmas,
//! translation blocks and delimiter changes over a [`Map`] context.
//!
//! ## Usage
//!
//! ```rust
//! use whisker_renderer::{Map, Renderer};
//!
//! let mut context = Map::new();
//! context.insert("name", "World");
//!
//! let out = Renderer::new()
//!     .render("Hello, {{name}}!", &context, None)
//!     .unwrap();
//! assert_eq!(out, "Hello, World!");
//! ```

pub mod context;
pub mod engine;
pub mod escape;
pub mod i18n;
pub mod parser;
pub mod partial;
pub mod pragma;
mod section;
pub mod sink;

pub use engine::{render, Renderer};
pub use escape::escape_html;
pub use i18n::{Translator, MODE_KEY};
pub use parser::{Delimiters, Node, Section, SectionKind, Template};
pub use partial::PartialSource;
pub use pragma::{Pragma, PragmaRegistry};
pub use sink::{LineBuffer, OutputSink};

pub use whisker_core::{
    Lambda, Map, OptionsError, RenderError, RenderFn, RenderOptions, SectionLambda, TranslateError,
    Value,
};

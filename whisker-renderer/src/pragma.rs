//! Pragmas: opt-in extensions declared inside a template.
//!
//! `{{%NAME}}` or `{{%NAME key=value}}`. Activation is call-scoped: once a
//! pragma is seen anywhere in a render call it stays active for every later
//! fragment of that call (sections, partials, translated text).

use std::collections::BTreeMap;

use whisker_core::RenderError;

use crate::parser::Template;

/// The pragmas this renderer implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pragma {
    /// `IMPLICIT-ITERATOR [iterator=NAME]`: key a bare collection element is
    /// exposed under.
    ImplicitIterator,
    /// `TRANSLATION-HINT [mode=VALUE]`: mode passed to the translator.
    TranslationHint,
}

impl Pragma {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IMPLICIT-ITERATOR" => Some(Pragma::ImplicitIterator),
            "TRANSLATION-HINT" => Some(Pragma::TranslationHint),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pragma::ImplicitIterator => "IMPLICIT-ITERATOR",
            Pragma::TranslationHint => "TRANSLATION-HINT",
        }
    }
}

/// Active pragmas and their options for one render call.
#[derive(Debug, Clone, Default)]
pub struct PragmaRegistry {
    active: BTreeMap<Pragma, BTreeMap<String, String>>,
}

impl PragmaRegistry {
    /// Activate the pragma called `name`. Re-declaring a pragma replaces its
    /// options.
    pub fn activate(
        &mut self,
        name: &str,
        option: Option<(&str, &str)>,
    ) -> Result<Pragma, RenderError> {
        let pragma = Pragma::from_name(name).ok_or_else(|| RenderError::UnsupportedPragma {
            name: name.to_owned(),
        })?;
        let options = self.active.entry(pragma).or_default();
        options.clear();
        if let Some((key, value)) = option {
            options.insert(key.to_owned(), value.to_owned());
        }
        tracing::debug!("pragma {} active (option: {:?})", pragma.name(), option);
        Ok(pragma)
    }

    pub fn is_active(&self, pragma: Pragma) -> bool {
        self.active.contains_key(&pragma)
    }

    pub fn option(&self, pragma: Pragma, key: &str) -> Option<&str> {
        self.active.get(&pragma)?.get(key).map(String::as_str)
    }

    /// Iterator key set by `IMPLICIT-ITERATOR iterator=…`.
    pub fn iterator_key(&self) -> Option<&str> {
        self.option(Pragma::ImplicitIterator, "iterator")
    }

    /// Mode set by `TRANSLATION-HINT mode=…`.
    pub fn translation_mode(&self) -> Option<&str> {
        self.option(Pragma::TranslationHint, "mode")
    }
}

/// Activate every pragma tag in `template`, failing on the first unknown one.
pub(crate) fn activate_all(
    template: &Template,
    registry: &mut PragmaRegistry,
) -> Result<(), RenderError> {
    for (name, option) in template.pragmas() {
        registry.activate(name, option)?;
    }
    Ok(())
}

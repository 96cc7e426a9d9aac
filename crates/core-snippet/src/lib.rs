//! Snippet definitions and the template language.
//!
//! A [`SnippetDef`] pairs a trigger with a parsed [`Template`]. Templates are
//! parsed eagerly when the definition is created so syntax errors surface at
//! definition time; regex transformations are compiled later, when the
//! snippet is expanded.

pub mod error;
pub mod template;
pub mod transform;

pub use error::{Result, TemplateError};
pub use template::{CodeFragment, CodeLang, Node, Template};
pub use transform::{
    CaseDirective, CompiledTransform, ReplacePart, Replacement, TransformFlags, Transformation,
};

use tracing::debug;

bitflags::bitflags! {
    /// Per-definition option flags as written after the description.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SnippetOptions: u8 {
        const BEGINNING_OF_LINE = 1;
        const IN_WORD = 2;
        const WORD_BOUNDARY = 4;
        const REGEX = 8;
        const OVERWRITE = 16;
    }
}

impl SnippetOptions {
    /// Parse an option string such as `"bw!"`. Unknown letters are ignored.
    pub fn parse(flags: &str) -> Self {
        let mut out = SnippetOptions::empty();
        for c in flags.chars() {
            match c {
                'b' => out |= SnippetOptions::BEGINNING_OF_LINE,
                'i' => out |= SnippetOptions::IN_WORD,
                'w' => out |= SnippetOptions::WORD_BOUNDARY,
                'r' => out |= SnippetOptions::REGEX,
                '!' => out |= SnippetOptions::OVERWRITE,
                other => debug!(target: "snippet.parse", option = %other, "unknown_option_ignored"),
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetDef {
    pub trigger: String,
    pub description: String,
    pub options: SnippetOptions,
    pub priority: i64,
    pub filetype: String,
    pub template: Template,
}

impl SnippetDef {
    pub fn new(
        trigger: impl Into<String>,
        body: &str,
        description: impl Into<String>,
        options: SnippetOptions,
    ) -> Result<Self> {
        Ok(Self {
            trigger: trigger.into(),
            description: description.into(),
            options,
            priority: 0,
            filetype: "all".to_string(),
            template: Template::parse(body)?,
        })
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_filetype(mut self, filetype: impl Into<String>) -> Self {
        self.filetype = filetype.into();
        self
    }

    /// Label shown when several candidates compete for one trigger.
    pub fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.trigger
        } else {
            &self.description
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_letters() {
        let o = SnippetOptions::parse("bw!");
        assert!(o.contains(SnippetOptions::BEGINNING_OF_LINE));
        assert!(o.contains(SnippetOptions::WORD_BOUNDARY));
        assert!(o.contains(SnippetOptions::OVERWRITE));
        assert!(!o.contains(SnippetOptions::REGEX));
        assert_eq!(SnippetOptions::parse("xz"), SnippetOptions::empty());
    }

    #[test]
    fn definition_parses_body_eagerly() {
        let def = SnippetDef::new("hallo", "Hallo ${1:Welt}!", "", SnippetOptions::empty()).unwrap();
        assert_eq!(def.template.skeleton(), "Hallo Welt!");
        assert_eq!(def.label(), "hallo");
        assert_eq!(def.filetype, "all");
        assert!(SnippetDef::new("bad", "${1:x", "", SnippetOptions::empty()).is_err());
    }

    #[test]
    fn builder_setters() {
        let def = SnippetDef::new("t", "x", "desc", SnippetOptions::empty())
            .unwrap()
            .with_priority(-3)
            .with_filetype("rust");
        assert_eq!(def.priority, -3);
        assert_eq!(def.filetype, "rust");
        assert_eq!(def.label(), "desc");
    }
}

//! Preprocessing capabilities attached to a configuration
//!
//! A project may configure nothing, one preprocessor, or an ordered chain.
//! [`PreprocessorGroup`] hides that difference behind a single
//! [`PreprocessorGroup::apply`] so analysis code never branches on the shape.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Section of a component file handed to a preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Markup,
    Script,
    Style,
}

/// Text of one section plus the attributes of its opening tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionInput {
    pub content: String,
    pub attributes: BTreeMap<String, String>,
    pub filename: Option<PathBuf>,
}

impl SectionInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Language named by `lang`, or by the subtype of a `type` attribute
    /// (`text/typescript` -> `typescript`).
    pub fn lang(&self) -> Option<&str> {
        if let Some(lang) = self.attributes.get("lang") {
            return Some(lang.as_str());
        }
        self.attributes
            .get("type")
            .map(|t| t.rsplit('/').next().unwrap_or(t.as_str()))
    }

    fn with_content(&self, content: String) -> Self {
        Self {
            content,
            attributes: self.attributes.clone(),
            filename: self.filename.clone(),
        }
    }
}

/// Output of a preprocessing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    pub code: String,
    /// Source map as a JSON string, when the stage produced a separate one.
    pub map: Option<String>,
    /// Files the output depends on besides the component itself.
    pub dependencies: Vec<PathBuf>,
}

/// Hint of the language each section is written in when no attribute says so.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultLanguages {
    pub markup: Option<String>,
    pub script: Option<String>,
    pub style: Option<String>,
}

/// A markup/script/style transform.
///
/// Every hook is optional; returning `None` leaves the section untouched.
pub trait Preprocessor: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn default_languages(&self) -> Option<&DefaultLanguages> {
        None
    }

    fn markup(&self, _input: &SectionInput) -> Option<Processed> {
        None
    }

    fn script(&self, _input: &SectionInput) -> Option<Processed> {
        None
    }

    fn style(&self, _input: &SectionInput) -> Option<Processed> {
        None
    }
}

/// Preprocessing configured for a directory.
#[derive(Debug, Clone, Default)]
pub enum PreprocessorGroup {
    #[default]
    None,
    Single(Arc<dyn Preprocessor>),
    Sequence(Vec<Arc<dyn Preprocessor>>),
}

impl PreprocessorGroup {
    /// Collapse a list into the smallest matching shape.
    pub fn from_vec(mut preprocessors: Vec<Arc<dyn Preprocessor>>) -> Self {
        match preprocessors.len() {
            0 => Self::None,
            1 => Self::Single(preprocessors.remove(0)),
            _ => Self::Sequence(preprocessors),
        }
    }

    pub fn is_none(&self) -> bool {
        self.preprocessors().is_empty()
    }

    pub fn preprocessors(&self) -> &[Arc<dyn Preprocessor>] {
        match self {
            Self::None => &[],
            Self::Single(p) => std::slice::from_ref(p),
            Self::Sequence(ps) => ps,
        }
    }

    /// First default-language hint declared by any stage.
    pub fn default_languages(&self) -> Option<&DefaultLanguages> {
        self.preprocessors()
            .iter()
            .find_map(|p| p.default_languages())
    }

    /// Run every stage over `input` in order, each stage seeing the previous
    /// stage's output. Returns `None` when no stage touched the section.
    ///
    /// Source maps are not composed across stages: the latest stage that
    /// produced one wins.
    pub fn apply(&self, section: Section, input: &SectionInput) -> Option<Processed> {
        let mut current: Option<Processed> = None;

        for preprocessor in self.preprocessors() {
            let staged;
            let stage_input = match &current {
                Some(previous) => {
                    staged = input.with_content(previous.code.clone());
                    &staged
                }
                None => input,
            };

            let output = match section {
                Section::Markup => preprocessor.markup(stage_input),
                Section::Script => preprocessor.script(stage_input),
                Section::Style => preprocessor.style(stage_input),
            };

            if let Some(mut output) = output {
                if let Some(previous) = current.take() {
                    let mut dependencies = previous.dependencies;
                    dependencies.append(&mut output.dependencies);
                    output.dependencies = dependencies;
                    if output.map.is_none() {
                        output.map = previous.map;
                    }
                }
                current = Some(output);
            }
        }

        current
    }
}

fn default_true() -> bool {
    true
}

/// Options for the fallback preprocessor used when a project configures none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackOptions {
    /// Transform only; skip type-checking semantics.
    #[serde(default = "default_true")]
    pub transpile_only: bool,

    #[serde(default = "default_true")]
    pub source_map: bool,

    #[serde(default)]
    pub inline_source_map: bool,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            transpile_only: true,
            source_map: true,
            inline_source_map: false,
        }
    }
}

/// Built-in best-effort transform for scripts in a non-default language.
///
/// Script text is passed through unchanged with a line-identity source map so
/// downstream position mapping keeps working; markup and style are left alone.
#[derive(Debug, Clone)]
pub struct TranspileOnlyPreprocessor {
    name: String,
    options: FallbackOptions,
    default_languages: DefaultLanguages,
}

impl TranspileOnlyPreprocessor {
    pub fn new(options: FallbackOptions) -> Self {
        Self::named("transpile-only", options)
    }

    pub fn named(name: impl Into<String>, options: FallbackOptions) -> Self {
        Self {
            name: name.into(),
            options,
            default_languages: DefaultLanguages {
                markup: Some("html".to_string()),
                script: Some("javascript".to_string()),
                style: Some("css".to_string()),
            },
        }
    }

    pub fn options(&self) -> &FallbackOptions {
        &self.options
    }
}

fn is_javascript(lang: &str) -> bool {
    matches!(
        lang.to_ascii_lowercase().as_str(),
        "js" | "javascript" | "ecmascript" | "module"
    )
}

/// Version 3 source map mapping every line to the same line, column 0.
fn identity_source_map(code: &str, source: &str) -> String {
    let lines = code.split('\n').count();
    let mappings = (0..lines)
        .map(|line| if line == 0 { "AAAA" } else { "AACA" })
        .collect::<Vec<_>>()
        .join(";");

    serde_json::json!({
        "version": 3,
        "sources": [source],
        "names": [],
        "mappings": mappings,
    })
    .to_string()
}

impl Preprocessor for TranspileOnlyPreprocessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_languages(&self) -> Option<&DefaultLanguages> {
        Some(&self.default_languages)
    }

    fn script(&self, input: &SectionInput) -> Option<Processed> {
        let lang = input.lang()?;
        if is_javascript(lang) {
            return None;
        }

        let mut code = input.content.clone();
        let mut map = None;

        if self.options.source_map {
            let source = input
                .filename
                .as_ref()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input".to_string());
            let generated = identity_source_map(&input.content, &source);

            if self.options.inline_source_map {
                code.push_str("\n//# sourceMappingURL=data:application/json;charset=utf-8;base64,");
                code.push_str(&BASE64.encode(generated));
            } else {
                map = Some(generated);
            }
        }

        Some(Processed {
            code,
            map,
            dependencies: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Suffix(&'static str, &'static str);

    impl Preprocessor for Suffix {
        fn name(&self) -> &str {
            self.0
        }

        fn style(&self, input: &SectionInput) -> Option<Processed> {
            Some(Processed {
                code: format!("{}{}", input.content, self.1),
                map: None,
                dependencies: vec![PathBuf::from(self.0)],
            })
        }
    }

    #[test]
    fn test_from_vec_shapes() {
        assert!(PreprocessorGroup::from_vec(vec![]).is_none());

        let single = PreprocessorGroup::from_vec(vec![Arc::new(Suffix("a", "1"))]);
        assert!(matches!(single, PreprocessorGroup::Single(_)));

        let seq = PreprocessorGroup::from_vec(vec![
            Arc::new(Suffix("a", "1")),
            Arc::new(Suffix("b", "2")),
        ]);
        assert!(matches!(seq, PreprocessorGroup::Sequence(_)));
        assert_eq!(seq.preprocessors().len(), 2);
    }

    #[test]
    fn test_apply_chains_stages_in_order() {
        let group = PreprocessorGroup::Sequence(vec![
            Arc::new(Suffix("first", "-a")),
            Arc::new(Suffix("second", "-b")),
        ]);

        let out = group
            .apply(Section::Style, &SectionInput::new("body"))
            .unwrap();
        assert_eq!(out.code, "body-a-b");
        assert_eq!(
            out.dependencies,
            vec![PathBuf::from("first"), PathBuf::from("second")]
        );
    }

    #[test]
    fn test_apply_untouched_section_is_none() {
        let group = PreprocessorGroup::Single(Arc::new(Suffix("only", "!")));
        assert!(group
            .apply(Section::Markup, &SectionInput::new("<div/>"))
            .is_none());
        assert!(PreprocessorGroup::None
            .apply(Section::Style, &SectionInput::new("a{}"))
            .is_none());
    }

    #[test]
    fn test_lang_from_type_attribute() {
        let input = SectionInput::new("").with_attribute("type", "text/typescript");
        assert_eq!(input.lang(), Some("typescript"));

        let input = SectionInput::new("").with_attribute("lang", "ts");
        assert_eq!(input.lang(), Some("ts"));

        assert_eq!(SectionInput::new("").lang(), None);
    }

    #[test]
    fn test_transpile_only_skips_plain_javascript() {
        let pre = TranspileOnlyPreprocessor::new(FallbackOptions::default());
        assert!(pre.script(&SectionInput::new("let a = 1;")).is_none());
        assert!(pre
            .script(&SectionInput::new("let a = 1;").with_attribute("lang", "js"))
            .is_none());
        assert!(pre.style(&SectionInput::new("a{}")).is_none());
    }

    #[test]
    fn test_transpile_only_typescript_keeps_code_with_map() {
        let pre = TranspileOnlyPreprocessor::new(FallbackOptions::default());
        let input = SectionInput::new("let a: number = 1;\nexport { a };")
            .with_attribute("lang", "ts")
            .with_filename("App.svelte");

        let out = pre.script(&input).unwrap();
        assert_eq!(out.code, input.content);

        let map: serde_json::Value = serde_json::from_str(out.map.as_deref().unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], "App.svelte");
        assert_eq!(map["mappings"], "AAAA;AACA");
    }

    #[test]
    fn test_transpile_only_inline_map() {
        let pre = TranspileOnlyPreprocessor::new(FallbackOptions {
            inline_source_map: true,
            ..FallbackOptions::default()
        });
        let out = pre
            .script(&SectionInput::new("let a = 1").with_attribute("lang", "ts"))
            .unwrap();

        assert!(out.map.is_none());
        assert!(out
            .code
            .starts_with("let a = 1\n//# sourceMappingURL=data:application/json"));
    }

    #[test]
    fn test_transpile_only_without_source_map() {
        let pre = TranspileOnlyPreprocessor::new(FallbackOptions {
            source_map: false,
            ..FallbackOptions::default()
        });
        let out = pre
            .script(&SectionInput::new("let a = 1").with_attribute("lang", "ts"))
            .unwrap();
        assert_eq!(out.code, "let a = 1");
        assert!(out.map.is_none());
    }

    #[test]
    fn test_default_languages_hint() {
        let group = PreprocessorGroup::Sequence(vec![
            Arc::new(Suffix("plain", "")),
            Arc::new(TranspileOnlyPreprocessor::new(FallbackOptions::default())),
        ]);
        let hint = group.default_languages().unwrap();
        assert_eq!(hint.script.as_deref(), Some("javascript"));
        assert_eq!(hint.style.as_deref(), Some("css"));
    }

    #[test]
    fn test_fallback_options_serde_defaults() {
        let options: FallbackOptions = toml::from_str("").unwrap();
        assert_eq!(options, FallbackOptions::default());

        let options: FallbackOptions = toml::from_str("inline_source_map = true").unwrap();
        assert!(options.inline_source_map);
        assert!(options.transpile_only);
    }
}

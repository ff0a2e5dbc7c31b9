//! Fragment renderer: turn one search hit into localized plain text.
//!
//! The renderer owns a Handlebars registry holding a single template and the
//! fixed helper set from [`helpers::TemplateHelper`]. Output is not escaped.

pub mod helpers;

use std::path::Path;
use std::sync::Arc;

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::RenderError;
use crate::locale::LocaleBundle;
use crate::types::{LanguageTag, SearchHit};

pub use helpers::{
    LangVariant, MultiLangValue, Size, TemplateHelper, fit_size, pick_lang, slug,
};

/// Built-in fragment template.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/fragment.hbs");

const TEMPLATE_NAME: &str = "fragment";

/// Data handed to the template for each hit.
#[derive(Serialize)]
struct FragmentData<'a> {
    lang: &'a str,
    source: &'a SearchHit,
}

/// Renders search hits with a compiled template.
pub struct FragmentRenderer {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for FragmentRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentRenderer").finish_non_exhaustive()
    }
}

impl FragmentRenderer {
    /// Compile `template` and register the helper set.
    pub fn new(template: &str, bundle: Arc<LocaleBundle>) -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        helpers::register_all(&mut registry, bundle);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| RenderError::Template {
                message: e.to_string(),
            })?;
        Ok(Self { registry })
    }

    /// Renderer for the built-in template.
    pub fn with_default_template(bundle: Arc<LocaleBundle>) -> Result<Self, RenderError> {
        Self::new(DEFAULT_TEMPLATE, bundle)
    }

    /// Renderer for a template read from disk.
    pub fn from_file(path: &Path, bundle: Arc<LocaleBundle>) -> Result<Self, RenderError> {
        let template =
            std::fs::read_to_string(path).map_err(|source| RenderError::TemplateFile {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "loaded fragment template");
        Self::new(&template, bundle)
    }

    /// Render `hit` for readers of `lang`.
    pub fn render(&self, hit: &SearchHit, lang: &LanguageTag) -> Result<String, RenderError> {
        let data = FragmentData {
            lang: lang.as_str(),
            source: hit,
        };
        self.registry
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| RenderError::Evaluation {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaRef, MultiLangFragment, Person};

    fn tag(s: &str) -> LanguageTag {
        LanguageTag::parse(s).unwrap()
    }

    fn bundle() -> Arc<LocaleBundle> {
        let mut bundle = LocaleBundle::new(tag("en"));
        bundle
            .add_messages(
                tag("en"),
                "date = \"Date\"\nsignature = \"Signature\"\ntranslated = \"machine translated\"\nlanguages = \"Languages\"\nauthor = \"author\"\n",
            )
            .unwrap();
        bundle
            .add_messages(
                tag("de"),
                "date = \"Datum\"\nsignature = \"Signatur\"\ntranslated = \"maschinell übersetzt\"\nlanguages = \"Sprachen\"\nauthor = \"Autor\"\n",
            )
            .unwrap();
        Arc::new(bundle)
    }

    fn letter() -> SearchHit {
        SearchHit {
            id: "hit-1".into(),
            signature: "JP-1923-04".into(),
            title: vec![
                MultiLangFragment::original("de", "Brief an Piaget"),
                MultiLangFragment::translation("en", "Letter to Piaget"),
            ],
            description: vec![MultiLangFragment::original(
                "de",
                "Über die Entwicklung des Kindes & der Sprache",
            )],
            date: Some("1923-04-12".into()),
            languages: vec!["de".into(), "fr".into()],
            persons: vec![Person {
                name: "Jean Piaget".into(),
                role: Some("author".into()),
            }],
            tags: vec!["Entwicklungspsychologie".into(), "Gestalt & Form".into()],
            media: vec![MediaRef {
                name: "page 1".into(),
                kind: "image".into(),
                mimetype: "image/jpeg".into(),
                uri: "https://media.example.org/jp-1923-04/1.jpg".into(),
                width: 1600,
                height: 900,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_template_english() {
        let renderer = FragmentRenderer::with_default_template(bundle()).unwrap();
        let text = renderer.render(&letter(), &tag("en")).unwrap();
        assert!(text.contains("# Letter to Piaget (machine translated)"));
        assert!(text.contains("Signature: JP-1923-04"));
        assert!(text.contains("Date: 1923-04-12"));
        assert!(text.contains("Languages: German, French"));
        assert!(text.contains("- Jean Piaget (author)"));
        assert!(text.contains("#entwicklungspsychologie #gestalt_and_form"));
        assert!(text.contains("page 1 (800x450) https://media.example.org/jp-1923-04/1.jpg"));
        // No English description; the German one is not shown.
        assert!(!text.contains("Über die Entwicklung"));
    }

    #[test]
    fn test_default_template_german() {
        let renderer = FragmentRenderer::with_default_template(bundle()).unwrap();
        let text = renderer.render(&letter(), &tag("de")).unwrap();
        assert!(text.contains("# Brief an Piaget"));
        assert!(!text.contains("maschinell"));
        assert!(text.contains("Signatur: JP-1923-04"));
        assert!(text.contains("Sprachen: Deutsch, Französisch"));
        assert!(text.contains("- Jean Piaget (Autor)"));
        assert!(text.contains("#entwicklungspsychologie #gestalt_und_form"));
        assert!(text.contains("Über die Entwicklung des Kindes & der Sprache"));
    }

    #[test]
    fn test_title_falls_back_to_any_language() {
        let renderer = FragmentRenderer::with_default_template(bundle()).unwrap();
        let text = renderer.render(&letter(), &tag("fr")).unwrap();
        assert!(text.contains("# Brief an Piaget"));
    }

    #[test]
    fn test_minimal_hit_renders() {
        let renderer = FragmentRenderer::with_default_template(bundle()).unwrap();
        let hit = SearchHit {
            id: "bare".into(),
            ..Default::default()
        };
        assert!(renderer.render(&hit, &tag("en")).is_ok());
    }

    #[test]
    fn test_output_is_not_escaped() {
        let renderer = FragmentRenderer::new("{{source.signature}}", bundle()).unwrap();
        let hit = SearchHit {
            signature: "<A & B>".into(),
            ..Default::default()
        };
        assert_eq!(renderer.render(&hit, &tag("en")).unwrap(), "<A & B>");
    }

    #[test]
    fn test_custom_template_helpers() {
        let renderer = FragmentRenderer::new(
            "{{localize \"date\" lang}}|{{languageName \"it\" lang}}|{{slug source.signature lang}}|{{#with (fitSize 600 1200 800 800)}}{{width}}x{{height}}{{/with}}",
            bundle(),
        )
        .unwrap();
        let hit = SearchHit {
            signature: "Größe / Maß".into(),
            ..Default::default()
        };
        assert_eq!(
            renderer.render(&hit, &tag("de")).unwrap(),
            "Datum|Italienisch|groesse_mass|400x800"
        );
    }

    #[test]
    fn test_localize_missing_key_renders_key() {
        let renderer = FragmentRenderer::new("{{localize \"nowhere\" lang}}", bundle()).unwrap();
        let hit = SearchHit::default();
        assert_eq!(renderer.render(&hit, &tag("de")).unwrap(), "nowhere");
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let err = FragmentRenderer::new("{{#if source.id}}unclosed", bundle()).unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
    }

    #[test]
    fn test_unregistered_helper_fails_render() {
        let renderer = FragmentRenderer::new("{{shout source.id}}", bundle()).unwrap();
        let err = renderer.render(&letter(), &tag("en")).unwrap_err();
        assert!(matches!(err, RenderError::Evaluation { .. }));
    }

    #[test]
    fn test_helper_argument_error_fails_render() {
        let renderer = FragmentRenderer::new("{{fitSize 1}}", bundle()).unwrap();
        let err = renderer.render(&letter(), &tag("en")).unwrap_err();
        assert!(matches!(err, RenderError::Evaluation { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("short.hbs");
        std::fs::write(&path, "{{source.id}} in {{lang}}").unwrap();
        let renderer = FragmentRenderer::from_file(&path, bundle()).unwrap();
        assert_eq!(renderer.render(&letter(), &tag("it")).unwrap(), "hit-1 in it");

        let missing = FragmentRenderer::from_file(&dir.path().join("nope.hbs"), bundle());
        assert!(matches!(missing, Err(RenderError::TemplateFile { .. })));
    }
}

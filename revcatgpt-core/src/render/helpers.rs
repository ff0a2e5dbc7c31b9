//! The fixed set of functions available to the fragment template.

use std::collections::BTreeMap;
use std::sync::Arc;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderErrorReason, ScopedJson,
    handlebars_helper,
};
use serde::Serialize;
use serde_json::Value as Json;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::locale::{LocaleBundle, language_name};
use crate::types::{LanguageTag, MultiLangFragment};

/// Every helper the template engine exposes. Nothing else is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateHelper {
    /// `localize key lang`
    Localize,
    /// `languageName src target`
    LanguageName,
    /// `slug text lang`
    Slug,
    /// `fitSize width height maxWidth maxHeight`
    FitSize,
    /// `pickLang fragments`
    PickLang,
}

impl TemplateHelper {
    pub const ALL: [TemplateHelper; 5] = [
        TemplateHelper::Localize,
        TemplateHelper::LanguageName,
        TemplateHelper::Slug,
        TemplateHelper::FitSize,
        TemplateHelper::PickLang,
    ];

    /// Name under which the helper is called from the template.
    pub fn name(self) -> &'static str {
        match self {
            TemplateHelper::Localize => "localize",
            TemplateHelper::LanguageName => "languageName",
            TemplateHelper::Slug => "slug",
            TemplateHelper::FitSize => "fitSize",
            TemplateHelper::PickLang => "pickLang",
        }
    }
}

/// Register exactly [`TemplateHelper::ALL`] on `registry`.
pub(crate) fn register_all(registry: &mut Handlebars<'static>, bundle: Arc<LocaleBundle>) {
    for helper in TemplateHelper::ALL {
        let def: Box<dyn HelperDef + Send + Sync> = match helper {
            TemplateHelper::Localize => Box::new(LocalizeHelper {
                bundle: Arc::clone(&bundle),
            }),
            TemplateHelper::LanguageName => Box::new(language_name_helper),
            TemplateHelper::Slug => Box::new(slug_helper),
            TemplateHelper::FitSize => Box::new(fit_size_helper),
            TemplateHelper::PickLang => Box::new(pick_lang_helper),
        };
        registry.register_helper(helper.name(), def);
    }
}

// ---------------------------------------------------------------------------
// localize
// ---------------------------------------------------------------------------

struct LocalizeHelper {
    bundle: Arc<LocaleBundle>,
}

impl HelperDef for LocalizeHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, handlebars::RenderError> {
        let key = match h.param(0).map(|p| p.value()) {
            Some(Json::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => return Err(RenderErrorReason::ParamNotFoundForIndex("localize", 0).into()),
        };
        let lang = h
            .param(1)
            .and_then(|p| p.value().as_str())
            .unwrap_or_else(|| self.bundle.default_language().as_str());
        Ok(ScopedJson::Derived(Json::String(
            self.bundle.localize(&key, lang),
        )))
    }
}

// ---------------------------------------------------------------------------
// languageName / slug / fitSize / pickLang
// ---------------------------------------------------------------------------

handlebars_helper!(language_name_helper: |src: str, target: str| language_name(src, target));

handlebars_helper!(slug_helper: |text: str, lang: str| slug(text, lang));

handlebars_helper!(fit_size_helper: |width: i64, height: i64, max_width: i64, max_height: i64| {
    let size = fit_size(width, height, max_width, max_height);
    serde_json::json!({ "width": size.width, "height": size.height })
});

handlebars_helper!(pick_lang_helper: |fragments: Json| {
    serde_json::from_value::<Vec<MultiLangFragment>>(fragments.clone())
        .ok()
        .and_then(|f| pick_lang(&f))
        .and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Json::Null)
});

/// Language-specific replacements applied before transliteration.
fn language_substitutions(lang: &str) -> &'static [(char, &'static str)] {
    match lang.split(['-', '_']).next().unwrap_or(lang) {
        "de" => &[
            ('&', "und"),
            ('Ä', "Ae"),
            ('ä', "ae"),
            ('Ö', "Oe"),
            ('ö', "oe"),
            ('Ü', "Ue"),
            ('ü', "ue"),
            ('ß', "ss"),
        ],
        "en" => &[('&', "and")],
        "fr" => &[('&', "et")],
        "it" => &[('&', "e")],
        "es" => &[('&', "y")],
        "nl" => &[('&', "en")],
        _ => &[],
    }
}

/// Letters that do not decompose into ASCII plus combining marks.
fn transliterate(c: char) -> Option<&'static str> {
    Some(match c {
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ø' | 'Ø' => "o",
        'đ' | 'Đ' => "d",
        'ł' | 'Ł' => "l",
        'þ' | 'Þ' => "th",
        _ => return None,
    })
}

/// Lowercase ASCII slug of `text` with `_` between words.
pub fn slug(text: &str, lang: &str) -> String {
    let substitutions = language_substitutions(lang);
    let mut expanded = String::with_capacity(text.len());
    for c in text.chars() {
        match substitutions.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => expanded.push_str(to),
            None => match transliterate(c) {
                Some(to) => expanded.push_str(to),
                None => expanded.push(c),
            },
        }
    }

    let mut out = String::with_capacity(expanded.len());
    let mut separator_pending = false;
    for c in expanded.nfkd() {
        if is_combining_mark(c) || c == '\'' || c == '’' {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if separator_pending && !out.is_empty() {
                out.push('_');
            }
            separator_pending = false;
            out.push(c.to_ascii_lowercase());
        } else {
            separator_pending = true;
        }
    }
    out
}

/// A pixel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: i64,
    pub height: i64,
}

/// Scale `width`×`height` to fit `max_width`×`max_height`, keeping the
/// aspect ratio. The dimension that would overflow is pinned to its bound.
pub fn fit_size(width: i64, height: i64, max_width: i64, max_height: i64) -> Size {
    if width <= 0 || height <= 0 || max_width <= 0 || max_height <= 0 {
        return Size {
            width: 0,
            height: 0,
        };
    }
    let aspect = width as f64 / height as f64;
    let max_aspect = max_width as f64 / max_height as f64;
    if aspect > max_aspect {
        Size {
            width: max_width,
            height: (max_width as f64 / aspect) as i64,
        }
    } else {
        Size {
            width: (max_height as f64 * aspect) as i64,
            height: max_height,
        }
    }
}

/// One language variant of a [`MultiLangValue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LangVariant {
    pub value: String,
    pub translated: bool,
}

/// Language tag → variant.
pub type MultiLangValue = BTreeMap<String, LangVariant>;

/// Collect fragments into a per-language map. Later fragments for the same
/// language replace earlier ones; unparseable tags are filed under `en`.
pub fn pick_lang(fragments: &[MultiLangFragment]) -> Option<MultiLangValue> {
    if fragments.is_empty() {
        return None;
    }
    let mut value = MultiLangValue::new();
    for f in fragments {
        let lang = LanguageTag::parse(&f.lang).unwrap_or_else(|_| LanguageTag::english());
        value.insert(
            lang.to_string(),
            LangVariant {
                value: f.value.clone(),
                translated: f.translated,
            },
        );
    }
    Some(value)
}

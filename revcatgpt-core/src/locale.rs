//! Localization bundles and language display names.
//!
//! One message file per interface language, `active.<lang>.toml`, in the
//! go-i18n layout: either `key = "text"` or a `[key]` table whose `other`
//! (or `one`) field holds the text. Lookups fall back from the requested
//! language to the default language and finally to the key itself.

use std::collections::HashMap;
use std::path::Path;

use crate::error::LocaleError;
use crate::types::LanguageTag;

/// Translated messages for every available interface language.
#[derive(Debug, Clone)]
pub struct LocaleBundle {
    default: LanguageTag,
    languages: Vec<LanguageTag>,
    messages: HashMap<String, HashMap<String, String>>,
}

impl LocaleBundle {
    /// An empty bundle; every lookup returns the key.
    pub fn new(default: LanguageTag) -> Self {
        Self {
            default,
            languages: Vec::new(),
            messages: HashMap::new(),
        }
    }

    /// Load `active.<lang>.toml` for each language from `folder`.
    pub fn load(
        folder: &Path,
        default: LanguageTag,
        available: &[LanguageTag],
    ) -> Result<Self, LocaleError> {
        let mut bundle = Self::new(default);
        for lang in available {
            let path = folder.join(format!("active.{lang}.toml"));
            if !path.is_file() {
                return Err(LocaleError::MissingFile { path });
            }
            let content =
                std::fs::read_to_string(&path).map_err(|e| LocaleError::Malformed {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            let count = bundle
                .add_messages(lang.clone(), &content)
                .map_err(|message| LocaleError::Malformed {
                    path: path.clone(),
                    message,
                })?;
            tracing::debug!(language = %lang, messages = count, path = %path.display(), "loaded locale file");
        }
        Ok(bundle)
    }

    /// Parse a message file and register it for `lang`. Returns the number of
    /// messages added.
    pub fn add_messages(&mut self, lang: LanguageTag, toml_source: &str) -> Result<usize, String> {
        let table: toml::Table = toml::from_str(toml_source).map_err(|e| e.to_string())?;
        let mut parsed = HashMap::with_capacity(table.len());
        for (key, value) in table {
            let text = match value {
                toml::Value::String(s) => s,
                toml::Value::Table(t) => t
                    .get("other")
                    .or_else(|| t.get("one"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| format!("message '{key}' has no 'other' text"))?,
                _ => return Err(format!("message '{key}' is neither a string nor a table")),
            };
            parsed.insert(key, text);
        }
        let count = parsed.len();
        self.messages
            .entry(lang.as_str().to_string())
            .or_default()
            .extend(parsed);
        if !self.languages.contains(&lang) {
            self.languages.push(lang);
        }
        Ok(count)
    }

    /// Translate `key` into `lang`. Tries the exact tag, its primary
    /// language, the default language, and finally returns the key.
    pub fn localize(&self, key: &str, lang: &str) -> String {
        let primary = lang.split(['-', '_']).next().unwrap_or(lang);
        [lang, primary, self.default.as_str()]
            .into_iter()
            .find_map(|l| self.messages.get(l).and_then(|m| m.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    pub fn default_language(&self) -> &LanguageTag {
        &self.default
    }

    /// Languages with a loaded message file, in load order.
    pub fn languages(&self) -> &[LanguageTag] {
        &self.languages
    }
}

/// Display names of languages, per naming language.
const LANGUAGE_NAMES: &[(&str, &[(&str, &str)])] = &[
    (
        "de",
        &[
            ("de", "Deutsch"),
            ("en", "Englisch"),
            ("fr", "Französisch"),
            ("it", "Italienisch"),
            ("rm", "Rätoromanisch"),
            ("es", "Spanisch"),
            ("pt", "Portugiesisch"),
            ("nl", "Niederländisch"),
            ("la", "Latein"),
            ("el", "Griechisch"),
            ("ru", "Russisch"),
            ("pl", "Polnisch"),
            ("ja", "Japanisch"),
            ("zh", "Chinesisch"),
            ("ar", "Arabisch"),
        ],
    ),
    (
        "en",
        &[
            ("de", "German"),
            ("en", "English"),
            ("fr", "French"),
            ("it", "Italian"),
            ("rm", "Romansh"),
            ("es", "Spanish"),
            ("pt", "Portuguese"),
            ("nl", "Dutch"),
            ("la", "Latin"),
            ("el", "Greek"),
            ("ru", "Russian"),
            ("pl", "Polish"),
            ("ja", "Japanese"),
            ("zh", "Chinese"),
            ("ar", "Arabic"),
        ],
    ),
    (
        "fr",
        &[
            ("de", "allemand"),
            ("en", "anglais"),
            ("fr", "français"),
            ("it", "italien"),
            ("rm", "romanche"),
            ("es", "espagnol"),
            ("pt", "portugais"),
            ("nl", "néerlandais"),
            ("la", "latin"),
            ("el", "grec"),
            ("ru", "russe"),
            ("pl", "polonais"),
            ("ja", "japonais"),
            ("zh", "chinois"),
            ("ar", "arabe"),
        ],
    ),
    (
        "it",
        &[
            ("de", "tedesco"),
            ("en", "inglese"),
            ("fr", "francese"),
            ("it", "italiano"),
            ("rm", "romancio"),
            ("es", "spagnolo"),
            ("pt", "portoghese"),
            ("nl", "olandese"),
            ("la", "latino"),
            ("el", "greco"),
            ("ru", "russo"),
            ("pl", "polacco"),
            ("ja", "giapponese"),
            ("zh", "cinese"),
            ("ar", "arabo"),
        ],
    ),
];

/// Name of language `src` in language `target`, e.g. `("de", "fr")` gives
/// `"allemand"`. Returns `src` unchanged when `target` has no namer or the
/// source language is unknown to it.
pub fn language_name(src: &str, target: &str) -> String {
    let target = target.split(['-', '_']).next().unwrap_or(target).to_ascii_lowercase();
    let src_primary = src.split(['-', '_']).next().unwrap_or(src).to_ascii_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(namer, _)| *namer == target)
        .and_then(|(_, names)| names.iter().find(|(code, _)| *code == src_primary))
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| src.to_string())
}

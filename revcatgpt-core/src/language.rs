//! Query language detection.
//!
//! The detector is built once from the languages of the loaded locale
//! bundles, so a query is only ever attributed to a language the service can
//! render in. Detection itself is stateless.

use whatlang::{Detector, Lang};

use crate::types::LanguageTag;

/// ISO 639-1 codes for the languages the detector knows about.
const ISO_639_1: &[(Lang, &str)] = &[
    (Lang::Eng, "en"),
    (Lang::Deu, "de"),
    (Lang::Fra, "fr"),
    (Lang::Ita, "it"),
    (Lang::Spa, "es"),
    (Lang::Por, "pt"),
    (Lang::Nld, "nl"),
    (Lang::Dan, "da"),
    (Lang::Swe, "sv"),
    (Lang::Nob, "nb"),
    (Lang::Fin, "fi"),
    (Lang::Pol, "pl"),
    (Lang::Ces, "cs"),
    (Lang::Slk, "sk"),
    (Lang::Slv, "sl"),
    (Lang::Hrv, "hr"),
    (Lang::Hun, "hu"),
    (Lang::Ron, "ro"),
    (Lang::Lat, "la"),
    (Lang::Rus, "ru"),
    (Lang::Ukr, "uk"),
    (Lang::Ell, "el"),
    (Lang::Tur, "tr"),
    (Lang::Ara, "ar"),
    (Lang::Heb, "he"),
    (Lang::Jpn, "ja"),
    (Lang::Cmn, "zh"),
    (Lang::Kor, "ko"),
];

fn from_iso_639_1(code: &str) -> Option<Lang> {
    ISO_639_1
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(lang, _)| *lang)
}

fn to_iso_639_1(lang: Lang) -> Option<&'static str> {
    ISO_639_1
        .iter()
        .find(|(l, _)| *l == lang)
        .map(|(_, code)| *code)
}

/// Detects the language of a query among a fixed set of candidates.
pub struct LanguageDetector {
    detector: Detector,
    languages: Vec<Lang>,
}

impl std::fmt::Debug for LanguageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageDetector")
            .field("languages", &self.supported_codes())
            .finish()
    }
}

impl LanguageDetector {
    /// Build a detector restricted to the given languages. Tags the detector
    /// has no model for are skipped.
    pub fn new<'a>(tags: impl IntoIterator<Item = &'a LanguageTag>) -> Self {
        let mut languages = Vec::new();
        for tag in tags {
            match from_iso_639_1(tag.primary()) {
                Some(lang) if !languages.contains(&lang) => languages.push(lang),
                Some(_) => {}
                None => {
                    tracing::warn!(language = %tag, "no language model available, skipping");
                }
            }
        }
        Self {
            detector: Detector::with_allowlist(languages.clone()),
            languages,
        }
    }

    /// The ISO 639-1 code of the most probable language of `text`, or `None`
    /// if no candidate language could be detected reliably.
    pub fn detect(&self, text: &str) -> Option<&'static str> {
        if self.languages.is_empty() {
            return None;
        }
        let info = self.detector.detect(text)?;
        if !info.is_reliable() {
            tracing::debug!(
                language = ?info.lang(),
                confidence = info.confidence(),
                "language guess too uncertain, ignoring"
            );
            return None;
        }
        to_iso_639_1(info.lang())
    }

    /// Codes of the candidate languages, in registration order.
    pub fn supported_codes(&self) -> Vec<&'static str> {
        self.languages
            .iter()
            .filter_map(|l| to_iso_639_1(*l))
            .collect()
    }
}

use whatlang::{Detector, Lang};

/// Answer language. Malay and English are the only targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Malay,
    English,
}

impl Language {
    /// `ms` and `id` (a frequent detector label for Malay) map to Malay;
    /// everything else, including no detection, maps to English.
    pub fn from_detected(code: Option<&str>) -> Self {
        match code {
            Some("ms" | "id") => Language::Malay,
            _ => Language::English,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Language::Malay => "ms",
            Language::English => "en",
        }
    }

    /// Whether a detector label counts as this language.
    pub fn accepts(self, code: &str) -> bool {
        match self {
            Language::Malay => matches!(code, "ms" | "id"),
            Language::English => code == "en",
        }
    }
}

pub trait LanguageDetector: Send + Sync {
    /// Classify a question as one of the answer languages. Returns an ISO
    /// 639-1 code, `None` when undetermined.
    fn detect(&self, text: &str) -> Option<&'static str>;

    /// Identify the language of a generated reply across all languages the
    /// detector knows, so a reply in a third language is never mistaken for
    /// a target one.
    fn detect_reply(&self, text: &str) -> Option<&'static str> {
        self.detect(text)
    }
}

/// Trigram detector. Questions are scored against the English and
/// Indonesian profiles only, which keeps short Malay questions from drifting
/// to unrelated languages; replies are scored against every profile.
pub struct WhatlangDetector {
    detector: Detector,
}

impl WhatlangDetector {
    pub fn new() -> Self {
        Self {
            detector: Detector::with_allowlist(vec![Lang::Eng, Lang::Ind]),
        }
    }
}

impl Default for WhatlangDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<&'static str> {
        match self.detector.detect_lang(text)? {
            Lang::Eng => Some("en"),
            Lang::Ind => Some("id"),
            _ => None,
        }
    }

    fn detect_reply(&self, text: &str) -> Option<&'static str> {
        whatlang::detect_lang(text).map(reply_code)
    }
}

/// `en` and `id` for the profiles the answer languages map to; the ISO 639-3
/// code for anything else.
fn reply_code(lang: Lang) -> &'static str {
    match lang {
        Lang::Eng => "en",
        Lang::Ind => "id",
        other => other.code(),
    }
}

/// Detected language of `text`, defaulting to English on failure.
pub fn detect_language(detector: &dyn LanguageDetector, text: &str) -> Language {
    Language::from_detected(detector.detect(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indonesian_label_counts_as_malay() {
        assert_eq!(Language::from_detected(Some("id")), Language::Malay);
        assert_eq!(Language::from_detected(Some("ms")), Language::Malay);
        assert!(Language::Malay.accepts("id"));
        assert!(!Language::English.accepts("id"));
    }

    #[test]
    fn unknown_or_failed_detection_is_english() {
        assert_eq!(Language::from_detected(None), Language::English);
        assert_eq!(Language::from_detected(Some("fr")), Language::English);
    }

    #[test]
    fn whatlang_separates_malay_and_english_questions() {
        let detector = WhatlangDetector::new();
        assert_eq!(
            detect_language(&detector, "Siapa layak untuk .edu.my?"),
            Language::Malay
        );
        assert_eq!(
            detect_language(&detector, "Who can register .edu.my?"),
            Language::English
        );
    }

    #[test]
    fn reply_detection_reports_languages_outside_the_targets() {
        let detector = WhatlangDetector::new();
        let french = "Les établissements d'enseignement reconnus par le ministère \
                      peuvent enregistrer un nom de domaine, selon la politique officielle.";
        let reply = detector.detect_reply(french);
        assert_eq!(reply, Some("fra"));
        assert!(!Language::English.accepts(reply.unwrap()));
        assert!(!Language::Malay.accepts(reply.unwrap()));

        assert_eq!(detector.detect_reply("这些机构有资格注册域名，请向教育部提交申请。"), Some("cmn"));
    }

    #[test]
    fn text_without_letters_falls_back_to_english() {
        let detector = WhatlangDetector::new();
        assert_eq!(detect_language(&detector, "12345 ???"), Language::English);
    }
}

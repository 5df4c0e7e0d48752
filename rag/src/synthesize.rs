use std::sync::Arc;

use tracing::{debug, warn};

use crate::build_prompt::{compose, Message};
use crate::detect_lang::{Language, LanguageDetector};
use crate::error::Result;
use crate::generate::{ChatModel, ChatOptions};
use crate::retrieve_chunks::Hit;

/// Final reply for one question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub language: Language,
    /// Set when the first reply came back in the wrong language and was
    /// replaced by a translation.
    pub translated: bool,
}

pub struct Synthesizer {
    chat: Box<dyn ChatModel>,
    detector: Arc<dyn LanguageDetector>,
    options: ChatOptions,
}

impl Synthesizer {
    pub fn new(
        chat: Box<dyn ChatModel>,
        detector: Arc<dyn LanguageDetector>,
        options: ChatOptions,
    ) -> Self {
        Self {
            chat,
            detector,
            options,
        }
    }

    /// At most two generation calls: the answer, then one translation pass
    /// if the answer is not in the question's language.
    pub fn synthesize(&self, question: &str, contexts: &[Hit]) -> Result<Answer> {
        let composed = compose(self.detector.as_ref(), question, contexts);
        let reply = self.chat.chat(&composed.messages, &self.options)?;
        debug!(target_lang = composed.target_language(), chars = reply.len(), "generated reply");
        self.ensure_language(reply, composed.language)
    }

    fn ensure_language(&self, text: String, target: Language) -> Result<Answer> {
        // Failed detection on the reply counts as English, as for questions.
        let detected = self.detector.detect_reply(&text).unwrap_or("en");
        if target.accepts(detected) {
            return Ok(Answer {
                text,
                language: target,
                translated: false,
            });
        }

        warn!(target_lang = target.tag(), detected, "reply in wrong language, translating once");
        let messages = translation_messages(&text, target);
        let translated = self.chat.chat(&messages, &self.options)?;
        Ok(Answer {
            text: translated,
            language: target,
            translated: true,
        })
    }
}

fn translation_messages(text: &str, target: Language) -> [Message; 2] {
    match target {
        Language::Malay => [
            Message::system("You are a translator. Output Malay only."),
            Message::user(format!(
                "Terjemah jawapan berikut ke Bahasa Melayu yang ringkas dan tepat:\n\n{text}"
            )),
        ],
        Language::English => [
            Message::system("You are a translator. Output English only."),
            Message::user(format!("Translate to concise English:\n\n{text}")),
        ],
    }
}

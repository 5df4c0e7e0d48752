use serde::Serialize;

use crate::detect_lang::{detect_language, Language, LanguageDetector};
use crate::retrieve_chunks::Hit;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reply expected from the model when the context lacks the answer.
pub const REFUSAL_MS: &str = "Saya tidak pasti berdasarkan dokumen rujukan.";
pub const REFUSAL_EN: &str = "I\u{2019}m not sure based on the provided documents.";

const SYSTEM_MS: &str = "Anda pembantu yang hanya menjawab berdasarkan KONTEXT yang diberi. \
Jika maklumat tiada dalam konteks, jawab: 'Saya tidak pasti berdasarkan dokumen rujukan.' \
Jawab **DALAM BAHASA MELAYU SAHAJA**, ringkas (2\u{2013}4 ayat)";

const SYSTEM_EN: &str = "You are an assistant that ONLY answers using the provided CONTEXT. \
If the info is not in context, say: 'I\u{2019}m not sure based on the provided documents.' \
Answer **IN ENGLISH ONLY**, concise (2\u{2013}4 sentences)";

const SHOT_MS: (&str, &str) = (
    "Soalan: Siapa layak untuk .edu.my?",
    "Institusi pendidikan yang diiktiraf oleh KPM atau KPT layak memohon .edu.my.",
);

const SHOT_EN: (&str, &str) = (
    "Question: Who can register .edu.my?",
    "Educational institutions recognized by MOE or MOHE are eligible for .edu.my.",
);

/// Conversation for one question, locked to the question's language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedMessage {
    pub messages: Vec<Message>,
    pub language: Language,
}

impl ComposedMessage {
    pub fn target_language(&self) -> &'static str {
        self.language.tag()
    }
}

/// Build `[system, few-shot user, few-shot assistant, user]` for `question`.
pub fn compose(
    detector: &dyn LanguageDetector,
    question: &str,
    contexts: &[Hit],
) -> ComposedMessage {
    let language = detect_language(detector, question);
    let context = format_context_from_hits(contexts);

    let (system, shot, user) = match language {
        Language::Malay => (
            SYSTEM_MS,
            SHOT_MS,
            format!(
                "KONTEKS:\n{context}\nSOALAN:\n{question}\n\n\
                 Hanya guna KONTEKS. Jika tiada maklumat, nyatakan tidak pasti. Jawab ringkas."
            ),
        ),
        Language::English => (
            SYSTEM_EN,
            SHOT_EN,
            format!(
                "CONTEXT:\n{context}\nQUESTION:\n{question}\n\n\
                 Only use the CONTEXT. If missing, say you don\u{2019}t know. Keep it short."
            ),
        ),
    };

    ComposedMessage {
        messages: vec![
            Message::system(system),
            Message::user(shot.0),
            Message::assistant(shot.1),
            Message::user(user),
        ],
        language,
    }
}

/// `[i] Source: <path>\n<text>\n\n` per hit, numbered from 1 in retrieval order.
pub fn format_context_from_hits(hits: &[Hit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] Source: {}\n{}\n\n", i + 1, hit.path, hit.text))
        .collect()
}

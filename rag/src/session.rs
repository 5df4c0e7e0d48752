use crate::detect_lang::Language;

/// One answered question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub language: Language,
}

/// Per-conversation state owned by the caller. Past turns are never edited.
#[derive(Clone, Debug, Default)]
pub struct Session {
    history: Vec<Turn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub(crate) fn record(&mut self, turn: Turn) {
        self.history.push(turn);
    }
}

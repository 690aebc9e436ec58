//! crates/study_set_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! The serde shapes here are the exact shapes persisted by the store and
//! re-fetched by the play and study views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//=========================================================================================
// Study Set Kinds
//=========================================================================================

/// The two kinds of study set the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudySetKind {
    Flashcards,
    Quiz,
}

impl StudySetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StudySetKind::Flashcards => "flashcards",
            StudySetKind::Quiz => "quiz",
        }
    }
}

impl fmt::Display for StudySetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StudySetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flashcards" => Ok(StudySetKind::Flashcards),
            "quiz" => Ok(StudySetKind::Quiz),
            other => Err(format!("unknown study set kind '{}'", other)),
        }
    }
}

//=========================================================================================
// Extracted Records
//=========================================================================================

/// A single generated question.
///
/// Serialised untagged so that a flashcard is `{question, answer}` and a quiz
/// question is `{question, correct_answer, incorrect_answers}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionRecord {
    Quiz {
        question: String,
        correct_answer: String,
        incorrect_answers: Vec<String>,
    },
    Flashcard {
        question: String,
        answer: String,
    },
}

impl QuestionRecord {
    pub fn flashcard(question: impl Into<String>, answer: impl Into<String>) -> Self {
        QuestionRecord::Flashcard {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn quiz<I, S>(question: impl Into<String>, correct_answer: impl Into<String>, incorrect: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QuestionRecord::Quiz {
            question: question.into(),
            correct_answer: correct_answer.into(),
            incorrect_answers: incorrect.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            QuestionRecord::Flashcard { question, .. } | QuestionRecord::Quiz { question, .. } => question,
        }
    }

    /// The answer counted as correct, whichever variant this is.
    pub fn correct_answer(&self) -> &str {
        match self {
            QuestionRecord::Flashcard { answer, .. } => answer,
            QuestionRecord::Quiz { correct_answer, .. } => correct_answer,
        }
    }

    pub fn kind(&self) -> StudySetKind {
        match self {
            QuestionRecord::Flashcard { .. } => StudySetKind::Flashcards,
            QuestionRecord::Quiz { .. } => StudySetKind::Quiz,
        }
    }
    /// Names the first required field that is empty or whitespace.
    ///
    /// Individual wrong answers may be blank; they are skipped when options are built.
    pub fn blank_field(&self) -> Option<&'static str> {
        let required: [(&'static str, &str); 2] = match self {
            QuestionRecord::Flashcard { question, answer } => {
                [("question", question.as_str()), ("answer", answer.as_str())]
            }
            QuestionRecord::Quiz { question, correct_answer, .. } => {
                [("question", question.as_str()), ("correct_answer", correct_answer.as_str())]
            }
        };
        required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
    }
}

/// The `{title, description}` object the generator emits once per set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub title: String,
    pub description: String,
}

//=========================================================================================
// Study Sets
//=========================================================================================

/// A study set that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudySet {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: StudySetKind,
    pub questions: Vec<QuestionRecord>,
}

/// A stored study set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySet {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: StudySetKind,
    pub questions: Vec<QuestionRecord>,
    pub created_at: DateTime<Utc>,
}

/// Library listing entry; carries no questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySetSummary {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: StudySetKind,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&StudySet> for StudySetSummary {
    fn from(set: &StudySet) -> Self {
        Self {
            id: set.id,
            title: set.title.clone(),
            description: set.description.clone(),
            kind: set.kind,
            question_count: set.questions.len(),
            created_at: set.created_at,
        }
    }
}

//=========================================================================================
// Synthesized Questions
//=========================================================================================

/// One multiple-choice presentation of a question.
///
/// `options` is de-duplicated and holds `correct_answer` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedQuestion {
    pub prompt: String,
    pub correct_answer: String,
    pub options: Vec<String>,
}

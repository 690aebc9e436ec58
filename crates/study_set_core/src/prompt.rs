//! crates/study_set_core/src/prompt.rs
//!
//! Builds the generator prompt for a study-set request.
//!
//! The prompt asks for one JSON object per line so the stream can be consumed
//! incrementally: every question on its own line, then the `{title, description}`
//! object last.
//!
//! A second, much smaller prompt rewrites a single flashcard on request.

use crate::domain::{QuestionRecord, StudySetKind};
use crate::extractor::{classify_line, ExtractionEvent};
use serde::{Deserialize, Serialize};

pub const MIN_QUANTITY: u32 = 5;
pub const MAX_QUANTITY: u32 = 30;
pub const MIN_NOTES_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("Quantity must be between {} and {}, got {}", MIN_QUANTITY, MAX_QUANTITY, .0)]
    QuantityOutOfRange(u32),
    #[error("Difficulty must be between 1 and 5, got {0}")]
    DifficultyOutOfRange(u8),
    #[error("Notes must contain at least {} characters", MIN_NOTES_CHARS)]
    NotesTooShort,
    #[error("The {0} field must not be empty")]
    MissingField(&'static str),
    #[error("Only flashcards can be refined")]
    NotAFlashcard,
}

//=========================================================================================
// Generation Options
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomLevel {
    fn instruction(self) -> &'static str {
        match self {
            BloomLevel::Remember => "Focus on RECALL and RECOGNITION of facts, terms, basic concepts. Questions should test memorization (e.g., \"What is...\", \"Define...\", \"List...\").",
            BloomLevel::Understand => "Focus on COMPREHENSION and EXPLANATION. Questions should test understanding of meaning (e.g., \"Explain why...\", \"Describe how...\", \"Summarize...\").",
            BloomLevel::Apply => "Focus on APPLICATION of knowledge to new situations. Questions should require using concepts to solve problems (e.g., \"Calculate...\", \"Demonstrate...\").",
            BloomLevel::Analyze => "Focus on ANALYSIS and breaking down information. Questions should require identifying relationships, patterns, causes (e.g., \"Compare...\", \"What is the effect of...\").",
            BloomLevel::Evaluate => "Focus on EVALUATION and critical judgment. Questions should require making justified decisions (e.g., \"Critique...\", \"Which approach is best and why...\").",
            BloomLevel::Create => "Focus on CREATION and synthesis of new ideas. Questions should require designing, constructing, planning (e.g., \"Design a solution...\", \"Propose a new...\").",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningMode {
    FactRecall,
    Conceptual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasoningDepth {
    SingleStep,
    MultiStep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub bloom_level: BloomLevel,
    pub learning_mode: LearningMode,
    pub exam_prep: bool,
    pub reasoning_depth: ReasoningDepth,
    /// 1 (very easy) to 5 (very hard).
    pub difficulty: u8,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            bloom_level: BloomLevel::Understand,
            learning_mode: LearningMode::Conceptual,
            exam_prep: false,
            reasoning_depth: ReasoningDepth::SingleStep,
            difficulty: 3,
        }
    }
}

//=========================================================================================
// Generation Request
//=========================================================================================

/// Where the generated questions come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum GenerationSource {
    Topic {
        subject: String,
        topic: String,
        grade_level: String,
    },
    Notes {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "type")]
    pub kind: StudySetKind,
    #[serde(flatten)]
    pub source: GenerationSource,
    pub quantity: u32,
    #[serde(default)]
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn validate(&self) -> Result<(), PromptError> {
        if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&self.quantity) {
            return Err(PromptError::QuantityOutOfRange(self.quantity));
        }
        if !(1..=5).contains(&self.options.difficulty) {
            return Err(PromptError::DifficultyOutOfRange(self.options.difficulty));
        }
        match &self.source {
            GenerationSource::Topic { subject, topic, grade_level } => {
                for (name, value) in [("subject", subject), ("topic", topic), ("grade_level", grade_level)] {
                    if value.trim().is_empty() {
                        return Err(PromptError::MissingField(name));
                    }
                }
            }
            GenerationSource::Notes { text } => {
                if text.trim().chars().count() < MIN_NOTES_CHARS {
                    return Err(PromptError::NotesTooShort);
                }
            }
        }
        Ok(())
    }
}

//=========================================================================================
// Prompt Assembly
//=========================================================================================

/// Validates the request and renders the full generator prompt.
pub fn build_prompt(request: &GenerationRequest) -> Result<String, PromptError> {
    request.validate()?;

    let (noun, line_shape) = match request.kind {
        StudySetKind::Flashcards => ("flashcards", r#"{"question": "Question text", "answer": "Answer text"}"#),
        StudySetKind::Quiz => (
            "multiple choice quiz questions",
            r#"{"question": "Question text", "correct_answer": "Correct answer", "incorrect_answers": ["Wrong answer 1", "Wrong answer 2", "Wrong answer 3"]}"#,
        ),
    };

    let subject = match &request.source {
        GenerationSource::Topic { subject, topic, grade_level } => {
            format!("Generate {} {} about {} for {} level {}.", request.quantity, noun, topic, grade_level, subject)
        }
        GenerationSource::Notes { .. } => {
            format!("Based on the following notes, generate {} {}.", request.quantity, noun)
        }
    };

    let mut prompt = format!(
        "{subject}\n\n\
         OUTPUT FORMAT: Write exactly one JSON object per line and nothing else on that line.\n\
         First write each question as its own line in this exact format:\n{line_shape}\n\
         After the last question, write one final line in this exact format:\n\
         {{\"title\": \"Title based on the content\", \"description\": \"Brief description of what this set covers\"}}\n\
         Do not wrap the output in an array or a code block."
    );

    if let GenerationSource::Notes { text } = &request.source {
        prompt.push_str("\n\nNotes:\n");
        prompt.push_str(text.trim());
    }

    let constraints = constraints(&request.options);
    let numbered = constraints
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n");

    prompt.push_str("\n\nIMPORTANT GENERATION CONSTRAINTS:\n");
    prompt.push_str(&numbered);
    prompt.push_str(
        "\n\nThese constraints MUST materially affect the difficulty, style, and cognitive level of ALL generated questions.",
    );
    Ok(prompt)
}

fn constraints(options: &GenerationOptions) -> Vec<String> {
    let difficulty = match options.difficulty {
        1 => "VERY EASY - Basic recall and simple concepts. Questions should be straightforward and accessible to beginners.",
        2 => "EASY - Fundamental understanding with minimal challenge. Questions should be clear and direct.",
        3 => "MODERATE - Standard difficulty requiring solid understanding. Questions should balance accessibility and challenge.",
        4 => "HARD - Advanced material requiring deeper analysis. Questions should require careful thought.",
        _ => "VERY HARD - Expert-level complexity with intricate concepts. Questions should require mastery of the subject.",
    };

    let mut constraints = vec![
        format!("DIFFICULTY LEVEL ({}/5): {}", options.difficulty, difficulty),
        format!("BLOOM'S TAXONOMY LEVEL: {}", options.bloom_level.instruction()),
    ];

    constraints.push(match options.learning_mode {
        LearningMode::FactRecall => "LEARNING MODE: Fact Recall - Questions should test direct recall of specific information, dates, names, definitions, formulas.".to_string(),
        LearningMode::Conceptual => "LEARNING MODE: Conceptual Understanding - Questions should test WHY and HOW concepts work and how they relate.".to_string(),
    });

    if options.exam_prep {
        constraints.push(
            "EXAM PREP MODE: Make questions more rigorous and exam-style, with plausible distractors that reflect common misconceptions.".to_string(),
        );
    }

    constraints.push(match options.reasoning_depth {
        ReasoningDepth::SingleStep => "REASONING DEPTH: Single-step - Each question should require ONE logical step or concept.".to_string(),
        ReasoningDepth::MultiStep => "REASONING DEPTH: Multi-step - Questions should require chaining several logical steps or combining concepts.".to_string(),
    });

    constraints
}

//=========================================================================================
// Single-Card Refinement
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineAction {
    Harder,
    Simplify,
    Rephrase,
}

impl RefineAction {
    fn instruction(self) -> &'static str {
        match self {
            RefineAction::Harder => "Make this flashcard question harder while keeping the same topic.",
            RefineAction::Simplify => "Simplify this flashcard question to make it easier while keeping the same topic.",
            RefineAction::Rephrase => {
                "Rephrase this flashcard question using different words but maintaining the same difficulty and topic."
            }
        }
    }
}

/// Renders the prompt that asks for one replacement `{question, answer}` object.
pub fn build_refine_prompt(action: RefineAction, card: &QuestionRecord) -> Result<String, PromptError> {
    let QuestionRecord::Flashcard { question, answer } = card else {
        return Err(PromptError::NotAFlashcard);
    };
    if let Some(field) = card.blank_field() {
        return Err(PromptError::MissingField(field));
    }
    Ok(format!(
        "{} Original question: {:?} Original answer: {:?}. \
         Return ONLY a JSON object with this exact format: \
         {{\"question\": \"new question\", \"answer\": \"new answer\"}}",
        action.instruction(),
        question.trim(),
        answer.trim(),
    ))
}

/// Reads the replacement card out of a refinement response.
///
/// The object may be surrounded by prose or span several lines; everything
/// between the first `{` and the last `}` is tried when the whole text is not
/// a bare object.
pub fn parse_refined_card(response: &str) -> Option<QuestionRecord> {
    let trimmed = response.trim();
    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => return None,
    };
    match classify_line(candidate)? {
        ExtractionEvent::NewQuestion(card @ QuestionRecord::Flashcard { .. }) => Some(card),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_request(kind: StudySetKind) -> GenerationRequest {
        GenerationRequest {
            kind,
            source: GenerationSource::Topic {
                subject: "Science".into(),
                topic: "Photosynthesis".into(),
                grade_level: "High School (9-12)".into(),
            },
            quantity: 10,
            options: GenerationOptions::default(),
        }
    }

    #[test]
    fn topic_prompt_names_the_line_format_and_constraints() {
        let prompt = build_prompt(&topic_request(StudySetKind::Flashcards)).unwrap();
        assert!(prompt.starts_with("Generate 10 flashcards about Photosynthesis"));
        assert!(prompt.contains(r#"{"question": "Question text", "answer": "Answer text"}"#));
        assert!(prompt.contains("DIFFICULTY LEVEL (3/5)"));
        assert!(prompt.contains("4. REASONING DEPTH"));
        assert!(!prompt.contains("EXAM PREP"));
    }

    #[test]
    fn quiz_prompt_asks_for_incorrect_answers_and_exam_prep() {
        let mut request = topic_request(StudySetKind::Quiz);
        request.options.exam_prep = true;
        let prompt = build_prompt(&request).unwrap();
        assert!(prompt.contains("incorrect_answers"));
        assert!(prompt.contains("4. EXAM PREP MODE"));
        assert!(prompt.contains("5. REASONING DEPTH"));
    }

    #[test]
    fn notes_are_appended_to_the_prompt() {
        let notes = "Mitochondria produce ATP through cellular respiration in eukaryotic cells.";
        let request = GenerationRequest {
            kind: StudySetKind::Flashcards,
            source: GenerationSource::Notes { text: notes.into() },
            quantity: 5,
            options: GenerationOptions::default(),
        };
        let prompt = build_prompt(&request).unwrap();
        assert!(prompt.starts_with("Based on the following notes, generate 5 flashcards."));
        assert!(prompt.contains(notes));
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let mut request = topic_request(StudySetKind::Quiz);
        request.quantity = 31;
        assert_eq!(build_prompt(&request), Err(PromptError::QuantityOutOfRange(31)));

        let mut request = topic_request(StudySetKind::Quiz);
        request.options.difficulty = 0;
        assert_eq!(request.validate(), Err(PromptError::DifficultyOutOfRange(0)));

        let mut request = topic_request(StudySetKind::Quiz);
        request.source = GenerationSource::Topic {
            subject: "Math".into(),
            topic: "  ".into(),
            grade_level: "College/University".into(),
        };
        assert_eq!(request.validate(), Err(PromptError::MissingField("topic")));

        request.source = GenerationSource::Notes { text: "too short".into() };
        assert_eq!(request.validate(), Err(PromptError::NotesTooShort));
    }

    #[test]
    fn request_deserialises_from_client_json() {
        let request: GenerationRequest = serde_json::from_value(serde_json::json!({
            "type": "quiz",
            "source": "topic",
            "subject": "History",
            "topic": "World War II",
            "grade_level": "Middle School (6-8)",
            "quantity": 12,
            "options": {"bloom_level": "analyze", "learning_mode": "fact-recall"}
        }))
        .unwrap();
        assert_eq!(request.kind, StudySetKind::Quiz);
        assert_eq!(request.options.bloom_level, BloomLevel::Analyze);
        assert_eq!(request.options.learning_mode, LearningMode::FactRecall);
        assert_eq!(request.options.difficulty, 3);
    }

    #[test]
    fn refine_prompt_carries_the_action_and_the_card() {
        let card = QuestionRecord::flashcard("What is ATP?", "The cell's energy currency");
        let prompt = build_refine_prompt(RefineAction::Harder, &card).unwrap();
        assert!(prompt.starts_with("Make this flashcard question harder"));
        assert!(prompt.contains(r#"Original question: "What is ATP?""#));
        assert!(prompt.contains(r#"Original answer: "The cell's energy currency""#));
        assert!(prompt.ends_with(r#"{"question": "new question", "answer": "new answer"}"#));

        let prompt = build_refine_prompt(RefineAction::Rephrase, &card).unwrap();
        assert!(prompt.starts_with("Rephrase this flashcard question"));
    }

    #[test]
    fn refine_rejects_quiz_questions_and_blank_cards() {
        let quiz = QuestionRecord::quiz("Q", "c", ["a", "b", "d"]);
        assert_eq!(build_refine_prompt(RefineAction::Simplify, &quiz), Err(PromptError::NotAFlashcard));

        let blank = QuestionRecord::flashcard("Q", " ");
        assert_eq!(build_refine_prompt(RefineAction::Simplify, &blank), Err(PromptError::MissingField("answer")));
    }

    #[test]
    fn refined_card_is_found_inside_surrounding_text() {
        let bare = r#"{"question": "Q2", "answer": "A2"}"#;
        assert_eq!(parse_refined_card(bare), Some(QuestionRecord::flashcard("Q2", "A2")));

        let wrapped = "Here you go:\n{\n  \"question\": \"Q3\",\n  \"answer\": \"A3\"\n}\nGood luck!";
        assert_eq!(parse_refined_card(wrapped), Some(QuestionRecord::flashcard("Q3", "A3")));

        assert_eq!(parse_refined_card("no object here"), None);
        assert_eq!(parse_refined_card(r#"{"title": "T", "description": "D"}"#), None);
    }
}

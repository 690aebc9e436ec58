//! crates/study_set_core/src/play.rs
//!
//! The quiz play-through state machine.
//!
//! ```text
//! Presenting(i) --select*--> Presenting(i) --reveal--> Revealed(i)
//! Revealed(i)   --advance--> Presenting(i + 1) | Complete
//! any           --restart--> Presenting(0)
//! ```

use crate::domain::{QuestionRecord, SynthesizedQuestion};
use crate::synthesizer::{shuffle, synthesize_all};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use tracing::debug;

//=========================================================================================
// Phases, Tiers and Errors
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "index", rename_all = "snake_case")]
pub enum PlayPhase {
    Presenting(usize),
    Revealed(usize),
    Complete,
}

impl fmt::Display for PlayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayPhase::Presenting(i) => write!(f, "presenting question {}", i),
            PlayPhase::Revealed(i) => write!(f, "revealing question {}", i),
            PlayPhase::Complete => write!(f, "complete"),
        }
    }
}

/// Feedback band for a finished play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Mid,
    Low,
}

impl Tier {
    /// Bands the already-rounded percentage.
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            Tier::High
        } else if percentage >= 60 {
            Tier::Mid
        } else {
            Tier::Low
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Tier::High => "Excellent work! You really know this material!",
            Tier::Mid => "Good job! Keep studying to improve.",
            Tier::Low => "Keep practicing! You'll get there.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    #[error("Cannot {operation} while {phase}")]
    InvalidState {
        operation: &'static str,
        phase: PlayPhase,
    },
    #[error("No answer has been selected")]
    NoSelection,
    #[error("'{0}' is not one of the current options")]
    UnknownOption(String),
    #[error("A quiz needs at least one question")]
    EmptyQuestionSet,
}

//=========================================================================================
// Views
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub was_correct: bool,
    pub selected: String,
}

/// The current question as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    pub revealed: bool,
    pub was_correct: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub score: usize,
    pub answered_count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub tier: Tier,
}

impl CompletionSummary {
    pub fn new(score: usize, total: usize) -> Self {
        let percentage = rounded_percentage(score, total);
        Self {
            score,
            total,
            percentage,
            tier: Tier::from_percentage(percentage),
        }
    }
}

/// `round(100 * score / total)` with halves rounded up, in integer arithmetic.
pub fn rounded_percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * score + total) / (2 * total)) as u32
}

//=========================================================================================
// Quiz Play State
//=========================================================================================

/// One play-through over a fixed question set.
#[derive(Debug, Clone)]
pub struct QuizPlayState {
    source: Vec<QuestionRecord>,
    questions: Vec<SynthesizedQuestion>,
    phase: PlayPhase,
    selected_answer: Option<String>,
    score: usize,
    history: Vec<AnswerRecord>,
}

impl QuizPlayState {
    /// Starts a play-through with a fresh shuffle of questions and options.
    pub fn start<R: Rng + ?Sized>(source: Vec<QuestionRecord>, rng: &mut R) -> Result<Self, PlayError> {
        if source.is_empty() {
            return Err(PlayError::EmptyQuestionSet);
        }
        let questions = deal(&source, rng);
        Ok(Self {
            source,
            questions,
            phase: PlayPhase::Presenting(0),
            selected_answer: None,
            score: 0,
            history: Vec::new(),
        })
    }

    /// [`Self::start`] drawing from the thread-local entropy source.
    pub fn start_fresh(source: Vec<QuestionRecord>) -> Result<Self, PlayError> {
        Self::start(source, &mut rand::thread_rng())
    }

    /// Chooses an option; a later choice replaces an earlier one.
    pub fn select(&mut self, option: &str) -> Result<(), PlayError> {
        let index = self.presenting("select an answer")?;
        if !self.questions[index].options.iter().any(|o| o == option) {
            return Err(PlayError::UnknownOption(option.to_string()));
        }
        self.selected_answer = Some(option.to_string());
        Ok(())
    }

    /// Scores the current selection. Returns whether it was correct.
    pub fn reveal(&mut self) -> Result<bool, PlayError> {
        let index = self.presenting("reveal the answer")?;
        let selected = self
            .selected_answer
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(PlayError::NoSelection)?;

        let was_correct = selected == self.questions[index].correct_answer;
        if was_correct {
            self.score += 1;
        }
        debug!(index, was_correct, score = self.score, "Answer revealed");
        self.history.push(AnswerRecord { was_correct, selected });
        self.phase = PlayPhase::Revealed(index);
        Ok(was_correct)
    }

    /// Moves past a revealed question.
    pub fn advance(&mut self) -> Result<PlayPhase, PlayError> {
        let PlayPhase::Revealed(index) = self.phase else {
            return Err(PlayError::InvalidState {
                operation: "advance",
                phase: self.phase,
            });
        };

        self.phase = if index + 1 < self.questions.len() {
            self.selected_answer = None;
            PlayPhase::Presenting(index + 1)
        } else {
            PlayPhase::Complete
        };
        Ok(self.phase)
    }

    /// Starts over on the same questions with a new shuffle.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.questions = deal(&self.source, rng);
        self.phase = PlayPhase::Presenting(0);
        self.selected_answer = None;
        self.score = 0;
        self.history.clear();
    }

    pub fn restart_fresh(&mut self) {
        self.restart(&mut rand::thread_rng());
    }

    pub fn phase(&self) -> PlayPhase {
        self.phase
    }

    /// Index of the question on screen; `None` once complete.
    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            PlayPhase::Presenting(i) | PlayPhase::Revealed(i) => Some(i),
            PlayPhase::Complete => None,
        }
    }

    pub fn current(&self) -> Option<&SynthesizedQuestion> {
        self.current_index().map(|i| &self.questions[i])
    }

    pub fn view(&self) -> Option<QuestionView> {
        let question = self.current()?;
        let revealed = matches!(self.phase, PlayPhase::Revealed(_));
        Some(QuestionView {
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            revealed,
            was_correct: if revealed {
                self.history.last().map(|a| a.was_correct)
            } else {
                None
            },
        })
    }

    pub fn progress(&self) -> Progress {
        Progress {
            score: self.score,
            answered_count: self.history.len(),
            total: self.questions.len(),
        }
    }

    /// Available once the play-through is complete.
    pub fn summary(&self) -> Option<CompletionSummary> {
        (self.phase == PlayPhase::Complete).then(|| CompletionSummary::new(self.score, self.questions.len()))
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn history(&self) -> &[AnswerRecord] {
        &self.history
    }

    pub fn questions(&self) -> &[SynthesizedQuestion] {
        &self.questions
    }

    pub fn source(&self) -> &[QuestionRecord] {
        &self.source
    }

    fn presenting(&self, operation: &'static str) -> Result<usize, PlayError> {
        match self.phase {
            PlayPhase::Presenting(i) => Ok(i),
            phase => Err(PlayError::InvalidState { operation, phase }),
        }
    }
}

/// Shuffles question order, then synthesizes options for the shuffled order.
fn deal<R: Rng + ?Sized>(source: &[QuestionRecord], rng: &mut R) -> Vec<SynthesizedQuestion> {
    let mut ordered = source.to_vec();
    shuffle(&mut ordered, rng);
    synthesize_all(&ordered, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiz_set() -> Vec<QuestionRecord> {
        vec![
            QuestionRecord::quiz("Q1", "C1", ["W1a", "W1b", "W1c"]),
            QuestionRecord::quiz("Q2", "C2", ["W2a", "W2b", "W2c"]),
            QuestionRecord::quiz("Q3", "C3", ["W3a", "W3b", "W3c"]),
        ]
    }

    fn started() -> (QuizPlayState, StdRng) {
        let mut rng = StdRng::seed_from_u64(11);
        let play = QuizPlayState::start(quiz_set(), &mut rng).unwrap();
        (play, rng)
    }

    fn correct(play: &QuizPlayState) -> String {
        play.current().unwrap().correct_answer.clone()
    }

    fn wrong(play: &QuizPlayState) -> String {
        let question = play.current().unwrap();
        question
            .options
            .iter()
            .find(|o| **o != question.correct_answer)
            .cloned()
            .unwrap()
    }

    #[test]
    fn correct_reveal_scores_one_and_records_history() {
        let (mut play, _) = started();
        let answer = correct(&play);
        play.select(&answer).unwrap();
        assert_eq!(play.score(), 0);
        assert_eq!(play.reveal(), Ok(true));
        assert_eq!(play.score(), 1);
        assert_eq!(play.history(), &[AnswerRecord { was_correct: true, selected: answer }]);
        assert_eq!(play.phase(), PlayPhase::Revealed(0));
    }

    #[test]
    fn last_selection_wins() {
        let (mut play, _) = started();
        let right = correct(&play);
        let wrong = wrong(&play);
        play.select(&right).unwrap();
        play.select(&wrong).unwrap();
        assert_eq!(play.reveal(), Ok(false));
        assert_eq!(play.score(), 0);
        assert_eq!(play.history()[0].selected, wrong);
    }

    #[test]
    fn reveal_without_selection_fails() {
        let (mut play, _) = started();
        assert_eq!(play.reveal(), Err(PlayError::NoSelection));
        assert_eq!(play.phase(), PlayPhase::Presenting(0));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let (mut play, _) = started();
        assert_eq!(play.select("nope"), Err(PlayError::UnknownOption("nope".into())));
        assert_eq!(play.selected_answer(), None);
    }

    #[test]
    fn operations_outside_their_phase_fail() {
        let (mut play, _) = started();
        assert!(matches!(play.advance(), Err(PlayError::InvalidState { operation: "advance", .. })));

        let answer = correct(&play);
        play.select(&answer).unwrap();
        play.reveal().unwrap();
        assert!(matches!(play.select(&answer), Err(PlayError::InvalidState { .. })));
        assert!(matches!(play.reveal(), Err(PlayError::InvalidState { .. })));
    }

    #[test]
    fn advance_clears_the_selection() {
        let (mut play, _) = started();
        let answer = correct(&play);
        play.select(&answer).unwrap();
        play.reveal().unwrap();
        assert_eq!(play.advance(), Ok(PlayPhase::Presenting(1)));
        assert_eq!(play.selected_answer(), None);
        assert_eq!(play.view().unwrap().was_correct, None);
    }

    #[test]
    fn three_question_run_with_one_miss_lands_in_mid_tier() {
        let (mut play, _) = started();
        for round in 0..3 {
            let choice = if round == 1 { wrong(&play) } else { correct(&play) };
            play.select(&choice).unwrap();
            play.reveal().unwrap();
            let view = play.view().unwrap();
            assert!(view.revealed);
            assert_eq!(view.was_correct, Some(round != 1));
            play.advance().unwrap();
        }

        assert_eq!(play.phase(), PlayPhase::Complete);
        assert!(play.view().is_none());
        assert_eq!(
            play.summary(),
            Some(CompletionSummary { score: 2, total: 3, percentage: 67, tier: Tier::Mid })
        );
        assert!(matches!(play.advance(), Err(PlayError::InvalidState { phase: PlayPhase::Complete, .. })));
    }

    #[test]
    fn restart_resets_progress_and_keeps_the_questions() {
        let (mut play, mut rng) = started();
        let answer = correct(&play);
        play.select(&answer).unwrap();
        play.reveal().unwrap();
        play.advance().unwrap();

        play.restart(&mut rng);
        assert_eq!(play.phase(), PlayPhase::Presenting(0));
        assert_eq!(play.score(), 0);
        assert!(play.history().is_empty());
        assert_eq!(play.selected_answer(), None);
        assert_eq!(play.source(), quiz_set().as_slice());

        let mut prompts: Vec<&str> = play.questions().iter().map(|q| q.prompt.as_str()).collect();
        prompts.sort_unstable();
        assert_eq!(prompts, ["Q1", "Q2", "Q3"]);
        for question in play.questions() {
            let expected = quiz_set()
                .into_iter()
                .find(|q| q.prompt() == question.prompt)
                .unwrap();
            assert_eq!(question.correct_answer, expected.correct_answer());
        }
    }

    #[test]
    fn restart_is_legal_once_complete() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut play = QuizPlayState::start(vec![QuestionRecord::flashcard("Q", "A")], &mut rng).unwrap();
        play.select("A").unwrap();
        play.reveal().unwrap();
        assert_eq!(play.advance(), Ok(PlayPhase::Complete));
        assert_eq!(play.summary().map(|s| s.tier), Some(Tier::High));

        play.restart(&mut rng);
        assert_eq!(play.progress(), Progress { score: 0, answered_count: 0, total: 1 });
    }

    #[test]
    fn empty_question_set_cannot_be_played() {
        assert_eq!(QuizPlayState::start_fresh(Vec::new()).err(), Some(PlayError::EmptyQuestionSet));
    }

    #[test]
    fn tiers_compare_against_the_rounded_percentage() {
        assert_eq!(rounded_percentage(199, 250), 80);
        assert_eq!(CompletionSummary::new(199, 250).tier, Tier::High);
        assert_eq!(rounded_percentage(2, 3), 67);
        assert_eq!(rounded_percentage(1, 2), 50);
        assert_eq!(rounded_percentage(1, 8), 13);
        assert_eq!(Tier::from_percentage(60), Tier::Mid);
        assert_eq!(Tier::from_percentage(59), Tier::Low);
        assert_eq!(CompletionSummary::new(0, 4).percentage, 0);
    }
}

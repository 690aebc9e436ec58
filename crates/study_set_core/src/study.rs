//! crates/study_set_core/src/study.rs
//!
//! Flip-card study mode over a flashcard set.

use crate::domain::QuestionRecord;
use serde::Serialize;

/// The face of the card currently shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView<'a> {
    pub question: &'a str,
    pub answer: &'a str,
    pub flipped: bool,
    pub position: usize,
    pub total: usize,
}

/// Walks a set card by card. Navigation stops at either end and always shows
/// the question side of the new card.
#[derive(Debug, Clone)]
pub struct StudyDeck {
    cards: Vec<QuestionRecord>,
    index: usize,
    flipped: bool,
}

impl StudyDeck {
    /// Returns `None` for an empty set.
    pub fn new(cards: Vec<QuestionRecord>) -> Option<Self> {
        (!cards.is_empty()).then_some(Self {
            cards,
            index: 0,
            flipped: false,
        })
    }

    pub fn current(&self) -> CardView<'_> {
        let card = &self.cards[self.index];
        CardView {
            question: card.prompt(),
            answer: card.correct_answer(),
            flipped: self.flipped,
            position: self.index + 1,
            total: self.cards.len(),
        }
    }

    pub fn flip(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }

    /// Returns false when already on the last card.
    pub fn next(&mut self) -> bool {
        if self.index + 1 >= self.cards.len() {
            return false;
        }
        self.index += 1;
        self.flipped = false;
        true
    }

    /// Returns false when already on the first card.
    pub fn previous(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.flipped = false;
        true
    }

    /// Jumps to a one-based position, showing the question side.
    /// Returns false and stays put when the position is outside the deck.
    pub fn seek(&mut self, position: usize) -> bool {
        if position == 0 || position > self.cards.len() {
            return false;
        }
        self.index = position - 1;
        self.flipped = false;
        true
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.cards.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    /// One-based position and total.
    pub fn position(&self) -> (usize, usize) {
        (self.index + 1, self.cards.len())
    }
}

//! crates/study_set_core/src/synthesizer.rs
//!
//! Builds shuffled multiple-choice presentations from generated questions.
//!
//! Quiz questions use their authored distractors. Flashcards borrow the
//! answers of sibling cards and are padded with `"Option {n}"` placeholders
//! when a set is too small to supply three distinct distractors.
//!
//! All randomness comes from the `Rng` passed in, so callers decide between a
//! fresh entropy source and a seeded one.

use crate::domain::{QuestionRecord, SynthesizedQuestion};
use rand::Rng;
use std::collections::HashSet;

/// Distractors per flashcard in borrowed mode.
pub const BORROWED_DISTRACTORS: usize = 3;

/// Uniform in-place Fisher-Yates (Durstenfeld) shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Synthesizes every question of a set, keeping the set's order.
pub fn synthesize_all<R: Rng + ?Sized>(questions: &[QuestionRecord], rng: &mut R) -> Vec<SynthesizedQuestion> {
    (0..questions.len())
        .map(|index| synthesize_one(questions, index, rng))
        .collect()
}

/// Synthesizes question `index`; flashcards draw distractors from the rest of `questions`.
///
/// # Panics
///
/// Panics if `index` is out of bounds.
pub fn synthesize_one<R: Rng + ?Sized>(
    questions: &[QuestionRecord],
    index: usize,
    rng: &mut R,
) -> SynthesizedQuestion {
    let record = &questions[index];
    let distractors = match record {
        QuestionRecord::Quiz { incorrect_answers, .. } => incorrect_answers.clone(),
        QuestionRecord::Flashcard { .. } => borrowed_distractors(questions, index, rng),
    };

    let correct_answer = record.correct_answer().to_string();
    let mut options = unique_options(&correct_answer, distractors);
    shuffle(&mut options, rng);

    SynthesizedQuestion {
        prompt: record.prompt().to_string(),
        correct_answer,
        options,
    }
}

/// Up to three sibling answers, padded with placeholders to exactly three.
fn borrowed_distractors<R: Rng + ?Sized>(questions: &[QuestionRecord], index: usize, rng: &mut R) -> Vec<String> {
    let correct = questions[index].correct_answer();
    let mut seen = HashSet::new();
    let mut candidates: Vec<&str> = questions
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, q)| q.correct_answer())
        .filter(|answer| *answer != correct && !answer.trim().is_empty())
        .filter(|answer| seen.insert(*answer))
        .collect();

    shuffle(&mut candidates, rng);
    candidates.truncate(BORROWED_DISTRACTORS);

    let mut distractors: Vec<String> = candidates.into_iter().map(str::to_owned).collect();
    let mut n = distractors.len() + 2;
    while distractors.len() < BORROWED_DISTRACTORS {
        let placeholder = format!("Option {}", n);
        n += 1;
        if placeholder != correct && !distractors.contains(&placeholder) {
            distractors.push(placeholder);
        }
    }
    distractors
}

/// The correct answer first, then each distinct non-blank distractor once.
fn unique_options(correct: &str, distractors: Vec<String>) -> Vec<String> {
    let mut options = vec![correct.to_string()];
    for distractor in distractors {
        if !distractor.trim().is_empty() && !options.contains(&distractor) {
            options.push(distractor);
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn as_set(options: &[String]) -> HashSet<&str> {
        options.iter().map(String::as_str).collect()
    }

    fn cards(n: usize) -> Vec<QuestionRecord> {
        (1..=n)
            .map(|i| QuestionRecord::flashcard(format!("Q{i}"), format!("A{i}")))
            .collect()
    }

    #[test]
    fn authored_options_are_correct_answer_plus_distractors() {
        let questions = vec![QuestionRecord::quiz("Q", "right", ["w1", "w2", "w3"])];
        let mut rng = rng();
        for _ in 0..20 {
            let synthesized = synthesize_one(&questions, 0, &mut rng);
            assert_eq!(synthesized.options.len(), 4);
            assert_eq!(as_set(&synthesized.options), HashSet::from(["right", "w1", "w2", "w3"]));
            assert_eq!(synthesized.options.iter().filter(|o| *o == "right").count(), 1);
            assert_eq!(synthesized.prompt, "Q");
        }
    }

    #[test]
    fn authored_options_keep_whatever_distractor_count_was_generated() {
        let questions = vec![QuestionRecord::quiz("Q", "c", ["x", "y"])];
        let synthesized = synthesize_one(&questions, 0, &mut rng());
        assert_eq!(synthesized.options.len(), 3);
    }

    #[test]
    fn authored_duplicates_are_collapsed() {
        let questions = vec![QuestionRecord::quiz("Q", "c", ["c", "x", "x", " "])];
        let synthesized = synthesize_one(&questions, 0, &mut rng());
        assert_eq!(as_set(&synthesized.options), HashSet::from(["c", "x"]));
        assert_eq!(synthesized.options.len(), 2);
    }

    #[test]
    fn borrowed_distractors_come_from_sibling_answers() {
        let questions = cards(6);
        let mut rng = rng();
        for synthesized in synthesize_all(&questions, &mut rng) {
            assert_eq!(synthesized.options.len(), 4);
            assert!(synthesized.options.contains(&synthesized.correct_answer));
            assert_eq!(as_set(&synthesized.options).len(), 4);
            for option in &synthesized.options {
                assert!(option.starts_with('A'), "unexpected option {option}");
            }
        }
    }

    #[test]
    fn two_card_set_is_padded_with_option_three_and_four() {
        let questions = cards(2);
        let synthesized = synthesize_all(&questions, &mut rng());
        assert_eq!(synthesized[0].prompt, "Q1");
        assert_eq!(as_set(&synthesized[0].options), HashSet::from(["A1", "A2", "Option 3", "Option 4"]));
        assert_eq!(as_set(&synthesized[1].options), HashSet::from(["A2", "A1", "Option 3", "Option 4"]));
    }

    #[test]
    fn single_card_is_padded_from_option_two() {
        let synthesized = synthesize_all(&cards(1), &mut rng());
        assert_eq!(
            as_set(&synthesized[0].options),
            HashSet::from(["A1", "Option 2", "Option 3", "Option 4"])
        );
    }

    #[test]
    fn repeated_sibling_answers_count_once() {
        let questions = vec![
            QuestionRecord::flashcard("Q1", "same"),
            QuestionRecord::flashcard("Q2", "same"),
            QuestionRecord::flashcard("Q3", "other"),
            QuestionRecord::flashcard("Q4", "other"),
        ];
        let synthesized = synthesize_one(&questions, 0, &mut rng());
        assert_eq!(as_set(&synthesized.options), HashSet::from(["same", "other", "Option 3", "Option 4"]));
    }

    #[test]
    fn placeholder_never_collides_with_a_real_answer() {
        let questions = vec![
            QuestionRecord::flashcard("Q1", "Option 3"),
            QuestionRecord::flashcard("Q2", "A2"),
        ];
        let synthesized = synthesize_one(&questions, 0, &mut rng());
        assert_eq!(synthesized.options.len(), 4);
        assert_eq!(as_set(&synthesized.options).len(), 4);
        assert_eq!(synthesized.options.iter().filter(|o| *o == "Option 3").count(), 1);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut rng());
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_reaches_every_ordering_roughly_evenly() {
        let mut rng = rng();
        let mut counts: HashMap<[u8; 3], u32> = HashMap::new();
        for _ in 0..6000 {
            let mut items = [0u8, 1, 2];
            shuffle(&mut items, &mut rng);
            *counts.entry(items).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        for (ordering, count) in counts {
            assert!((800..1200).contains(&count), "{ordering:?} seen {count} times");
        }
    }
}

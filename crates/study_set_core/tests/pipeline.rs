//! End-to-end checks of the generation-to-assessment pipeline.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use study_set_core::{
    GenerationResult, GenerationService, GenerationSession, PlayPhase, PortError, PortResult,
    QuestionRecord, QuizPlayState, SessionError, StudySetKind, TextStream, Tier,
};

const QUIZ_STREAM: &str = concat!(
    "Sure! Here is your quiz.\n",
    "{\"question\":\"2 + 2?\",\"correct_answer\":\"4\",\"incorrect_answers\":[\"3\",\"5\",\"22\"]}\n",
    "{\"question\":\"Capital of Japan?\",\"correct_answer\":\"Tokyo\",\"incorrect_answers\":[\"Kyoto\",\"Osaka\",\"Nara\"]}\n",
    "{\"question\":\"Largest planet?\",\"correct_answer\":\"Jupiter\",\"incorrect_answers\":[\"Mars\",\"Venus\",\"Saturn\"]}\n",
    "{\"question\":\"broken\",\"correct_answer\":\n",
    "{\"title\":\"Mixed Bag\",\"description\":\"Ünïcode-friendly general knowledge\"}"
);

fn finalize_bytes(kind: StudySetKind, chunks: &[&[u8]]) -> Result<GenerationResult, SessionError> {
    let mut session = GenerationSession::new(kind);
    for chunk in chunks {
        session.on_bytes(chunk)?;
    }
    session.on_stream_end()?;
    session.result()
}

/// Cuts `bytes` at random positions, including inside multi-byte characters.
fn random_partition<'a>(bytes: &'a [u8], rng: &mut StdRng) -> Vec<&'a [u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let len = rng.gen_range(0..=12).min(bytes.len() - start);
        chunks.push(&bytes[start..start + len]);
        start += len;
    }
    chunks
}

#[test]
fn any_byte_partition_finalizes_like_the_whole_stream() {
    let bytes = QUIZ_STREAM.as_bytes();
    let whole = finalize_bytes(StudySetKind::Quiz, &[bytes]).unwrap();
    assert_eq!(whole.questions.len(), 3);
    assert_eq!(whole.title, "Mixed Bag");

    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let chunks = random_partition(bytes, &mut rng);
        assert_eq!(finalize_bytes(StudySetKind::Quiz, &chunks).unwrap(), whole);
    }
}

#[test]
fn generated_quiz_plays_through_to_a_mid_tier_summary() {
    let result = finalize_bytes(StudySetKind::Quiz, &[QUIZ_STREAM.as_bytes()]).unwrap();
    let mut play = QuizPlayState::start_fresh(result.questions.clone()).unwrap();

    let mut round = 0;
    while let Some(question) = play.current().cloned() {
        assert_eq!(question.options.len(), 4);
        let choice = if round == 2 {
            question.options.iter().find(|o| **o != question.correct_answer).unwrap().clone()
        } else {
            question.correct_answer.clone()
        };
        play.select(&choice).unwrap();
        play.reveal().unwrap();
        play.advance().unwrap();
        round += 1;
    }

    assert_eq!(play.phase(), PlayPhase::Complete);
    let summary = play.summary().unwrap();
    assert_eq!((summary.score, summary.total, summary.percentage), (2, 3, 67));
    assert_eq!(summary.tier, Tier::Mid);
}

#[test]
fn two_card_flashcard_quiz_pads_with_placeholders() {
    let stream = "{\"question\":\"Q1\",\"answer\":\"A1\"}\n{\"question\":\"Q2\",\"answer\":\"A2\"}\n{\"title\":\"T\",\"description\":\"D\"}\n";
    let result = finalize_bytes(StudySetKind::Flashcards, &[stream.as_bytes()]).unwrap();
    let play = QuizPlayState::start_fresh(result.questions).unwrap();

    for question in play.questions() {
        let distractors: Vec<&String> = question
            .options
            .iter()
            .filter(|o| **o != question.correct_answer)
            .collect();
        assert_eq!(distractors.len(), 3);
        assert!(distractors.iter().any(|d| *d == "Option 3" || *d == "Option 4"));
    }
}

//=========================================================================================
// Driving a session from a generator port
//=========================================================================================

struct ScriptedGenerator {
    chunks: Vec<PortResult<String>>,
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate_stream(&self, _prompt: &str) -> PortResult<TextStream> {
        Ok(Box::pin(stream::iter(self.chunks.clone())))
    }
}

async fn consume(generator: &dyn GenerationService, kind: StudySetKind) -> Result<GenerationResult, SessionError> {
    let mut stream = generator
        .generate_stream("prompt")
        .await
        .map_err(|e| SessionError::StreamTransport(e.to_string()))?;
    let mut session = GenerationSession::new(kind);
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(text) => {
                session.on_chunk(&text)?;
            }
            Err(e) => {
                session.on_stream_error(e.to_string())?;
                return Err(SessionError::StreamTransport(e.to_string()));
            }
        }
    }
    session.on_stream_end()?;
    session.result()
}

#[tokio::test]
async fn generator_chunks_fold_into_a_finalized_set() {
    let generator = ScriptedGenerator {
        chunks: vec![
            Ok("{\"question\":\"Q1\",".into()),
            Ok("\"answer\":\"A1\"}\n{\"question\":\"Q2\",\"answer\":\"A2\"}\n{\"ti".into()),
            Ok("tle\":\"T\",\"description\":\"D\"}\n".into()),
        ],
    };
    let result = consume(&generator, StudySetKind::Flashcards).await.unwrap();
    assert_eq!(result.title, "T");
    assert_eq!(
        result.questions,
        vec![QuestionRecord::flashcard("Q1", "A1"), QuestionRecord::flashcard("Q2", "A2")]
    );
}

#[tokio::test]
async fn generator_failure_surfaces_as_transport_error() {
    let generator = ScriptedGenerator {
        chunks: vec![
            Ok("{\"question\":\"Q1\",\"answer\":\"A1\"}\n".into()),
            Err(PortError::Unavailable("upstream closed".into())),
        ],
    };
    let err = consume(&generator, StudySetKind::Flashcards).await.unwrap_err();
    assert!(matches!(err, SessionError::StreamTransport(reason) if reason.contains("upstream closed")));
}

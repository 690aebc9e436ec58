//! crates/study_set_core/src/session.rs
//!
//! The generation session: folds a live generator stream into an ordered,
//! typed result and finalizes it exactly once.

use crate::domain::{MetadataRecord, NewStudySet, QuestionRecord, StudySetKind};
use crate::extractor::{ExtractionEvent, RecordExtractor};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Failure reason recorded when the stream ends without a usable result.
pub const INCOMPLETE_GENERATION: &str = "incomplete generation result";
/// Failure reason recorded when the caller cancels the stream.
pub const CANCELLED: &str = "cancelled";

//=========================================================================================
// Lifecycle and Errors
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Streaming,
    Finalized,
    Failed(String),
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Streaming => write!(f, "streaming"),
            SessionStatus::Finalized => write!(f, "finalized"),
            SessionStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// An operation was called outside the lifecycle state it requires.
    #[error("Cannot {operation} while the session is {status}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },
    #[error("{}", INCOMPLETE_GENERATION)]
    IncompleteGeneration,
    /// The stream failed or was cancelled before it ended.
    #[error("Generation stream failed: {0}")]
    StreamTransport(String),
}

//=========================================================================================
// Live Preview
//=========================================================================================

/// What the live preview shows: everything accepted so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewSnapshot {
    pub questions: Vec<QuestionRecord>,
    pub metadata_known: bool,
}

/// Receives a snapshot after every chunk that added at least one question.
pub trait PreviewObserver: Send {
    fn on_preview(&mut self, snapshot: &PreviewSnapshot);
}

impl<F> PreviewObserver for F
where
    F: FnMut(&PreviewSnapshot) + Send,
{
    fn on_preview(&mut self, snapshot: &PreviewSnapshot) {
        self(snapshot)
    }
}

//=========================================================================================
// Finalized Result
//=========================================================================================

/// The immutable result of a finalized session, in persistable shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: StudySetKind,
    pub questions: Vec<QuestionRecord>,
}

impl From<GenerationResult> for NewStudySet {
    fn from(result: GenerationResult) -> Self {
        NewStudySet {
            title: result.title,
            description: result.description,
            kind: result.kind,
            questions: result.questions,
        }
    }
}

//=========================================================================================
// Generation Session
//=========================================================================================

/// Owns the stream buffer and the accepted records for one generation.
///
/// Calls must arrive serially in stream order; the session is not meant to be
/// fed from several tasks at once.
pub struct GenerationSession {
    kind: StudySetKind,
    extractor: RecordExtractor,
    questions: Vec<QuestionRecord>,
    metadata: Option<MetadataRecord>,
    status: SessionStatus,
    observer: Option<Box<dyn PreviewObserver>>,
}

impl fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationSession")
            .field("kind", &self.kind)
            .field("questions", &self.questions.len())
            .field("metadata", &self.metadata)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl GenerationSession {
    pub fn new(kind: StudySetKind) -> Self {
        Self {
            kind,
            extractor: RecordExtractor::new(),
            questions: Vec::new(),
            metadata: None,
            status: SessionStatus::Streaming,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl PreviewObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Folds a text chunk into the session. Returns how many questions it added.
    pub fn on_chunk(&mut self, chunk: &str) -> Result<usize, SessionError> {
        self.ensure_streaming("accept a chunk")?;
        let events = self.extractor.append(chunk);
        Ok(self.apply(events))
    }

    /// Byte-level variant of [`Self::on_chunk`].
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Result<usize, SessionError> {
        self.ensure_streaming("accept a chunk")?;
        let events = self.extractor.append_bytes(bytes);
        Ok(self.apply(events))
    }

    /// Flushes the retained tail and settles the session.
    pub fn on_stream_end(&mut self) -> Result<(), SessionError> {
        self.ensure_streaming("end the stream")?;
        let events = self.extractor.finish();
        self.apply(events);

        if self.metadata.is_some() && !self.questions.is_empty() {
            info!(questions = self.questions.len(), kind = %self.kind, "Generation finalized");
            self.status = SessionStatus::Finalized;
            Ok(())
        } else {
            warn!(
                questions = self.questions.len(),
                metadata_known = self.metadata.is_some(),
                "Generation ended without a complete result"
            );
            self.status = SessionStatus::Failed(INCOMPLETE_GENERATION.to_string());
            Err(SessionError::IncompleteGeneration)
        }
    }

    /// Records a transport failure. Partial records stay readable for diagnostics.
    pub fn on_stream_error(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_streaming("fail the stream")?;
        let reason = reason.into();
        warn!(%reason, "Generation stream failed");
        self.extractor.abandon();
        self.status = SessionStatus::Failed(reason);
        Ok(())
    }

    /// Records that the caller cancelled the stream.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.ensure_streaming("cancel")?;
        info!(questions = self.questions.len(), "Generation cancelled");
        self.extractor.abandon();
        self.status = SessionStatus::Failed(CANCELLED.to_string());
        Ok(())
    }

    pub fn result(&self) -> Result<GenerationResult, SessionError> {
        match (&self.status, &self.metadata) {
            (SessionStatus::Finalized, Some(metadata)) => Ok(GenerationResult {
                title: metadata.title.clone(),
                description: metadata.description.clone(),
                kind: self.kind,
                questions: self.questions.clone(),
            }),
            _ => Err(SessionError::InvalidState {
                operation: "read the result",
                status: self.status.clone(),
            }),
        }
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        PreviewSnapshot {
            questions: self.questions.clone(),
            metadata_known: self.metadata.is_some(),
        }
    }

    pub fn kind(&self) -> StudySetKind {
        self.kind
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn metadata(&self) -> Option<&MetadataRecord> {
        self.metadata.as_ref()
    }

    fn ensure_streaming(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.status == SessionStatus::Streaming {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                status: self.status.clone(),
            })
        }
    }

    fn apply(&mut self, events: Vec<ExtractionEvent>) -> usize {
        let mut added = 0;

        for event in events {
            match event {
                ExtractionEvent::NewQuestion(record) if record.kind() == self.kind => {
                    self.questions.push(record);
                    added += 1;
                }
                ExtractionEvent::NewQuestion(record) => {
                    debug!(expected = %self.kind, found = %record.kind(), "Dropping question of the wrong kind");
                }
                ExtractionEvent::Metadata(metadata) if self.metadata.is_none() => {
                    self.metadata = Some(metadata);
                }
                ExtractionEvent::Metadata(_) => {
                    debug!("Ignoring repeated metadata record");
                }
            }
        }

        // Metadata alone never triggers a snapshot; it rides along with the next question.
        if added > 0 {
            if let Some(observer) = self.observer.as_mut() {
                let snapshot = PreviewSnapshot {
                    questions: self.questions.clone(),
                    metadata_known: self.metadata.is_some(),
                };
                observer.on_preview(&snapshot);
            }
        }
        added
    }
}

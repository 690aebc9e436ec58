//! crates/study_set_core/src/extractor.rs
//!
//! Turns an arbitrarily chunked generator stream into complete records.
//!
//! The [`ChunkBuffer`] only ever releases newline-terminated lines, so a line is
//! evaluated once it can no longer grow. The [`RecordExtractor`] parses each
//! released line into a field bag and dispatches on field presence to a
//! [`QuestionRecord`] or a [`MetadataRecord`]. Anything else is dropped.

use crate::domain::{MetadataRecord, QuestionRecord};
use serde_json::{Map, Value};
use tracing::debug;

/// Lines that do not start with this are incidental text, not records.
const OBJECT_OPEN: char = '{';

//=========================================================================================
// Extraction Events
//=========================================================================================

/// A complete record recognised in the stream, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionEvent {
    NewQuestion(QuestionRecord),
    Metadata(MetadataRecord),
}

//=========================================================================================
// Chunk Buffer
//=========================================================================================

/// Accumulates chunks and hands back the lines completed by each one.
///
/// `pending` never contains a newline between calls, so each push only scans
/// the bytes it appended.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    pending: String,
    undecoded: Vec<u8>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text chunk and returns every line it completed.
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        let scan_from = self.pending.len();
        self.pending.push_str(chunk);

        let Some(last_newline) = self.pending[scan_from..].rfind('\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(scan_from + last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        complete.split_terminator('\n').map(str::to_owned).collect()
    }

    /// Appends raw bytes. A UTF-8 sequence split across chunks is held back
    /// until the rest of it arrives.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        let text = self.decode(bytes);
        self.push_str(&text)
    }

    /// Releases the retained tail, which may lack a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        if !self.undecoded.is_empty() {
            self.undecoded.clear();
            self.pending.push(char::REPLACEMENT_CHARACTER);
        }
        let tail = std::mem::take(&mut self.pending);
        (!tail.is_empty()).then_some(tail)
    }

    /// Drops the partial line and any undecoded bytes.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.undecoded.clear();
    }

    /// Length in bytes of the retained partial line.
    pub fn pending_len(&self) -> usize {
        self.pending.len() + self.undecoded.len()
    }

    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.undecoded);
        input.extend_from_slice(bytes);

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        // Truncated sequence at the end: wait for more bytes.
                        None => {
                            self.undecoded = after.to_vec();
                            break;
                        }
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                    }
                }
            }
        }
        out
    }
}

//=========================================================================================
// Record Extractor
//=========================================================================================

/// Stateless apart from its [`ChunkBuffer`]; a line is never emitted twice.
#[derive(Debug, Default)]
pub struct RecordExtractor {
    buffer: ChunkBuffer,
    finished: bool,
}

impl RecordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunk: &str) -> Vec<ExtractionEvent> {
        if self.finished {
            return Vec::new();
        }
        let lines = self.buffer.push_str(chunk);
        extract_lines(&lines)
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> Vec<ExtractionEvent> {
        if self.finished {
            return Vec::new();
        }
        let lines = self.buffer.push_bytes(bytes);
        extract_lines(&lines)
    }

    /// Evaluates the retained tail. Only the first call does any work.
    pub fn finish(&mut self) -> Vec<ExtractionEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        self.buffer
            .finish()
            .and_then(|tail| classify_line(&tail))
            .into_iter()
            .collect()
    }

    /// Throws away the partial line; used when the transport fails.
    pub fn abandon(&mut self) {
        self.buffer.clear();
        self.finished = true;
    }

    /// Returns the extractor to its empty starting state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.finished = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }
}

fn extract_lines(lines: &[String]) -> Vec<ExtractionEvent> {
    lines.iter().filter_map(|line| classify_line(line)).collect()
}

/// Classifies one complete line.
///
/// Blank lines, lines that are not objects, unparsable objects, and objects
/// matching neither record shape all yield `None`.
pub fn classify_line(line: &str) -> Option<ExtractionEvent> {
    let line = line.trim();
    if !line.starts_with(OBJECT_OPEN) {
        return None;
    }

    let fields: Map<String, Value> = match serde_json::from_str(line) {
        Ok(fields) => fields,
        Err(e) => {
            debug!(error = %e, "Dropping malformed record line");
            return None;
        }
    };

    let event = classify_fields(&fields);
    if event.is_none() {
        debug!(keys = ?fields.keys().collect::<Vec<_>>(), "Dropping record with unrecognised shape");
    }
    event
}

fn classify_fields(fields: &Map<String, Value>) -> Option<ExtractionEvent> {
    if let Some(question) = text_field(fields, "question") {
        // A quiz shape that does not hold together may still be a flashcard.
        let record = quiz_record(fields, question).or_else(|| {
            let answer = text_field(fields, "answer")?;
            Some(QuestionRecord::Flashcard {
                question: question.to_owned(),
                answer: answer.to_owned(),
            })
        })?;
        return Some(ExtractionEvent::NewQuestion(record));
    }

    let title = text_field(fields, "title")?;
    let description = text_field(fields, "description")?;
    Some(ExtractionEvent::Metadata(MetadataRecord {
        title: title.to_owned(),
        description: description.to_owned(),
    }))
}

fn quiz_record(fields: &Map<String, Value>, question: &str) -> Option<QuestionRecord> {
    let correct_answer = text_field(fields, "correct_answer")?;
    let incorrect_answers = fields
        .get("incorrect_answers")?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()?;
    Some(QuestionRecord::Quiz {
        question: question.to_owned(),
        correct_answer: correct_answer.to_owned(),
        incorrect_answers,
    })
}

/// A present, string-valued, non-blank field.
fn text_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)?
        .as_str()
        .filter(|value| !value.trim().is_empty())
}

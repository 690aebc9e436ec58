//! crates/study_set_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete generator and storage implementations.

use crate::domain::{NewStudySet, StudySet, StudySetSummary};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The chunked text stream produced by a generator.
pub type TextStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submits a prompt and returns the generator's output as it arrives.
    ///
    /// Chunk boundaries carry no meaning; a chunk may end mid-line or mid-value.
    async fn generate_stream(&self, prompt: &str) -> PortResult<TextStream>;
}

#[async_trait]
pub trait StudySetStore: Send + Sync {
    async fn persist(&self, study_set: NewStudySet) -> PortResult<StudySet>;

    async fn fetch(&self, id: Uuid) -> PortResult<StudySet>;

    /// Replaces the content of a stored set, keeping its id and creation time.
    async fn update(&self, id: Uuid, study_set: NewStudySet) -> PortResult<StudySet>;

    /// Lists stored sets, newest first.
    async fn list(&self) -> PortResult<Vec<StudySetSummary>>;

    async fn delete(&self, id: Uuid) -> PortResult<()>;
}

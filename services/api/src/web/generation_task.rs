//! services/api/src/web/generation_task.rs
//!
//! This module contains the asynchronous "worker" function that drives one
//! generation: it opens the generator stream and feeds every chunk into a
//! `GenerationSession` until the stream ends, fails, is cancelled, or runs out
//! of time. Single-card refinement goes through the same generator with a
//! smaller prompt and a response read as a whole.

use crate::error::ApiError;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;
use study_set_core::ports::{GenerationService, PortError, PortResult};
use study_set_core::domain::QuestionRecord;
use study_set_core::prompt::{build_prompt, build_refine_prompt, parse_refined_card, GenerationRequest, RefineAction};
use study_set_core::session::{GenerationResult, GenerationSession, PreviewSnapshot, SessionError, CANCELLED};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEADLINE_EXPIRED: &str = "generation deadline expired";

/// What woke the driver up.
enum Step {
    Cancelled,
    DeadlineExpired,
    Chunk(Option<PortResult<String>>),
}

/// Runs a generation to completion and returns the finalized result.
///
/// `on_preview` is called after every chunk that changed the preview. Reaching
/// the deadline is handled exactly like a cancellation; in both cases the
/// partial line is discarded and nothing is returned.
pub async fn run_generation<F>(
    generator: &dyn GenerationService,
    request: &GenerationRequest,
    cancellation_token: CancellationToken,
    deadline: Duration,
    on_preview: F,
) -> Result<GenerationResult, ApiError>
where
    F: FnMut(&PreviewSnapshot) + Send + 'static,
{
    let prompt = build_prompt(request)?;
    let mut session = GenerationSession::new(request.kind).with_observer(on_preview);

    let expiry = tokio::time::sleep(deadline);
    tokio::pin!(expiry);

    info!(kind = %request.kind, quantity = request.quantity, "Generation started");

    let opened = tokio::select! {
        biased;
        _ = cancellation_token.cancelled() => return Err(stop(&mut session, CANCELLED)?),
        _ = &mut expiry => return Err(stop(&mut session, DEADLINE_EXPIRED)?),
        opened = generator.generate_stream(&prompt) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            session.on_stream_error(e.to_string())?;
            return Err(SessionError::StreamTransport(e.to_string()).into());
        }
    };

    loop {
        let step = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => Step::Cancelled,
            _ = &mut expiry => Step::DeadlineExpired,
            chunk = stream.next() => Step::Chunk(chunk),
        };

        match step {
            Step::Cancelled => return Err(stop(&mut session, CANCELLED)?),
            Step::DeadlineExpired => return Err(stop(&mut session, DEADLINE_EXPIRED)?),
            Step::Chunk(Some(Ok(text))) => {
                session.on_chunk(&text)?;
            }
            Step::Chunk(Some(Err(e))) => {
                session.on_stream_error(e.to_string())?;
                return Err(SessionError::StreamTransport(e.to_string()).into());
            }
            Step::Chunk(None) => break,
        }
    }

    session.on_stream_end()?;
    Ok(session.result()?)
}

/// Cancels the session and builds the error reported to the caller.
fn stop(session: &mut GenerationSession, reason: &str) -> Result<ApiError, ApiError> {
    warn!(%reason, "Generation stopped before the stream ended");
    session.cancel()?;
    Ok(SessionError::StreamTransport(reason.to_string()).into())
}

/// Asks the generator for a rewritten flashcard.
///
/// The whole response is collected before parsing; a response holding no
/// `{question, answer}` object counts as an incomplete generation.
pub async fn run_refinement(
    generator: &dyn GenerationService,
    action: RefineAction,
    card: &QuestionRecord,
    deadline: Duration,
) -> Result<QuestionRecord, ApiError> {
    let prompt = build_refine_prompt(action, card)?;

    let collect = async {
        let stream = generator.generate_stream(&prompt).await?;
        Ok::<Vec<String>, PortError>(stream.try_collect().await?)
    };
    let chunks = tokio::time::timeout(deadline, collect)
        .await
        .map_err(|_| SessionError::StreamTransport(DEADLINE_EXPIRED.to_string()))?
        .map_err(|e| SessionError::StreamTransport(e.to_string()))?;

    let response = chunks.concat();
    match parse_refined_card(&response) {
        Some(refined) => {
            info!(?action, "Flashcard refined");
            Ok(refined)
        }
        None => {
            warn!(?action, response_len = response.len(), "Refinement response held no flashcard");
            Err(SessionError::IncompleteGeneration.into())
        }
    }
}

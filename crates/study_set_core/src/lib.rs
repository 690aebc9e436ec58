pub mod domain;
pub mod extractor;
pub mod play;
pub mod ports;
pub mod prompt;
pub mod session;
pub mod study;
pub mod synthesizer;

pub use domain::{
    MetadataRecord, NewStudySet, QuestionRecord, StudySet, StudySetKind, StudySetSummary,
    SynthesizedQuestion,
};
pub use extractor::{ChunkBuffer, ExtractionEvent, RecordExtractor};
pub use play::{CompletionSummary, PlayError, PlayPhase, QuizPlayState, Tier};
pub use ports::{GenerationService, PortError, PortResult, StudySetStore, TextStream};
pub use prompt::{
    build_prompt, build_refine_prompt, parse_refined_card, GenerationOptions, GenerationRequest,
    GenerationSource, PromptError, RefineAction,
};
pub use session::{GenerationResult, GenerationSession, PreviewObserver, PreviewSnapshot, SessionError, SessionStatus};
pub use study::StudyDeck;

pub mod budget;
pub mod client;
pub mod decode;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod prompt;

pub use budget::{budget, TRUNCATION_MARKER};
pub use client::{
    interpret_response, GenerationBackend, GenerationClient, DEFAULT_REQUEST_TIMEOUT,
    MISSING_ANSWER_FALLBACK, RAW_EXCERPT_CHARS,
};
pub use decode::{decode_docx, decode_image, decode_pdf, decode_plain_text};
pub use error::{DecodeError, PipelineError};
pub use extract::{extract_batch, ExtractionReport, FILE_SEPARATOR};
pub use models::{
    ExtractedDocument, FileKind, FileOutcome, FileStatus, PipelineOptions, ProgressEvent,
    ProgressSender, UploadedFile, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_MODEL_ID,
};
pub use pipeline::{DocumentPipeline, PipelineRun};
pub use prompt::assemble;

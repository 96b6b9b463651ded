use thiserror::Error;

/// Per-file failures. These are absorbed by the extraction coordinator: the
/// file is recorded as failed and the batch continues.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("docx parse error: {0}")]
    DocxParse(String),

    #[error("file is not valid utf-8: {0}")]
    InvalidUtf8(String),

    #[error("ocr failed: {0}")]
    OcrFailed(String),
}

/// Invocation-level failures. Any of these ends the invocation with a single
/// human-readable message; upstream-data variants carry a bounded excerpt of
/// the raw body for diagnosis.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("nothing to process: no files and an empty instruction")]
    EmptyRequest,

    #[error("no readable content in the uploaded files")]
    NoReadableContent,

    #[error("endpoint url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned a malformed body: {excerpt}")]
    UpstreamMalformed { excerpt: String },

    #[error("upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        excerpt: String,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// A single file handed to the pipeline: raw bytes plus the metadata the
/// caller declared for them. Never persisted; owned by one invocation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }
}

/// Closed set of decodable formats. Resolved exactly once per file from the
/// declared MIME type (lowercased, substring match) with a filename-extension
/// fallback; anything else is `Unsupported` rather than a default decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    Docx,
    PlainText,
    Unsupported,
}

const TEXT_EXTENSIONS: [&str; 7] = ["txt", "md", "markdown", "json", "ts", "tsx", "rs"];
const IMAGE_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

impl FileKind {
    pub fn detect(declared_type: &str, name: &str) -> Self {
        let declared = declared_type.to_lowercase();
        let name = name.to_lowercase();
        let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_string());
        let has_extension = |candidates: &[&str]| {
            extension
                .as_deref()
                .is_some_and(|ext| candidates.contains(&ext))
        };

        if declared.contains("pdf") || has_extension(&["pdf"]) {
            FileKind::Pdf
        } else if declared.contains("image") || has_extension(&IMAGE_EXTENSIONS) {
            FileKind::Image
        } else if declared.contains("wordprocessingml") || has_extension(&["docx"]) {
            FileKind::Docx
        } else if declared.contains("text") || has_extension(&TEXT_EXTENSIONS) {
            FileKind::PlainText
        } else {
            FileKind::Unsupported
        }
    }

    /// Header label used in the per-decoder output prefix.
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Pdf => "PDF",
            FileKind::Image => "IMAGE",
            FileKind::Docx => "DOCX",
            FileKind::PlainText => "TEXT",
            FileKind::Unsupported => "UNSUPPORTED",
        }
    }
}

/// Text recovered from exactly one uploaded file.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub source_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Extracted,
    Unsupported,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub name: String,
    pub status: FileStatus,
}

/// Coarse-grained progress narration for one invocation. Consumers subscribe
/// through a channel; the pipeline never touches display state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Reading,
    Processing { file: String },
    Truncating,
    AwaitingModel,
    Done,
    Failed { message: String },
}

/// Progress subscribers receive events over an unbounded channel; a dropped
/// receiver never stalls the pipeline.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<ProgressEvent>;

pub(crate) fn emit(progress: Option<&ProgressSender>, event: ProgressEvent) {
    if let Some(sender) = progress {
        let _ = sender.send(event);
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressEvent::Reading => write!(formatter, "Reading documents..."),
            ProgressEvent::Processing { file } => write!(formatter, "Processing {file}..."),
            ProgressEvent::Truncating => write!(formatter, "Document huge. Truncating..."),
            ProgressEvent::AwaitingModel => write!(formatter, "Waiting for AI..."),
            ProgressEvent::Done => write!(formatter, "Done"),
            ProgressEvent::Failed { message } => write!(formatter, "Failed: {message}"),
        }
    }
}

/// Invocation-level knobs. The context budget is configuration rather than a
/// constant: observed deployments ran with figures as far apart as 6k and
/// 50k characters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub model_id: String,
    pub max_context_chars: usize,
}

pub const DEFAULT_MODEL_ID: &str = "gemini-1.5-flash";
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 50_000;

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

use crate::budget::budget;
use crate::client::GenerationBackend;
use crate::error::PipelineError;
use crate::extract::{extract_batch, ExtractionReport};
use crate::models::{
    emit, FileOutcome, PipelineOptions, ProgressEvent, ProgressSender, UploadedFile,
};
use crate::prompt::assemble;
use tracing::info;

/// What one successful invocation yields: exactly one generated text block
/// plus the per-file extraction outcomes.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub answer: String,
    pub files: Vec<FileOutcome>,
}

/// One invocation per user action: extract sequentially, budget, assemble,
/// await a single generation call. No state survives the invocation; a new
/// invocation superseding this one is the caller's concern.
pub struct DocumentPipeline<G> {
    backend: G,
    options: PipelineOptions,
}

impl<G> DocumentPipeline<G>
where
    G: GenerationBackend + Send + Sync,
{
    pub fn new(backend: G, options: PipelineOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub async fn run(
        &self,
        instruction: &str,
        files: &[UploadedFile],
        progress: Option<&ProgressSender>,
    ) -> Result<PipelineRun, PipelineError> {
        match self.run_inner(instruction, files, progress).await {
            Ok(run) => {
                emit(progress, ProgressEvent::Done);
                Ok(run)
            }
            Err(error) => {
                emit(
                    progress,
                    ProgressEvent::Failed {
                        message: error.to_string(),
                    },
                );
                Err(error)
            }
        }
    }

    async fn run_inner(
        &self,
        instruction: &str,
        files: &[UploadedFile],
        progress: Option<&ProgressSender>,
    ) -> Result<PipelineRun, PipelineError> {
        if files.is_empty() && instruction.trim().is_empty() {
            return Err(PipelineError::EmptyRequest);
        }

        let (context, outcomes) = if files.is_empty() {
            // Pure-text Q&A: nothing to extract, instruction goes verbatim.
            (String::new(), Vec::new())
        } else {
            emit(progress, ProgressEvent::Reading);
            let ExtractionReport {
                combined_text,
                files: outcomes,
            } = extract_batch(files, progress)?;

            let bounded = budget(&combined_text, self.options.max_context_chars);
            if bounded.len() != combined_text.len() {
                emit(progress, ProgressEvent::Truncating);
                info!(
                    max_context_chars = self.options.max_context_chars,
                    "combined context over budget, truncated"
                );
            }
            (bounded, outcomes)
        };

        let full_prompt = assemble(instruction, &context);
        emit(progress, ProgressEvent::AwaitingModel);
        let answer = self
            .backend
            .generate(&full_prompt, &self.options.model_id)
            .await?;

        Ok(PipelineRun {
            answer,
            files: outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentPipeline;
    use crate::client::GenerationBackend;
    use crate::error::PipelineError;
    use crate::extract::FILE_SEPARATOR;
    use crate::models::{FileStatus, PipelineOptions, ProgressEvent, UploadedFile};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeBackend {
        reply: String,
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeBackend {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for FakeBackend {
        async fn generate(&self, prompt: &str, model: &str) -> Result<String, PipelineError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push((prompt.to_string(), model.to_string()));
            Ok(self.reply.clone())
        }
    }

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile::new(name, "text/plain", content.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn instruction_without_files_is_sent_verbatim() {
        let backend = FakeBackend::replying("ok");
        let pipeline = DocumentPipeline::new(backend.clone(), PipelineOptions::default());

        let run = pipeline
            .run("Summarize", &[], None)
            .await
            .expect("pure-text invocation succeeds");

        assert_eq!(run.answer, "ok");
        assert!(run.files.is_empty());
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Summarize");
        assert_eq!(calls[0].1, "gemini-1.5-flash");
    }

    #[tokio::test]
    async fn extracted_context_lands_in_the_prompt_template() {
        let backend = FakeBackend::replying("summary");
        let pipeline = DocumentPipeline::new(backend.clone(), PipelineOptions::default());
        let files = vec![text_file("notes.txt", "lecture content")];

        let run = pipeline
            .run("Quiz me", &files, None)
            .await
            .expect("invocation succeeds");

        assert_eq!(run.answer, "summary");
        assert_eq!(run.files[0].status, FileStatus::Extracted);
        let (prompt, _) = backend.calls().remove(0);
        assert!(prompt.starts_with("Quiz me\n\nContext from files:\n"));
        assert!(prompt.contains("--- START TEXT: notes.txt ---"));
        assert!(prompt.contains("lecture content"));
        // context is trimmed, so the prompt ends on the final separator
        assert!(prompt.ends_with(FILE_SEPARATOR));
    }

    #[tokio::test]
    async fn undecodable_batch_never_reaches_the_backend() {
        let backend = FakeBackend::replying("never");
        let pipeline = DocumentPipeline::new(backend.clone(), PipelineOptions::default());
        let files = vec![UploadedFile::new(
            "broken.pdf",
            "application/pdf",
            b"%PDF-1.4\n%broken".to_vec(),
        )];

        let result = pipeline.run("Summarize", &files, None).await;

        assert!(matches!(result, Err(PipelineError::NoReadableContent)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_invocation_is_rejected() {
        let backend = FakeBackend::replying("never");
        let pipeline = DocumentPipeline::new(backend.clone(), PipelineOptions::default());

        let result = pipeline.run("   ", &[], None).await;

        assert!(matches!(result, Err(PipelineError::EmptyRequest)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn oversized_context_narrates_truncation() {
        let backend = FakeBackend::replying("ok");
        let options = PipelineOptions {
            max_context_chars: 120,
            ..PipelineOptions::default()
        };
        let pipeline = DocumentPipeline::new(backend.clone(), options);
        let files = vec![text_file("big.txt", &"word ".repeat(200))];
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

        pipeline
            .run("Summarize", &files, Some(&sender))
            .await
            .expect("invocation succeeds");
        drop(sender);

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&ProgressEvent::Reading));
        assert!(events.contains(&ProgressEvent::Truncating));
        assert!(events.contains(&ProgressEvent::AwaitingModel));
        assert_eq!(events.last(), Some(&ProgressEvent::Done));

        let (prompt, _) = backend.calls().remove(0);
        assert!(prompt.contains("[Truncated]"));
    }

    #[tokio::test]
    async fn failures_are_narrated_before_surfacing() {
        let backend = FakeBackend::replying("never");
        let pipeline = DocumentPipeline::new(backend, PipelineOptions::default());
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();

        let result = pipeline.run("", &[], Some(&sender)).await;
        drop(sender);

        assert!(result.is_err());
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::Failed { .. })
        ));
    }
}

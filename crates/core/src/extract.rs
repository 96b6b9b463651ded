use crate::decode;
use crate::error::PipelineError;
use crate::models::{emit, FileKind, FileOutcome, FileStatus, ProgressEvent, ProgressSender, UploadedFile};
use tracing::{debug, warn};

/// Literal token between the texts of consecutive files.
pub const FILE_SEPARATOR: &str = "--- FILE SEPARATOR ---";

#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub combined_text: String,
    pub files: Vec<FileOutcome>,
}

/// Run every file in caller order through its decoder and concatenate the
/// results. One bad file never voids the batch: decode failures are logged,
/// recorded in the per-file outcomes, and skipped. Files matching no decoder
/// are silently recorded as unsupported. Only a batch that yields nothing at
/// all is terminal.
pub fn extract_batch(
    files: &[UploadedFile],
    progress: Option<&ProgressSender>,
) -> Result<ExtractionReport, PipelineError> {
    let mut combined = String::new();
    let mut outcomes = Vec::with_capacity(files.len());

    for file in files {
        emit(
            progress,
            ProgressEvent::Processing {
                file: file.name.clone(),
            },
        );

        let kind = FileKind::detect(&file.declared_type, &file.name);
        let decoded = match kind {
            FileKind::Pdf => decode::decode_pdf(file),
            FileKind::Image => decode::decode_image(file),
            FileKind::Docx => decode::decode_docx(file),
            FileKind::PlainText => decode::decode_plain_text(file),
            FileKind::Unsupported => {
                debug!(file = %file.name, declared_type = %file.declared_type, "no decoder matches, skipping");
                outcomes.push(FileOutcome {
                    name: file.name.clone(),
                    status: FileStatus::Unsupported,
                });
                continue;
            }
        };

        match decoded {
            Ok(document) => {
                combined.push_str(&document.text);
                combined.push_str("\n\n");
                combined.push_str(FILE_SEPARATOR);
                combined.push_str("\n\n");
                outcomes.push(FileOutcome {
                    name: file.name.clone(),
                    status: FileStatus::Extracted,
                });
            }
            Err(error) => {
                warn!(file = %file.name, error = %error, "failed to read file, continuing");
                outcomes.push(FileOutcome {
                    name: file.name.clone(),
                    status: FileStatus::Failed(error.to_string()),
                });
            }
        }
    }

    if combined.is_empty() {
        return Err(PipelineError::NoReadableContent);
    }

    Ok(ExtractionReport {
        combined_text: combined,
        files: outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::{extract_batch, FILE_SEPARATOR};
    use crate::error::PipelineError;
    use crate::models::{FileStatus, ProgressEvent, UploadedFile};

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile::new(name, "text/plain", content.as_bytes().to_vec())
    }

    fn corrupt_pdf(name: &str) -> UploadedFile {
        UploadedFile::new(name, "application/pdf", b"%PDF-1.4\n%broken".to_vec())
    }

    #[test]
    fn one_bad_file_never_voids_the_batch() {
        let files = vec![text_file("good.txt", "usable content"), corrupt_pdf("bad.pdf")];
        let report = extract_batch(&files, None).expect("batch should survive one bad file");

        assert!(report.combined_text.contains("usable content"));
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].status, FileStatus::Extracted);
        assert!(matches!(report.files[1].status, FileStatus::Failed(_)));
    }

    #[test]
    fn every_extracted_file_is_followed_by_the_separator() {
        let files = vec![text_file("a.txt", "first"), text_file("b.txt", "second")];
        let report = extract_batch(&files, None).expect("batch decodes");

        let separator_block = format!("\n\n{FILE_SEPARATOR}\n\n");
        assert_eq!(report.combined_text.matches(FILE_SEPARATOR).count(), 2);
        assert!(report.combined_text.ends_with(&separator_block));
    }

    #[test]
    fn unsupported_files_are_recorded_not_errored() {
        let files = vec![
            text_file("a.txt", "content"),
            UploadedFile::new("archive.zip", "application/zip", vec![1, 2, 3]),
        ];
        let report = extract_batch(&files, None).expect("unsupported file is not an error");

        assert_eq!(report.files[1].status, FileStatus::Unsupported);
        assert!(!report.combined_text.contains("archive.zip"));
    }

    #[test]
    fn fully_undecodable_batch_is_terminal() {
        let files = vec![corrupt_pdf("one.pdf"), corrupt_pdf("two.pdf")];
        let result = extract_batch(&files, None);
        assert!(matches!(result, Err(PipelineError::NoReadableContent)));
    }

    #[test]
    fn empty_batch_is_terminal() {
        let result = extract_batch(&[], None);
        assert!(matches!(result, Err(PipelineError::NoReadableContent)));
    }

    #[test]
    fn progress_names_each_file_in_submission_order() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let files = vec![text_file("first.txt", "a"), text_file("second.txt", "b")];
        extract_batch(&files, Some(&sender)).expect("batch decodes");
        drop(sender);

        let mut seen = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                ProgressEvent::Processing {
                    file: "first.txt".to_string()
                },
                ProgressEvent::Processing {
                    file: "second.txt".to_string()
                },
            ]
        );
    }
}

use crate::error::DecodeError;
use crate::models::{ExtractedDocument, FileKind, UploadedFile};
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use lopdf::Document;
use std::io::Write;

fn source_header(kind: FileKind, name: &str) -> String {
    format!("--- START {}: {} ---\n", kind.label(), name)
}

/// Collapse the positioned text runs of one PDF page into a single line,
/// runs joined by single spaces. Reading order within a page is whatever the
/// source provides.
fn join_page_runs(page_text: &str) -> String {
    page_text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode a PDF from memory: pages in order 1..N, one newline-terminated
/// line per page.
pub fn decode_pdf(file: &UploadedFile) -> Result<ExtractedDocument, DecodeError> {
    let document =
        Document::load_mem(&file.bytes).map_err(|error| DecodeError::PdfParse(error.to_string()))?;

    let mut text = source_header(FileKind::Pdf, &file.name);
    for (page_number, _object_id) in document.get_pages() {
        let page_text = document
            .extract_text(&[page_number])
            .map_err(|error| DecodeError::PdfParse(error.to_string()))?;
        text.push_str(&join_page_runs(&page_text));
        text.push('\n');
    }

    Ok(ExtractedDocument {
        source_name: file.name.clone(),
        text,
    })
}

/// Decode a DOCX from memory. Raw paragraph text only: runs are
/// concatenated, one line per paragraph; formatting, embedded media, and
/// document structure are discarded.
pub fn decode_docx(file: &UploadedFile) -> Result<ExtractedDocument, DecodeError> {
    let docx =
        read_docx(&file.bytes).map_err(|error| DecodeError::DocxParse(error.to_string()))?;

    let mut text = source_header(FileKind::Docx, &file.name);
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for paragraph_child in &paragraph.children {
                if let ParagraphChild::Run(run) = paragraph_child {
                    for run_child in &run.children {
                        if let RunChild::Text(content) = run_child {
                            text.push_str(&content.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }

    Ok(ExtractedDocument {
        source_name: file.name.clone(),
        text,
    })
}

/// Decode bytes as strict UTF-8, verbatim.
pub fn decode_plain_text(file: &UploadedFile) -> Result<ExtractedDocument, DecodeError> {
    let text = std::str::from_utf8(&file.bytes)
        .map_err(|error| DecodeError::InvalidUtf8(format!("{}: {error}", file.name)))?;
    Ok(ExtractedDocument {
        source_name: file.name.clone(),
        text: format!(
            "{}{}",
            source_header(FileKind::PlainText, &file.name),
            text
        ),
    })
}

const OCR_SUFFIXES: [&str; 8] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tif", "tiff"];

fn ocr_suffix(name: &str) -> String {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| OCR_SUFFIXES.contains(&ext.as_str()));
    match extension {
        Some(ext) => format!(".{ext}"),
        None => ".png".to_string(),
    }
}

/// Recognize English text in an image. The bytes go through a scoped
/// temporary file that is removed when the handle drops, on the success and
/// failure path alike.
pub fn decode_image(file: &UploadedFile) -> Result<ExtractedDocument, DecodeError> {
    let mut scratch = tempfile::Builder::new()
        .prefix("docask-ocr-")
        .suffix(&ocr_suffix(&file.name))
        .tempfile()?;
    scratch.write_all(&file.bytes)?;
    scratch.flush()?;

    let image = rusty_tesseract::Image::from_path(scratch.path())
        .map_err(|error| DecodeError::OcrFailed(error.to_string()))?;
    let args = rusty_tesseract::Args {
        lang: "eng".to_string(),
        ..rusty_tesseract::Args::default()
    };
    let recognized = rusty_tesseract::image_to_string(&image, &args)
        .map_err(|error| DecodeError::OcrFailed(error.to_string()))?;

    Ok(ExtractedDocument {
        source_name: file.name.clone(),
        text: format!(
            "{}{}",
            source_header(FileKind::Image, &file.name),
            recognized
        ),
    })
}

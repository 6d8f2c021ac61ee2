//! Source document discovery and page text extraction.

use crate::types::{Document, Page};
use policyqa_core::{AppError, AppResult, Stage};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Page separator used by plain-text exports.
const FORM_FEED: char = '\u{c}';

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Markdown,
    PlainText,
}

impl DocumentKind {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" => Some(Self::PlainText),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
        }
    }
}

/// Load every supported document under `dir`, sorted by path.
///
/// Files that fail to load are logged and skipped. Finding nothing loadable
/// is an error, since ingesting an empty set would leave the index empty.
pub fn load_documents(dir: &Path) -> AppResult<Vec<Document>> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Document directory not found: {}",
            dir.display()
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || DocumentKind::from_path(path).is_none() {
            continue;
        }

        match load_document(path) {
            Ok(doc) if doc.pages.is_empty() => {
                tracing::warn!("Skipping {:?}: no extractable text", path);
            }
            Ok(doc) => {
                tracing::debug!("Loaded {:?} ({} pages)", path, doc.pages.len());
                documents.push(doc);
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
            }
        }
    }

    if documents.is_empty() {
        return Err(AppError::invalid_input(
            Stage::Ingestion,
            format!("No PDF or text documents found in {}", dir.display()),
        ));
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);
    Ok(documents)
}

/// Load a single document, keeping only pages with text.
pub fn load_document(path: &Path) -> AppResult<Document> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        AppError::invalid_input(
            Stage::Ingestion,
            format!("Unsupported document type: {}", path.display()),
        )
    })?;

    let pages = match kind {
        DocumentKind::Pdf => pdf_pages(&fs::read(path)?)?,
        DocumentKind::Markdown | DocumentKind::PlainText => text_pages(&fs::read_to_string(path)?),
    };

    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Document {
        id,
        path: Some(path.to_path_buf()),
        pages,
    })
}

/// Extract per-page text from PDF bytes. Blank pages are dropped but keep
/// their numbering, so page N is always the Nth page of the file.
pub fn pdf_pages(data: &[u8]) -> AppResult<Vec<Page>> {
    let pdf = lopdf::Document::load_mem(data).map_err(|e| {
        AppError::invalid_input(Stage::Ingestion, format!("Failed to parse PDF: {}", e))
    })?;

    let mut pages = Vec::new();
    for number in pdf.get_pages().keys().copied() {
        let text = match pdf.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Failed to extract text from page {}: {}", number, e);
                continue;
            }
        };
        if !text.trim().is_empty() {
            pages.push(Page { number, text });
        }
    }

    Ok(pages)
}

/// Split plain text into pages on form feeds. Blank pages are dropped but
/// keep their numbering.
pub fn text_pages(text: &str) -> Vec<Page> {
    text.split(FORM_FEED)
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| Page {
            number: i as u32 + 1,
            text: page.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_detection() {
        assert_eq!(DocumentKind::from_path(Path::new("a.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::from_path(Path::new("notes.md")),
            Some(DocumentKind::Markdown)
        );
        assert_eq!(
            DocumentKind::from_path(Path::new("leave.txt")),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(DocumentKind::from_path(Path::new("image.png")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_text_pages_split_on_form_feed() {
        let pages = text_pages("page one\u{c}\u{c}  \u{c}page four");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].text, "page one");
        assert_eq!(pages[1].number, 4);
    }

    #[test]
    fn test_load_documents_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.txt"), "Remote work is allowed.").unwrap();
        fs::write(temp.path().join("a.md"), "# Leave\nTwenty days.").unwrap();
        fs::write(temp.path().join("empty.txt"), "   \n").unwrap();
        fs::write(temp.path().join("photo.jpg"), [0u8, 1, 2]).unwrap();

        let docs = load_documents(temp.path()).unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.txt"]);
        assert!(docs[0].path.is_some());
    }

    #[test]
    fn test_load_documents_empty_dir_is_invalid_input() {
        let temp = TempDir::new().unwrap();
        let err = load_documents(temp.path()).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidInput {
                stage: Stage::Ingestion,
                ..
            }
        ));
    }

    #[test]
    fn test_load_documents_missing_dir() {
        let err = load_documents(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_corrupt_pdf_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("broken.pdf"), b"not a pdf").unwrap();
        fs::write(temp.path().join("ok.txt"), "Expenses need receipts.").unwrap();

        let docs = load_documents(temp.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "ok.txt");
    }
}

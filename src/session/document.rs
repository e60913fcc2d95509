//! The uploaded document.
//!
//! The bytes are never parsed: validation only checks the extension and the
//! `%PDF-` signature, then the payload is carried to the backend as base64.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use tracing::debug;

use super::SessionError;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Readers accept the signature anywhere in the first KiB.
const MAGIC_SEARCH_WINDOW: usize = 1024;

/// The active document for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name shown to the user and sent to the model.
    pub name: String,
    pub data_base64: String,
    pub media_type: String,
    /// Local path, opened by `/view`.
    pub path: PathBuf,
}

/// Check if a file path points to a PDF
pub fn is_pdf_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Whether `bytes` carry the PDF signature.
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(MAGIC_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

impl Document {
    /// Build a document from already-read bytes.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self, SessionError> {
        if !is_pdf_file(path) || !has_pdf_header(bytes) {
            return Err(SessionError::UnsupportedMediaType);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: PDF_MEDIA_TYPE.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Read and validate a PDF from disk.
    pub async fn load(path: &Path) -> Result<Self, SessionError> {
        // Reject by extension before touching the filesystem.
        if !is_pdf_file(path) {
            return Err(SessionError::UnsupportedMediaType);
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SessionError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let resolved = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());

        let doc = Self::from_bytes(&resolved, &bytes)?;
        debug!(name = %doc.name, bytes = bytes.len(), "Loaded document");
        Ok(doc)
    }

    /// Size of the decoded payload in bytes.
    pub fn size(&self) -> usize {
        // base64 expands 3 bytes into 4 characters
        let padding = self.data_base64.bytes().rev().take_while(|&b| b == b'=').count();
        self.data_base64.len() / 4 * 3 - padding
    }
}

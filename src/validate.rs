//! Two-phase upload validation.
//!
//! The header phase runs before a single body byte is read and rejects
//! anything whose declared metadata is already wrong. The content phase
//! streams the body into a temp file in fixed-size chunks, enforcing the
//! size limit on the bytes actually received, then checks the filename
//! extension against the declared content type.
//!
//! # Allowed types
//!
//! | Content type | Extension |
//! |--------------|-----------|
//! | `application/pdf` | `.pdf` |
//! | `application/json` | `.json` |
//! | `text/csv` | `.csv` |

use std::path::Path;

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::config::IntakeConfig;
use crate::error::ValidationError;

/// An accepted upload type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Json,
    Csv,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Pdf, FileKind::Json, FileKind::Csv];

    /// Match a `Content-Type` value. Parameters such as `; charset=utf-8`
    /// are ignored, and the comparison is case-insensitive.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.content_type() == essence)
    }

    /// Guess from a file extension, for local CLI uploads.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.extension().trim_start_matches('.') == ext)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Json => "application/json",
            FileKind::Csv => "text/csv",
        }
    }

    /// Canonical extension, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Pdf => ".pdf",
            FileKind::Json => ".json",
            FileKind::Csv => ".csv",
        }
    }

    fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|k| k.extension())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Upload metadata as it arrives at the boundary.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub content_type: Option<String>,
    pub declared_content_length: Option<u64>,
    pub filename: Option<String>,
    pub user_identity: String,
}

/// Output of the header phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedHeaders {
    pub kind: FileKind,
    pub filename: String,
    pub declared_length: u64,
}

/// A fully received upload on disk.
///
/// Owns the temp file; dropping it deletes the file.
#[derive(Debug)]
pub struct ValidatedFile {
    file: NamedTempFile,
    size: u64,
    kind: FileKind,
    filename: String,
}

impl ValidatedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Bytes received, measured while streaming.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Delete the temp file now, reporting any error.
    pub fn close(self) -> std::io::Result<()> {
        self.file.close()
    }
}

#[derive(Debug, Clone)]
pub struct FileValidator {
    max_bytes: u64,
    chunk_bytes: usize,
}

impl FileValidator {
    pub fn new(max_bytes: u64, chunk_bytes: usize) -> Self {
        Self {
            max_bytes,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(config.max_file_bytes, config.read_chunk_bytes)
    }

    /// Check declared metadata. Reads nothing.
    pub fn validate_headers(
        &self,
        request: &UploadRequest,
    ) -> Result<ValidatedHeaders, ValidationError> {
        let content_type = request
            .content_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ValidationError::MissingHeader(
                "Content-Type header is required",
            ))?;

        let declared_length = request
            .declared_content_length
            .filter(|&n| n > 0)
            .ok_or(ValidationError::MissingHeader(
                "Content-Length header is required",
            ))?;

        let filename = request
            .filename
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingHeader("Filename is required"))?;

        let kind = FileKind::from_content_type(content_type).ok_or_else(|| {
            ValidationError::UnsupportedType {
                allowed: FileKind::allowed_list(),
            }
        })?;

        if declared_length > self.max_bytes {
            return Err(ValidationError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        Ok(ValidatedHeaders {
            kind,
            filename: filename.to_string(),
            declared_length,
        })
    }

    /// Stream `reader` into `temp`, then check the filename extension.
    ///
    /// On any error the temp file is deleted before returning.
    pub async fn validate_content<R>(
        &self,
        headers: ValidatedHeaders,
        reader: &mut R,
        temp: NamedTempFile,
    ) -> Result<ValidatedFile, ValidationError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let size = match self.stream_into(reader, &temp).await {
            Ok(size) => size,
            Err(e) => {
                let _ = temp.close();
                return Err(e);
            }
        };

        let extension = Path::new(&headers.filename)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        if extension != headers.kind.extension() {
            let _ = temp.close();
            return Err(ValidationError::ExtensionMismatch {
                expected: headers.kind.extension(),
            });
        }

        Ok(ValidatedFile {
            file: temp,
            size,
            kind: headers.kind,
            filename: headers.filename,
        })
    }

    async fn stream_into<R>(&self, reader: &mut R, temp: &NamedTempFile) -> Result<u64, ValidationError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut out = tokio::fs::File::from_std(temp.reopen()?);
        let mut buf = vec![0u8; self.chunk_bytes];
        let mut total: u64 = 0;

        loop {
            let n = fill_chunk(reader, &mut buf).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > self.max_bytes {
                return Err(ValidationError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }
            out.write_all(&buf[..n]).await?;
            if n < buf.len() {
                break;
            }
        }

        out.flush().await?;
        Ok(total)
    }
}

/// Read until `buf` is full or the reader hits EOF.
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

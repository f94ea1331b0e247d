// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Upload validation policy: which extensions are accepted, under which kind
//! bucket they land, and how large one file may be.

use atende_config::model::UploadConfig;

/// Deployment-configurable validation policy for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size_bytes: u64,
    image_extensions: Vec<String>,
    document_extensions: Vec<String>,
    audio_extensions: Vec<String>,
}

/// Why one file was rejected. Per-file and never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    EmptyFilename,
    MissingExtension,
    DisallowedExtension(String),
    TooLarge { size: u64, limit: u64 },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::EmptyFilename => write!(f, "empty filename"),
            RejectReason::MissingExtension => write!(f, "filename has no extension"),
            RejectReason::DisallowedExtension(ext) => {
                write!(f, "extension `{ext}` is not allowed")
            }
            RejectReason::TooLarge { size, limit } => {
                write!(f, "file is {size} bytes, limit is {limit}")
            }
        }
    }
}

impl UploadPolicy {
    pub fn from_config(config: &UploadConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            image_extensions: lowercased(&config.image_extensions),
            document_extensions: lowercased(&config.document_extensions),
            audio_extensions: lowercased(&config.audio_extensions),
        }
    }

    /// Classify an extension into its kind bucket (`image`, `document`,
    /// `audio`), or `None` when the extension is not allowed at all.
    pub fn classify(&self, extension: &str) -> Option<&'static str> {
        let ext = extension.to_ascii_lowercase();
        if self.image_extensions.iter().any(|e| *e == ext) {
            Some("image")
        } else if self.document_extensions.iter().any(|e| *e == ext) {
            Some("document")
        } else if self.audio_extensions.iter().any(|e| *e == ext) {
            Some("audio")
        } else {
            None
        }
    }

    /// Validate one file. Returns `(kind, extension)` on acceptance.
    pub fn check(
        &self,
        filename: &str,
        size: u64,
    ) -> Result<(&'static str, String), RejectReason> {
        if filename.trim().is_empty() {
            return Err(RejectReason::EmptyFilename);
        }
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .ok_or(RejectReason::MissingExtension)?;

        let kind = self
            .classify(&extension)
            .ok_or_else(|| RejectReason::DisallowedExtension(extension.clone()))?;

        if size > self.max_file_size_bytes {
            return Err(RejectReason::TooLarge {
                size,
                limit: self.max_file_size_bytes,
            });
        }

        Ok((kind, extension))
    }
}

fn lowercased(extensions: &[String]) -> Vec<String> {
    extensions.iter().map(|e| e.to_ascii_lowercase()).collect()
}

/// Sanitize a user-provided filename: keep only safe characters.
///
/// Leading dots are stripped to prevent hidden files and path traversal
/// remnants.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized.to_string()
    }
}

// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment ingestion and storage pipeline.
//!
//! Uploaded files are validated against the configured policy, persisted
//! under `{uploads_dir}/{kind}/{uuid}.{ext}`, and described by stable
//! relative paths that messages reference via `file_path`. Per-file failures
//! never abort a batch, and already persisted files are not rolled back when
//! a later file fails.

pub mod policy;

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use atende_config::model::UploadConfig;
use atende_core::{AtendeError, FileDescriptor};

pub use policy::{sanitize_filename, RejectReason, UploadPolicy};

/// One file as received from the multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// One rejected file of a batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one multi-file upload.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct UploadBatch {
    pub uploaded: Vec<FileDescriptor>,
    pub errors: Vec<UploadFailure>,
}

/// Filesystem-backed attachment store.
pub struct AttachmentStore {
    root: PathBuf,
    policy: UploadPolicy,
}

impl AttachmentStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            policy: UploadPolicy::from_config(config),
        }
    }

    /// The uploads root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist a batch of uploads.
    ///
    /// Every file is validated and stored independently; the returned batch
    /// carries one descriptor per success and one failure entry per
    /// rejection. Only a filesystem error on the uploads root itself aborts
    /// the whole call.
    pub async fn store_batch(&self, files: Vec<UploadedFile>) -> Result<UploadBatch, AtendeError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AtendeError::Upload(format!("cannot create uploads dir: {e}")))?;

        let mut batch = UploadBatch::default();
        for file in files {
            match self.store_one(&file).await {
                Ok(descriptor) => batch.uploaded.push(descriptor),
                Err(reason) => {
                    warn!(filename = file.original_name.as_str(), %reason, "upload rejected");
                    batch.errors.push(UploadFailure {
                        filename: file.original_name,
                        reason,
                    });
                }
            }
        }
        Ok(batch)
    }

    async fn store_one(&self, file: &UploadedFile) -> Result<FileDescriptor, String> {
        let (kind, extension) = self
            .policy
            .check(&file.original_name, file.bytes.len() as u64)
            .map_err(|r| r.to_string())?;

        let kind_dir = self.root.join(kind);
        tokio::fs::create_dir_all(&kind_dir)
            .await
            .map_err(|e| format!("cannot create {kind} dir: {e}"))?;

        let stored_name = format!("{}.{extension}", uuid::Uuid::new_v4().simple());
        let absolute = kind_dir.join(&stored_name);
        tokio::fs::write(&absolute, &file.bytes)
            .await
            .map_err(|e| format!("write failed: {e}"))?;

        let relative = format!("{kind}/{stored_name}");
        debug!(path = relative.as_str(), "attachment stored");

        Ok(FileDescriptor {
            original_name: sanitize_filename(&file.original_name),
            file_path: relative,
            file_type: kind.to_string(),
        })
    }

    /// Read back a stored attachment by its relative path.
    ///
    /// Rejects absolute paths and any `..` component, then fails with
    /// `NotFound` when nothing is stored there. Returns the bytes plus a
    /// content type guessed from the extension.
    pub async fn open(&self, relative_path: &str) -> Result<(Vec<u8>, &'static str), AtendeError> {
        let rel = Path::new(relative_path);
        let traversal = rel.is_absolute()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if traversal {
            return Err(AtendeError::Validation(format!(
                "invalid file path `{relative_path}`"
            )));
        }

        let absolute = self.root.join(rel);
        let bytes = match tokio::fs::read(&absolute).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AtendeError::not_found("file", relative_path));
            }
            Err(e) => {
                return Err(AtendeError::Upload(format!("read failed: {e}")));
            }
        };

        let extension = relative_path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        Ok((bytes, content_type_for_extension(extension)))
    }
}

/// Map a file extension to a response content type.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

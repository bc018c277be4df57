use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use axum::{body::Bytes, extract::Multipart};
use gym_shared::ImagePolicy;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const PAYMENT_FOLDER: &str = "payments";
pub const PROMOTION_FOLDER: &str = "promotions";

/// Maximum image size (5MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Request body limit for upload routes: one image plus its text fields.
pub const MAX_UPLOAD_BODY: usize = MAX_IMAGE_SIZE + 64 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub root: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
        }
    }
}

/// An image received as a file field of a multipart form.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The text fields and file fields of one multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, ImageUpload>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(format!("Invalid multipart request: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(format!("Upload failed: {}", e)))?;
                    form.files.insert(name, ImageUpload { file_name, bytes });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(format!("Upload failed: {}", e)))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// A required, non-blank text field.
    pub fn text(&self, name: &str) -> AppResult<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::validation(format!("Missing field: {}", name)))
    }

    pub fn take_file(&mut self, name: &str) -> AppResult<ImageUpload> {
        self.files
            .remove(name)
            .ok_or_else(|| AppError::validation(format!("Missing file: {}", name)))
    }
}

/// Keeps uploaded images under one root, one folder per kind of upload.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(settings: &Settings) -> Self {
        Self {
            root: settings.root.clone(),
        }
    }

    /// Writes `upload` into `<root>/<folder>` under its own file name,
    /// stripped of any directory part.
    ///
    /// A name that is already taken gets a random prefix so an earlier
    /// upload is never overwritten.
    #[tracing::instrument(skip(self))]
    pub async fn store(
        &self,
        upload: &ImageUpload,
        folder: &str,
        policy: ImagePolicy,
    ) -> AppResult<PathBuf> {
        let file_name = Path::new(&upload.file_name)
            .file_name()
            .ok_or_else(|| AppError::validation("The image has no file name"))?;
        if !policy.accepts(Path::new(file_name)) {
            return Err(AppError::validation(format!(
                "A {} image must be one of: {}",
                policy,
                policy.extensions().join(", ")
            )));
        }
        if upload.bytes.is_empty() {
            return Err(AppError::validation("The image is empty"));
        }
        if upload.bytes.len() > MAX_IMAGE_SIZE {
            return Err(AppError::validation(format!(
                "The image is too large (max {}MB)",
                MAX_IMAGE_SIZE / 1024 / 1024
            )));
        }

        let folder = self.root.join(folder);
        tokio::fs::create_dir_all(&folder).await?;

        let mut destination = folder.join(file_name);
        if tokio::fs::try_exists(&destination).await? {
            destination = folder.join(format!(
                "{}-{}",
                Uuid::new_v4().simple(),
                file_name.to_string_lossy()
            ));
        }

        tokio::fs::write(&destination, &upload.bytes).await?;
        tracing::info!("Stored image at {}", destination.display());

        Ok(destination)
    }

    /// Best-effort removal of a stored image whose database row never made it.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Could not remove orphaned image {}: {}", path.display(), e);
        }
    }
}

//! Local handle for the hidden country's outline image.
//!
//! The fetched bytes are written to a file so a front end can address them by
//! path. The file lives until the handle is released or dropped.

use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{error::SilhouetteError, transport::SilhouettePayload};

#[derive(Debug)]
pub struct SilhouetteResource {
    file: NamedTempFile,
    content_type: Option<String>,
    byte_len: usize,
}

impl SilhouetteResource {
    pub fn materialize(dir: &Path, payload: SilhouettePayload) -> Result<Self, SilhouetteError> {
        if payload.bytes.is_empty() {
            return Err(SilhouetteError::EmptyPayload);
        }
        let content_type = payload
            .content_type
            .map(|raw| raw.split(';').next().unwrap_or_default().trim().to_string())
            .filter(|ct| !ct.is_empty());
        if let Some(ct) = &content_type {
            if !ct.starts_with("image/") {
                return Err(SilhouetteError::NotAnImage(ct.clone()));
            }
        }

        std::fs::create_dir_all(dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("silhouette-")
            .suffix(extension_for(content_type.as_deref()))
            .tempfile_in(dir)?;
        std::io::Write::write_all(&mut file, &payload.bytes)?;
        std::io::Write::flush(&mut file)?;

        debug!(
            "silhouette: materialized path={} bytes={}",
            file.path().display(),
            payload.bytes.len()
        );
        Ok(Self {
            file,
            content_type,
            byte_len: payload.bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Deletes the backing file, reporting failures that a drop would swallow.
    pub fn release(self) -> Result<(), SilhouetteError> {
        let path = self.file.path().to_path_buf();
        self.file.close()?;
        debug!("silhouette: released path={}", path.display());
        Ok(())
    }
}

fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some("image/png") | None => ".png",
        Some("image/jpeg") | Some("image/jpg") => ".jpg",
        Some("image/gif") => ".gif",
        Some("image/webp") => ".webp",
        Some("image/svg+xml") => ".svg",
        Some(_) => ".img",
    }
}

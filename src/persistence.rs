//! Image source and annotation store contracts
//!
//! Both sides are owned by the host; the core only calls through the traits.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::decode::ImageFormat;
use crate::domain::AnnotationRecord;

/// Raw bytes of an image plus the format inferred from its identifier
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

pub trait ImageSource {
    fn fetch<'a>(&'a self, image_id: &'a str) -> BoxFuture<'a, Result<FetchedImage>>;
}

/// Reads images from files below a root directory
pub struct DirectoryImageSource {
    root: PathBuf,
}

impl DirectoryImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an identifier below the root; ids that would leave it are refused
    fn resolve(&self, image_id: &str) -> Result<PathBuf> {
        let relative = Path::new(image_id);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes || image_id.is_empty() {
            anyhow::bail!("Image id escapes the source directory: {}", image_id);
        }
        Ok(self.root.join(relative))
    }
}

impl ImageSource for DirectoryImageSource {
    fn fetch<'a>(&'a self, image_id: &'a str) -> BoxFuture<'a, Result<FetchedImage>> {
        async move {
            let path = self.resolve(image_id)?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read image: {}", path.display()))?;
            Ok(FetchedImage {
                bytes,
                format: ImageFormat::from_path(image_id),
            })
        }
        .boxed()
    }
}

/// In-process image source
#[derive(Default)]
pub struct MemoryImageSource {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image_id: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(image_id.into(), bytes);
    }
}

impl ImageSource for MemoryImageSource {
    fn fetch<'a>(&'a self, image_id: &'a str) -> BoxFuture<'a, Result<FetchedImage>> {
        let found = self.images.get(image_id).cloned();
        async move {
            let bytes = found.with_context(|| format!("No such image: {}", image_id))?;
            Ok(FetchedImage {
                bytes,
                format: ImageFormat::from_path(image_id),
            })
        }
        .boxed()
    }
}

pub trait AnnotationStore {
    /// Replace the stored annotations of an image, returning the stored copies
    fn save(&self, image_id: &str, records: &[AnnotationRecord]) -> Result<Vec<AnnotationRecord>>;

    /// Annotations previously stored for an image; empty when none were
    fn load(&self, image_id: &str) -> Result<Vec<AnnotationRecord>>;
}

/// One pretty-printed JSON document per image
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Percent-encoded so distinct identifiers never share a file
    fn file_path(&self, image_id: &str) -> PathBuf {
        let mut name = String::with_capacity(image_id.len());
        for byte in image_id.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.') {
                name.push(char::from(byte));
            } else {
                name.push_str(&format!("%{:02X}", byte));
            }
        }
        self.dir.join(format!("{}.annotations.json", name))
    }
}

impl AnnotationStore for JsonFileStore {
    fn save(&self, image_id: &str, records: &[AnnotationRecord]) -> Result<Vec<AnnotationRecord>> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.file_path(image_id);
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write annotations: {}", path.display()))?;
        log::debug!("Saved {} annotations to {}", records.len(), path.display());
        Ok(records.to_vec())
    }

    fn load(&self, image_id: &str) -> Result<Vec<AnnotationRecord>> {
        let path = self.file_path(image_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read annotations: {}", path.display()))?;
        let records = serde_json::from_str(&json)
            .with_context(|| format!("Malformed annotations file: {}", path.display()))?;
        Ok(records)
    }
}

/// Keeps records in process for the lifetime of the store
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Vec<AnnotationRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnotationStore for MemoryStore {
    fn save(&self, image_id: &str, records: &[AnnotationRecord]) -> Result<Vec<AnnotationRecord>> {
        let mut map = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("Annotation store poisoned"))?;
        map.insert(image_id.to_string(), records.to_vec());
        Ok(records.to_vec())
    }

    fn load(&self, image_id: &str) -> Result<Vec<AnnotationRecord>> {
        let map = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("Annotation store poisoned"))?;
        Ok(map.get(image_id).cloned().unwrap_or_default())
    }
}

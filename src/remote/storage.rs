use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use url::Url;

use super::{RemoteError, RemoteResult};

/// URL prefix under which buckets are published.
pub const PUBLIC_PREFIX: &str = "/storage/v1/object/public";

#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    /// Overwrite an existing object at the same path.
    pub upsert: bool,
    pub content_type: String,
}

impl UploadOptions {
    pub fn jpeg(upsert: bool) -> Self {
        Self {
            upsert,
            content_type: "image/jpeg".to_string(),
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> RemoteResult<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Remove several objects in one request. Missing objects are ignored.
    async fn remove(&self, bucket: &str, paths: &[String]) -> RemoteResult<()>;
}

pub type DynObjectStorage = Arc<dyn ObjectStorage>;

/// Derive an object path back from its public URL.
///
/// Returns `None` when the URL does not parse or does not point into `bucket`.
pub fn storage_path_from_url(url: &str, bucket: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let marker = format!("/{bucket}/");
    let (_, path) = parsed.path().split_once(&marker)?;
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Objects kept as plain files under `<root>/<bucket>/<path>`.
pub struct FsObjectStorage {
    root: PathBuf,
    public_url: Url,
}

impl FsObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: Url) -> Self {
        Self {
            root: root.into(),
            public_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object to its file, refusing anything that escapes the bucket.
    pub fn object_path(&self, bucket: &str, path: &str) -> RemoteResult<PathBuf> {
        let relative = Path::new(path);
        let clean = !bucket.is_empty()
            && !bucket.contains(['/', '\\'])
            && bucket != ".."
            && !path.is_empty()
            && !path.contains('\\')
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(RemoteError::InvalidRequest(format!(
                "invalid object path: {bucket}/{path}"
            )));
        }
        Ok(self.root.join(bucket).join(relative))
    }

    pub async fn read(&self, bucket: &str, path: &str) -> RemoteResult<Option<Vec<u8>>> {
        let file = self.object_path(bucket, path)?;
        match tokio::fs::read(&file).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ObjectStorage for FsObjectStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        options: &UploadOptions,
    ) -> RemoteResult<()> {
        let file = self.object_path(bucket, path)?;
        if !options.upsert && tokio::fs::try_exists(&file).await? {
            return Err(RemoteError::UniqueViolation(format!(
                "object already exists: {bucket}/{path}"
            )));
        }
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, &data).await?;
        tracing::debug!(
            "Stored {}/{} ({} bytes, {})",
            bucket,
            path,
            data.len(),
            options.content_type
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}{}/{}/{}",
            self.public_url.as_str().trim_end_matches('/'),
            PUBLIC_PREFIX,
            bucket,
            path
        )
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> RemoteResult<()> {
        for path in paths {
            let file = self.object_path(bucket, path)?;
            match tokio::fs::remove_file(&file).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use object_store::{aws::AmazonS3Builder, path::Path as ObjectPath, ObjectStore};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::errors::{Result, SplitterError};

/// Reads single objects out of one bucket.
pub struct ObjectFetcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        ObjectFetcher {
            store,
            bucket: bucket.into(),
        }
    }

    /// S3 client configured from the usual `AWS_*` environment variables.
    pub fn from_env(bucket: &str) -> Result<Self> {
        let s3 = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::new(Arc::new(s3), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn not_found(&self, key: &str, e: object_store::Error) -> SplitterError {
        match e {
            object_store::Error::NotFound { .. } => SplitterError::ObjectNotFound {
                bucket: self.bucket.clone(),
                key: key.to_string(),
            },
            e => e.into(),
        }
    }

    /// Size of the object in bytes.
    pub async fn stat(&self, key: &str) -> Result<u64> {
        let meta = self
            .store
            .head(&ObjectPath::from(key))
            .await
            .map_err(|e| self.not_found(key, e))?;
        debug!(key, size = meta.size, "found object");
        Ok(meta.size as u64)
    }

    /// Streams the object into `destination`, reporting each chunk's length to `on_progress`.
    /// Returns the number of bytes written.
    pub async fn download<F>(&self, key: &str, destination: &Path, mut on_progress: F) -> Result<u64>
    where
        F: FnMut(u64),
    {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let object = self
            .store
            .get(&ObjectPath::from(key))
            .await
            .map_err(|e| self.not_found(key, e))?;
        let mut stream = object.into_stream();

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            on_progress(chunk.len() as u64);
        }
        file.flush().await?;

        info!(
            "Downloaded s3://{}/{} to {} ({} bytes)",
            self.bucket,
            key,
            destination.display(),
            written
        );
        Ok(written)
    }
}

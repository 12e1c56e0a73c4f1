// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use crate::storage::config::{StorageConfig, StorageType, DEFAULT_TIMEOUT_SECS};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::factory::StorageProviderFactory;
use crate::storage::provider::{
    BlobHandle, BlobMetadata, BlobStorage, ContainerHandle, DirectoryHandle, FileHandle,
    FileShareStorage, ShareHandle,
};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use std::future::Future;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Builder for constructing a `StorageOps` instance.
///
/// # Examples
///
/// ```no_run
/// use storage_quickstart::ops::StorageOps;
/// use storage_quickstart::storage::StorageConfig;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let token = CancellationToken::new();
/// let ops = StorageOps::builder(StorageConfig::memory())
///     .with_cancellation(token.clone())
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct StorageOpsBuilder {
    config: StorageConfig,
    cancellation: Option<CancellationToken>,
}

impl StorageOpsBuilder {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Token observed by every operation; cancelling it aborts the call in
    /// flight with `StorageError::Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the `StorageOps` instance.
    ///
    /// File share support is enabled for the in-memory backend and whenever a
    /// `share_path` option is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a storage provider cannot be initialized.
    pub async fn build(self) -> StorageResult<StorageOps> {
        self.config.warn_unknown_options();
        let blobs = StorageProviderFactory::blob_storage(self.config.clone()).await?;
        let shares = match self.config.storage_type {
            StorageType::Memory => {
                Some(StorageProviderFactory::file_share_storage(self.config.clone()).await?)
            }
            _ if self.config.get_option("share_path").is_some() => {
                Some(StorageProviderFactory::file_share_storage(self.config.clone()).await?)
            }
            _ => None,
        };

        info!(
            "Built storage operations for type={} shares={}",
            self.config.storage_type_str(),
            shares.is_some()
        );
        Ok(StorageOps {
            blobs,
            shares,
            cancellation: self.cancellation.unwrap_or_default(),
            timeout: self.config.operation_timeout(),
        })
    }
}

/// Storage operations facade.
///
/// Every call is logged, runs under the cancellation token and the
/// per-operation timeout, and reports failures as [`StorageError`]. Calls are
/// independent: nothing done by an earlier call is rolled back when a later
/// one fails.
pub struct StorageOps {
    blobs: Arc<dyn BlobStorage>,
    shares: Option<Arc<dyn FileShareStorage>>,
    cancellation: CancellationToken,
    timeout: Option<Duration>,
}

impl StorageOps {
    pub fn builder(config: StorageConfig) -> StorageOpsBuilder {
        StorageOpsBuilder::new(config)
    }

    /// Facade over already constructed providers, with the default timeout.
    pub fn new(blobs: Arc<dyn BlobStorage>, shares: Option<Arc<dyn FileShareStorage>>) -> Self {
        Self {
            blobs,
            shares,
            cancellation: CancellationToken::new(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Per-operation timeout; `None` disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_shares(&self) -> bool {
        self.shares.is_some()
    }

    /// `prefix` followed by a random v4 UUID.
    pub fn unique_container_name(prefix: &str) -> String {
        format!("{}{}", prefix, Uuid::new_v4())
    }

    pub fn blob_uri(&self, blob: &BlobHandle) -> String {
        self.blobs.blob_uri(blob)
    }

    /// Run `work` under the cancellation token and the operation timeout.
    async fn guarded<T, F>(&self, operation: &'static str, target: &str, work: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        let timeout = self.timeout;
        let timed = async {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(StorageError::TimedOut {
                        operation,
                        target: target.to_string(),
                        timeout: limit,
                    }),
                },
                None => work.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(StorageError::Cancelled {
                operation,
                target: target.to_string(),
            }),
            result = timed => result,
        }
    }

    fn share_storage(&self, operation: &'static str) -> StorageResult<&Arc<dyn FileShareStorage>> {
        self.shares.as_ref().ok_or_else(|| {
            StorageError::ConfigError(format!(
                "{} needs file share support (configure 'share_path')",
                operation
            ))
        })
    }

    /// Create a blob container.
    ///
    /// # Errors
    ///
    /// * `Conflict` - the container already exists
    /// * `ConfigError` - the name is not a valid container name
    pub async fn create_container(&self, name: &str) -> StorageResult<ContainerHandle> {
        info!("Creating container={}", name);
        self.guarded("create_container", name, self.blobs.create_container(name))
            .await
    }

    /// Upload a local file as a blob.
    ///
    /// The whole file is read before the upload starts. When `blob_name` is
    /// `None` the local file name is used.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the local file does not exist (target is the local path)
    /// * `Conflict` - the blob exists and `overwrite` is false
    pub async fn upload_object(
        &self,
        container: &ContainerHandle,
        local_path: impl AsRef<Path>,
        blob_name: Option<&str>,
        overwrite: bool,
    ) -> StorageResult<BlobHandle> {
        let local_path = local_path.as_ref();
        let path_str = local_path.display().to_string();
        let blob_name = match blob_name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    StorageError::ConfigError(format!(
                        "Cannot derive a blob name from '{}'",
                        path_str
                    ))
                })?,
        };

        info!(
            "Uploading local_file={} to container={} blob={} overwrite={}",
            path_str,
            container.name(),
            blob_name,
            overwrite
        );
        self.guarded("upload_object", &path_str, async {
            let data = tokio::fs::read(local_path)
                .await
                .map_err(|e| StorageError::from_io(e, "upload_object", path_str.as_str()))?;
            self.blobs
                .upload_blob(container, &blob_name, Bytes::from(data), overwrite)
                .await
        })
        .await
    }

    /// Lazily list the blobs of a container.
    ///
    /// Items produced after the cancellation token fires are replaced by
    /// `Cancelled`.
    pub fn list_objects<'a>(
        &'a self,
        container: &'a ContainerHandle,
    ) -> BoxStream<'a, StorageResult<BlobMetadata>> {
        info!("Listing blobs in container={}", container.name());
        let token = self.cancellation.clone();
        self.blobs
            .list_blobs(container)
            .map(move |item| {
                if token.is_cancelled() {
                    Err(StorageError::Cancelled {
                        operation: "list_objects",
                        target: container.name().to_string(),
                    })
                } else {
                    item
                }
            })
            .boxed()
    }

    /// Names of every blob in a container.
    pub async fn list_object_names(&self, container: &ContainerHandle) -> StorageResult<Vec<String>> {
        let names: Vec<String> = self
            .guarded(
                "list_objects",
                container.name(),
                self.list_objects(container)
                    .map_ok(|metadata| metadata.name)
                    .try_collect(),
            )
            .await?;

        for name in &names {
            debug!("Listed blob={} container={}", name, container.name());
        }
        Ok(names)
    }

    /// Download a blob into `destination`, returning the number of bytes written.
    ///
    /// The destination is created, or truncated, only once the first chunk has
    /// been received.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the destination's parent directory or the blob is missing
    pub async fn download_object(
        &self,
        blob: &BlobHandle,
        destination: impl AsRef<Path>,
    ) -> StorageResult<u64> {
        let destination = destination.as_ref();
        let dest_str = destination.display().to_string();
        let target = blob.to_string();
        info!("Downloading blob={} to local_file={}", target, dest_str);

        self.guarded("download_object", &target, async {
            let parent = match destination.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let parent_str = parent.display().to_string();
            let metadata = tokio::fs::metadata(parent)
                .await
                .map_err(|e| StorageError::from_io(e, "download_object", parent_str.as_str()))?;
            if !metadata.is_dir() {
                return Err(StorageError::not_found("download_object", parent_str));
            }

            let mut chunks = self.blobs.download_blob(blob).await?;
            let first = chunks.try_next().await?;

            let mut file = tokio::fs::File::create(destination)
                .await
                .map_err(|e| StorageError::from_io(e, "download_object", dest_str.as_str()))?;
            let mut written = 0u64;
            if let Some(chunk) = first {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            while let Some(chunk) = chunks.try_next().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;

            debug!("Downloaded blob={} bytes={}", target, written);
            Ok(written)
        })
        .await
    }

    pub async fn create_share(&self, name: &str) -> StorageResult<ShareHandle> {
        let shares = self.share_storage("create_share")?;
        info!("Creating share={}", name);
        self.guarded("create_share", name, shares.create_share(name))
            .await
    }

    pub async fn create_share_directory(
        &self,
        share: &ShareHandle,
        dir_name: &str,
    ) -> StorageResult<DirectoryHandle> {
        let shares = self.share_storage("create_share_directory")?;
        let target = format!("{}/{}", share.name(), dir_name);
        info!("Creating share directory={}", target);
        self.guarded(
            "create_share_directory",
            &target,
            shares.create_directory(share, dir_name),
        )
        .await
    }

    pub async fn create_share_file(
        &self,
        directory: &DirectoryHandle,
        file_name: &str,
        size_bytes: u64,
        overwrite: bool,
    ) -> StorageResult<FileHandle> {
        let shares = self.share_storage("create_share_file")?;
        let target = format!("{}/{}", directory, file_name);
        info!(
            "Creating share file={} size={} overwrite={}",
            target, size_bytes, overwrite
        );
        self.guarded(
            "create_share_file",
            &target,
            shares.create_file(directory, file_name, size_bytes, overwrite),
        )
        .await
    }

    pub async fn upload_file_range(
        &self,
        file: &FileHandle,
        range: Range<u64>,
        data: Bytes,
    ) -> StorageResult<()> {
        let shares = self.share_storage("upload_file_range")?;
        let target = file.to_string();
        debug!(
            "Uploading range={}..{} to share file={}",
            range.start, range.end, target
        );
        self.guarded(
            "upload_file_range",
            &target,
            shares.upload_range(file, range, data),
        )
        .await
    }

    /// Upload a local file into a share: the share and directory are created
    /// when missing, then a file of the local file's size is created and
    /// written in a single range.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the local file does not exist
    /// * `Conflict` - the share file exists and `overwrite` is false
    pub async fn upload_file_to_share(
        &self,
        share_name: &str,
        dir_name: &str,
        file_name: &str,
        local_path: impl AsRef<Path>,
        overwrite: bool,
    ) -> StorageResult<FileHandle> {
        self.share_storage("upload_file_to_share")?;
        let local_path = local_path.as_ref();
        let path_str = local_path.display().to_string();
        let data = self
            .guarded("upload_file_to_share", &path_str, async {
                tokio::fs::read(local_path)
                    .await
                    .map_err(|e| StorageError::from_io(e, "upload_file_to_share", path_str.as_str()))
            })
            .await?;

        let share = match self.create_share(share_name).await {
            Ok(share) => share,
            Err(e) if e.is_conflict() => ShareHandle::new(share_name),
            Err(e) => return Err(e),
        };
        let directory = match self.create_share_directory(&share, dir_name).await {
            Ok(directory) => directory,
            Err(e) if e.is_conflict() => DirectoryHandle::new(&share, dir_name),
            Err(e) => return Err(e),
        };

        let size = data.len() as u64;
        let file = self
            .create_share_file(&directory, file_name, size, overwrite)
            .await?;
        if size > 0 {
            self.upload_file_range(&file, 0..size, Bytes::from(data))
                .await?;
        }

        info!(
            "Uploaded local_file={} to share file={} size={}",
            path_str, file, size
        );
        Ok(file)
    }

    pub async fn read_share_file(&self, file: &FileHandle) -> StorageResult<Bytes> {
        let shares = self.share_storage("read_share_file")?;
        let target = file.to_string();
        self.guarded("read_share_file", &target, shares.read_file(file))
            .await
    }

    /// Delete a container and all of its blobs.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the container does not exist, including when it was
    ///   already deleted
    pub async fn delete_container(&self, container: &ContainerHandle) -> StorageResult<()> {
        info!("Deleting container={}", container.name());
        self.guarded(
            "delete_container",
            container.name(),
            self.blobs.delete_container(container),
        )
        .await
    }

    pub async fn delete_share(&self, share: &ShareHandle) -> StorageResult<()> {
        let shares = self.share_storage("delete_share")?;
        info!("Deleting share={}", share.name());
        self.guarded("delete_share", share.name(), shares.delete_share(share))
            .await
    }
}

impl std::fmt::Debug for StorageOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageOps")
            .field("shares", &self.shares.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    const HELLO: &str = "Hello, zhaoshuai!";

    async fn memory_ops() -> StorageOps {
        StorageOps::builder(StorageConfig::memory())
            .build()
            .await
            .unwrap()
    }

    fn write_local(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_mixed_case_container_name_rejected() {
        let ops = memory_ops().await;
        let result = ops.create_container("quickstartblobsABC").await;
        match result {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("quickstartblobsABC")),
            other => panic!("Expected ConfigError, got {other:?}"),
        }
        assert!(ops.create_container("quickstartblobsabc").await.is_ok());
    }

    #[tokio::test]
    async fn test_quickstart_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;

        let container = ops.create_container("quickstartblobsabc").await.unwrap();
        let source = write_local(&temp_dir, "quickstart-test.txt", HELLO.as_bytes());
        let blob = ops
            .upload_object(&container, &source, None, false)
            .await
            .unwrap();
        assert_eq!(blob.name(), "quickstart-test.txt");

        let names = ops.list_object_names(&container).await.unwrap();
        assert!(names.contains(&"quickstart-test.txt".to_string()));

        let destination = temp_dir.path().join("quickstart-testDOWNLOAD.txt");
        let written = ops.download_object(&blob, &destination).await.unwrap();
        assert_eq!(written, HELLO.len() as u64);
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), HELLO);

        ops.delete_container(&container).await.unwrap();
        let result = ops.list_object_names(&container).await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unique_container_names() {
        let a = StorageOps::unique_container_name("quickstartblobs");
        let b = StorageOps::unique_container_name("quickstartblobs");
        assert!(a.starts_with("quickstartblobs"));
        assert_ne!(a, b);

        let ops = memory_ops().await;
        assert!(ops.create_container(&a).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_existing_container_conflicts() {
        let ops = memory_ops().await;
        ops.create_container("dup-container").await.unwrap();
        let result = ops.create_container("dup-container").await;
        assert!(matches!(result, Err(StorageError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_upload_missing_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let container = ops.create_container("uploads").await.unwrap();
        let missing = temp_dir.path().join("absent.txt");

        match ops.upload_object(&container, &missing, None, true).await {
            Err(StorageError::NotFound { operation, target }) => {
                assert_eq!(operation, "upload_object");
                assert_eq!(target, missing.display().to_string());
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_overwrite_policy() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let container = ops.create_container("overwrites").await.unwrap();
        let first = write_local(&temp_dir, "first.txt", b"first");
        let second = write_local(&temp_dir, "second.txt", b"second");

        ops.upload_object(&container, &first, Some("blob.txt"), false)
            .await
            .unwrap();
        let result = ops
            .upload_object(&container, &second, Some("blob.txt"), false)
            .await;
        assert!(matches!(result, Err(StorageError::Conflict { .. })));

        let blob = ops
            .upload_object(&container, &second, Some("blob.txt"), true)
            .await
            .unwrap();
        let destination = temp_dir.path().join("out.txt");
        ops.download_object(&blob, &destination).await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_listing_matches_uploads() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let container = ops.create_container("listing").await.unwrap();
        let source = write_local(&temp_dir, "data.bin", &[1, 2, 3]);

        let expected: HashSet<String> = (0..5).map(|i| format!("blob-{i}.bin")).collect();
        for name in &expected {
            ops.upload_object(&container, &source, Some(name.as_str()), false)
                .await
                .unwrap();
        }

        let listed: HashSet<String> = ops
            .list_object_names(&container)
            .await
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(listed, expected);

        let sizes: Vec<u64> = ops
            .list_objects(&container)
            .map_ok(|metadata| metadata.size)
            .try_collect()
            .await
            .unwrap();
        assert!(sizes.iter().all(|size| *size == 3));
    }

    #[tokio::test]
    async fn test_download_missing_blob_leaves_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let container = ops.create_container("downloads").await.unwrap();
        let destination = temp_dir.path().join("never.txt");

        let result = ops
            .download_object(&container.blob("never-uploaded.txt"), &destination)
            .await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_download_into_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let container = ops.create_container("downloads").await.unwrap();
        let source = write_local(&temp_dir, "a.txt", b"a");
        let blob = ops
            .upload_object(&container, &source, None, false)
            .await
            .unwrap();

        let destination = temp_dir.path().join("missing-dir").join("a.txt");
        match ops.download_object(&blob, &destination).await {
            Err(StorageError::NotFound { operation, target }) => {
                assert_eq!(operation, "download_object");
                assert!(target.ends_with("missing-dir"));
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deleted_container_handle_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let container = ops.create_container("short-lived").await.unwrap();
        let source = write_local(&temp_dir, "a.txt", b"a");
        let blob = ops
            .upload_object(&container, &source, None, false)
            .await
            .unwrap();

        ops.delete_container(&container).await.unwrap();

        let upload = ops.upload_object(&container, &source, None, true).await;
        assert!(matches!(upload, Err(StorageError::NotFound { .. })));
        let download = ops
            .download_object(&blob, temp_dir.path().join("b.txt"))
            .await;
        assert!(matches!(download, Err(StorageError::NotFound { .. })));
        let again = ops.delete_container(&container).await;
        assert!(matches!(again, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_upload_file_to_share() {
        let temp_dir = TempDir::new().unwrap();
        let ops = memory_ops().await;
        let content = b"file share payload".to_vec();
        let source = write_local(&temp_dir, "payload.bin", &content);

        let file = ops
            .upload_file_to_share("sharetest", "sample-dir", "sample-file-rx", &source, false)
            .await
            .unwrap();
        assert_eq!(file.size(), content.len() as u64);
        assert_eq!(ops.read_share_file(&file).await.unwrap(), Bytes::from(content));

        // Share and directory are reused on a second upload.
        let result = ops
            .upload_file_to_share("sharetest", "sample-dir", "sample-file-rx", &source, false)
            .await;
        assert!(matches!(result, Err(StorageError::Conflict { .. })));
        assert!(ops
            .upload_file_to_share("sharetest", "sample-dir", "sample-file-rx", &source, true)
            .await
            .is_ok());

        ops.delete_share(&ShareHandle::new("sharetest"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_share_file_ranges() {
        let ops = memory_ops().await;
        let share = ops.create_share("ranges").await.unwrap();
        let directory = ops.create_share_directory(&share, "dir").await.unwrap();
        let file = ops
            .create_share_file(&directory, "file.bin", 8, false)
            .await
            .unwrap();

        ops.upload_file_range(&file, 2..5, Bytes::from_static(b"abc"))
            .await
            .unwrap();
        let result = ops
            .upload_file_range(&file, 6..10, Bytes::from_static(b"wxyz"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidRange { .. })));

        let content = ops.read_share_file(&file).await.unwrap();
        assert_eq!(&content[..], b"\0\0abc\0\0\0");
    }

    #[tokio::test]
    async fn test_shares_unavailable_without_share_path() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::local().with_option("path", temp_dir.path().to_str().unwrap());
        let ops = StorageOps::builder(config).build().await.unwrap();
        assert!(!ops.has_shares());

        let result = ops.create_share("sharetest").await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_operations() {
        let token = CancellationToken::new();
        let ops = StorageOps::builder(StorageConfig::memory())
            .with_cancellation(token.clone())
            .build()
            .await
            .unwrap();
        let container = ops.create_container("cancelled").await.unwrap();

        token.cancel();
        let result = ops.create_container("after-cancel").await;
        assert!(matches!(
            result,
            Err(StorageError::Cancelled {
                operation: "create_container",
                ..
            })
        ));
        let listed = ops.list_object_names(&container).await;
        assert!(matches!(listed, Err(StorageError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_operation_timeout() {
        let ops = memory_ops()
            .await
            .with_timeout(Some(Duration::from_millis(20)));
        let result: StorageResult<()> = ops
            .guarded("slow_operation", "target", std::future::pending())
            .await;
        match result {
            Err(StorageError::TimedOut {
                operation, timeout, ..
            }) => {
                assert_eq!(operation, "slow_operation");
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("Expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_backend_round_trip() {
        let root = TempDir::new().unwrap();
        let shares_root = TempDir::new().unwrap();
        let config = StorageConfig::local()
            .with_option("path", root.path().to_str().unwrap())
            .with_option("share_path", shares_root.path().to_str().unwrap());
        let ops = StorageOps::builder(config).build().await.unwrap();
        assert!(ops.has_shares());

        let container = ops.create_container("localblobs").await.unwrap();
        let source = write_local(&root, "source.txt", HELLO.as_bytes());
        let blob = ops
            .upload_object(&container, &source, Some("hello.txt"), false)
            .await
            .unwrap();
        let destination = root.path().join("hello-copy.txt");
        ops.download_object(&blob, &destination).await.unwrap();
        assert_eq!(std::fs::read_to_string(&destination).unwrap(), HELLO);
        assert!(ops.blob_uri(&blob).starts_with("file:///"));
    }
}

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

//! File share storage over an `object_store` root.
//!
//! Shares and directories exist only once their marker object has been
//! written, which gives them the explicit create step the file protocol
//! requires. Files are held as whole objects, so their size is capped at
//! [`MAX_STORE_FILE_SIZE`]; shares on disk use
//! [`MountedShareProvider`](super::mounted_share::MountedShareProvider).

use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use super::object_store::ObjectStoreProvider;
use super::provider::{
    validate_container_name, validate_object_name, DirectoryHandle, FileHandle,
    FileShareStorage, ShareHandle,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::TryStreamExt;
use futures::future;
use object_store::{
    path::Path as ObjectPath, ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload,
};
use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

const SHARE_MARKER: &str = ".share";
const DIRECTORY_MARKER: &str = ".directory";

/// Largest file an object-backed share holds. Every range upload rewrites the
/// whole object.
pub const MAX_STORE_FILE_SIZE: u64 = 64 * 1024 * 1024;

pub struct ObjectStoreShareProvider {
    pub config: StorageConfig,
    pub store: Arc<dyn ObjectStore>,
    pub base_path: String,
}

impl ObjectStoreShareProvider {
    /// Create a share provider over the store named by the `share_path` option,
    /// or in memory.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let (store, base_path) = ObjectStoreProvider::build_store(&config, "share_path")?;
        Ok(Self {
            config,
            store,
            base_path,
        })
    }

    fn share_marker(share: &str) -> ObjectPath {
        ObjectPath::from(format!("{}/{}", share, SHARE_MARKER))
    }

    fn directory_marker(share: &str, directory: &str) -> ObjectPath {
        ObjectPath::from(format!("{}/{}/{}", share, directory, DIRECTORY_MARKER))
    }

    fn file_path(file: &FileHandle) -> ObjectPath {
        ObjectPath::from(format!(
            "{}/{}/{}",
            file.share(),
            file.directory(),
            file.name()
        ))
    }

    async fn ensure_marker(
        &self,
        marker: &ObjectPath,
        operation: &'static str,
        target: &str,
    ) -> StorageResult<()> {
        self.store
            .head(marker)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::from_object_store(e, operation, target))
    }

    async fn put_marker(
        &self,
        marker: &ObjectPath,
        operation: &'static str,
        target: &str,
    ) -> StorageResult<()> {
        let opts = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };
        self.store
            .put_opts(marker, PutPayload::new(), opts)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::from_object_store(e, operation, target))
    }
}

/// Check a share directory or file name: a single path segment that does not
/// collide with a marker.
pub(crate) fn validate_share_segment(name: &str) -> StorageResult<()> {
    validate_object_name(name)?;
    if name.contains('/') || name.contains('\\') {
        return Err(StorageError::ConfigError(format!(
            "'{}' must be a single path segment",
            name
        )));
    }
    if name == SHARE_MARKER || name == DIRECTORY_MARKER {
        return Err(StorageError::ConfigError(format!(
            "Name '{}' is reserved",
            name
        )));
    }
    Ok(())
}

/// Check that `range` is non-empty and as long as the payload.
pub(crate) fn check_range(
    target: &str,
    range: &Range<u64>,
    payload_len: usize,
) -> StorageResult<()> {
    if range.start >= range.end || range.end - range.start != payload_len as u64 {
        return Err(StorageError::InvalidRange {
            target: target.to_string(),
            message: format!(
                "range {}..{} does not match payload of {} bytes",
                range.start, range.end, payload_len
            ),
        });
    }
    Ok(())
}

#[async_trait]
impl FileShareStorage for ObjectStoreShareProvider {
    async fn create_share(&self, name: &str) -> StorageResult<ShareHandle> {
        validate_container_name(name)?;
        self.put_marker(&Self::share_marker(name), "create_share", name)
            .await?;
        info!("Created share={} base_path={}", name, self.base_path);
        Ok(ShareHandle::new(name))
    }

    async fn create_directory(
        &self,
        share: &ShareHandle,
        dir_name: &str,
    ) -> StorageResult<DirectoryHandle> {
        validate_share_segment(dir_name)?;
        self.ensure_marker(
            &Self::share_marker(share.name()),
            "create_share_directory",
            share.name(),
        )
        .await?;

        let directory = DirectoryHandle::new(share, dir_name);
        self.put_marker(
            &Self::directory_marker(share.name(), dir_name),
            "create_share_directory",
            &directory.to_string(),
        )
        .await?;
        debug!("Created directory={}", directory);
        Ok(directory)
    }

    async fn create_file(
        &self,
        directory: &DirectoryHandle,
        file_name: &str,
        size: u64,
        overwrite: bool,
    ) -> StorageResult<FileHandle> {
        validate_share_segment(file_name)?;
        let file = FileHandle::new(directory, file_name, size);
        let target = file.to_string();

        self.ensure_marker(
            &Self::share_marker(directory.share()),
            "create_share_file",
            directory.share(),
        )
        .await?;
        self.ensure_marker(
            &Self::directory_marker(directory.share(), directory.path()),
            "create_share_file",
            &directory.to_string(),
        )
        .await?;

        if size > MAX_STORE_FILE_SIZE {
            return Err(StorageError::InvalidRange {
                target,
                message: format!(
                    "size {} exceeds the {} byte limit of object-backed shares",
                    size, MAX_STORE_FILE_SIZE
                ),
            });
        }
        let len = usize::try_from(size).map_err(|_| StorageError::InvalidRange {
            target: target.clone(),
            message: format!("size {} does not fit in memory", size),
        })?;
        let opts = PutOptions {
            mode: if overwrite {
                PutMode::Overwrite
            } else {
                PutMode::Create
            },
            ..Default::default()
        };
        self.store
            .put_opts(
                &Self::file_path(&file),
                PutPayload::from(vec![0u8; len]),
                opts,
            )
            .await
            .map_err(|e| StorageError::from_object_store(e, "create_share_file", &target))?;

        debug!("Created file={} size={}", file, size);
        Ok(file)
    }

    async fn upload_range(
        &self,
        file: &FileHandle,
        range: Range<u64>,
        data: Bytes,
    ) -> StorageResult<()> {
        let target = file.to_string();
        check_range(&target, &range, data.len())?;

        let path = Self::file_path(file);
        let current = self
            .store
            .get(&path)
            .await
            .map_err(|e| StorageError::from_object_store(e, "upload_file_range", &target))?
            .bytes()
            .await
            .map_err(|e| StorageError::from_object_store(e, "upload_file_range", &target))?;

        if range.end > current.len() as u64 {
            return Err(StorageError::InvalidRange {
                target,
                message: format!(
                    "range {}..{} exceeds file size {}",
                    range.start,
                    range.end,
                    current.len()
                ),
            });
        }

        let mut content = BytesMut::from(current.as_ref());
        content[range.start as usize..range.end as usize].copy_from_slice(&data);
        self.store
            .put_opts(
                &path,
                PutPayload::from(content.freeze()),
                PutOptions::default(),
            )
            .await
            .map_err(|e| StorageError::from_object_store(e, "upload_file_range", &target))?;

        debug!(
            "Uploaded range={}..{} into file={}",
            range.start, range.end, target
        );
        Ok(())
    }

    async fn read_file(&self, file: &FileHandle) -> StorageResult<Bytes> {
        let target = file.to_string();
        self.store
            .get(&Self::file_path(file))
            .await
            .map_err(|e| StorageError::from_object_store(e, "read_share_file", &target))?
            .bytes()
            .await
            .map_err(|e| StorageError::from_object_store(e, "read_share_file", &target))
    }

    async fn delete_share(&self, share: &ShareHandle) -> StorageResult<()> {
        let marker = Self::share_marker(share.name());
        self.ensure_marker(&marker, "delete_share", share.name())
            .await?;

        let prefix = ObjectPath::from(share.name());
        let locations: Vec<ObjectPath> = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location)
            .try_filter(|location| future::ready(location != &marker))
            .try_collect()
            .await
            .map_err(|e| StorageError::from_object_store(e, "delete_share", share.name()))?;

        for location in &locations {
            self.store.delete(location).await.map_err(|e| {
                StorageError::from_object_store(e, "delete_share", location.to_string())
            })?;
        }
        self.store
            .delete(&marker)
            .await
            .map_err(|e| StorageError::from_object_store(e, "delete_share", share.name()))?;

        info!(
            "Deleted share={} object_count={}",
            share.name(),
            locations.len()
        );
        Ok(())
    }
}

impl Debug for ObjectStoreShareProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FileShareStorage(type=object_store, provider={}, base_path={})",
            self.config.storage_type_str(),
            self.base_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_shares() -> ObjectStoreShareProvider {
        ObjectStoreShareProvider::new(StorageConfig::memory())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_share_directory_file_flow() {
        let shares = memory_shares().await;
        let share = shares.create_share("sharetest").await.unwrap();
        let dir = shares.create_directory(&share, "sample-dir").await.unwrap();
        let file = shares
            .create_file(&dir, "sample-file-rx", 11, false)
            .await
            .unwrap();

        assert_eq!(shares.read_file(&file).await.unwrap(), vec![0u8; 11]);

        shares
            .upload_range(&file, 0..11, Bytes::from_static(b"hello share"))
            .await
            .unwrap();
        assert_eq!(
            shares.read_file(&file).await.unwrap(),
            Bytes::from_static(b"hello share")
        );
    }

    #[tokio::test]
    async fn test_partial_ranges() {
        let shares = memory_shares().await;
        let share = shares.create_share("ranges").await.unwrap();
        let dir = shares.create_directory(&share, "d").await.unwrap();
        let file = shares.create_file(&dir, "f", 8, false).await.unwrap();

        shares
            .upload_range(&file, 4..8, Bytes::from_static(b"tail"))
            .await
            .unwrap();
        shares
            .upload_range(&file, 0..2, Bytes::from_static(b"he"))
            .await
            .unwrap();

        assert_eq!(
            shares.read_file(&file).await.unwrap().as_ref(),
            b"he\0\0tail"
        );
    }

    #[tokio::test]
    async fn test_range_outside_file_is_rejected() {
        let shares = memory_shares().await;
        let share = shares.create_share("bounds").await.unwrap();
        let dir = shares.create_directory(&share, "d").await.unwrap();
        let file = shares.create_file(&dir, "f", 4, false).await.unwrap();

        let result = shares
            .upload_range(&file, 2..6, Bytes::from_static(b"over"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidRange { .. })));

        let result = shares
            .upload_range(&file, 0..4, Bytes::from_static(b"short"))
            .await;
        assert!(matches!(result, Err(StorageError::InvalidRange { .. })));

        let result = shares.upload_range(&file, 2..2, Bytes::new()).await;
        assert!(matches!(result, Err(StorageError::InvalidRange { .. })));
    }

    #[tokio::test]
    async fn test_directory_must_exist_before_file() {
        let shares = memory_shares().await;
        let share = shares.create_share("nodir").await.unwrap();
        let phantom = DirectoryHandle::new(&share, "never-created");

        let err = shares
            .create_file(&phantom, "f", 1, false)
            .await
            .unwrap_err();
        match err {
            StorageError::NotFound { operation, target } => {
                assert_eq!(operation, "create_share_file");
                assert_eq!(target, "nodir/never-created");
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_share_must_exist_before_directory() {
        let shares = memory_shares().await;
        let err = shares
            .create_directory(&ShareHandle::new("ghost"), "d")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_upload_range_before_create_is_not_found() {
        let shares = memory_shares().await;
        let share = shares.create_share("nofile").await.unwrap();
        let dir = shares.create_directory(&share, "d").await.unwrap();
        let phantom = FileHandle::new(&dir, "missing", 3);

        let err = shares
            .upload_range(&phantom, 0..3, Bytes::from_static(b"abc"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_create_conflicts() {
        let shares = memory_shares().await;
        let share = shares.create_share("dupes").await.unwrap();
        assert!(shares.create_share("dupes").await.unwrap_err().is_conflict());

        let dir = shares.create_directory(&share, "d").await.unwrap();
        assert!(shares
            .create_directory(&share, "d")
            .await
            .unwrap_err()
            .is_conflict());

        shares.create_file(&dir, "f", 2, false).await.unwrap();
        assert!(shares
            .create_file(&dir, "f", 2, false)
            .await
            .unwrap_err()
            .is_conflict());
        let resized = shares.create_file(&dir, "f", 5, true).await.unwrap();
        assert_eq!(shares.read_file(&resized).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_reserved_and_nested_names() {
        let shares = memory_shares().await;
        let share = shares.create_share("names").await.unwrap();
        for bad in [".directory", ".share", "a/b", ""] {
            let result = shares.create_directory(&share, bad).await;
            assert!(
                matches!(result, Err(StorageError::ConfigError(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_share() {
        let shares = memory_shares().await;
        let share = shares.create_share("cleanup").await.unwrap();
        let dir = shares.create_directory(&share, "d").await.unwrap();
        let file = shares.create_file(&dir, "f", 1, false).await.unwrap();

        shares.delete_share(&share).await.unwrap();

        assert!(shares.read_file(&file).await.unwrap_err().is_not_found());
        assert!(shares
            .create_directory(&share, "d")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(shares.delete_share(&share).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_without_allocating() {
        let shares = memory_shares().await;
        let share = shares.create_share("big").await.unwrap();
        let dir = shares.create_directory(&share, "d").await.unwrap();

        let result = shares.create_file(&dir, "huge", 4u64 << 40, false).await;
        match result {
            Err(StorageError::InvalidRange { target, .. }) => assert_eq!(target, "big/d/huge"),
            other => panic!("Expected InvalidRange, got {other:?}"),
        }
        let result = shares
            .create_file(&dir, "just-over", MAX_STORE_FILE_SIZE + 1, false)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidRange { .. })));
    }
}

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

//! File shares on a mounted filesystem.
//!
//! Shares and directories are real directories under the `share_path` mount
//! point. Files are pre-sized with `set_len`, so a file of any size costs no
//! memory, and ranges are written in place.

use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use super::object_store::ObjectStoreProvider;
use super::provider::{
    validate_container_name, DirectoryHandle, FileHandle, FileShareStorage, ShareHandle,
};
use super::share::{check_range, validate_share_segment, MAX_STORE_FILE_SIZE};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::{Debug, Formatter};
use std::io::SeekFrom;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info};

pub struct MountedShareProvider {
    pub config: StorageConfig,
    pub root: PathBuf,
}

impl MountedShareProvider {
    /// Create a provider rooted at the `share_path` option.
    ///
    /// # Errors
    ///
    /// `ConfigError` when `share_path` is missing or is not an existing directory.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let root = ObjectStoreProvider::resolve_local_dir(&config, "share_path")?;
        info!("Mounted shares at root={}", root.display());
        Ok(Self { config, root })
    }

    fn share_dir(&self, share: &str) -> PathBuf {
        self.root.join(share)
    }

    fn directory_dir(&self, share: &str, directory: &str) -> PathBuf {
        self.share_dir(share).join(directory)
    }

    fn file_path(&self, file: &FileHandle) -> PathBuf {
        self.directory_dir(file.share(), file.directory())
            .join(file.name())
    }

    /// `NotFound` unless `path` is an existing directory.
    async fn ensure_dir(path: &Path, operation: &'static str, target: &str) -> StorageResult<()> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| StorageError::from_io(e, operation, target))?;
        if !meta.is_dir() {
            return Err(StorageError::NotFound {
                operation,
                target: target.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FileShareStorage for MountedShareProvider {
    async fn create_share(&self, name: &str) -> StorageResult<ShareHandle> {
        validate_container_name(name)?;
        fs::create_dir(self.share_dir(name))
            .await
            .map_err(|e| StorageError::from_io(e, "create_share", name))?;
        info!("Created share={} root={}", name, self.root.display());
        Ok(ShareHandle::new(name))
    }

    async fn create_directory(
        &self,
        share: &ShareHandle,
        dir_name: &str,
    ) -> StorageResult<DirectoryHandle> {
        validate_share_segment(dir_name)?;
        Self::ensure_dir(
            &self.share_dir(share.name()),
            "create_share_directory",
            share.name(),
        )
        .await?;

        let directory = DirectoryHandle::new(share, dir_name);
        fs::create_dir(self.directory_dir(share.name(), dir_name))
            .await
            .map_err(|e| {
                StorageError::from_io(e, "create_share_directory", directory.to_string())
            })?;
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

        Self::ensure_dir(
            &self.share_dir(directory.share()),
            "create_share_file",
            directory.share(),
        )
        .await?;
        Self::ensure_dir(
            &self.directory_dir(directory.share(), directory.path()),
            "create_share_file",
            &directory.to_string(),
        )
        .await?;

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let handle = options
            .open(self.file_path(&file))
            .await
            .map_err(|e| StorageError::from_io(e, "create_share_file", &target))?;
        handle
            .set_len(size)
            .await
            .map_err(|e| StorageError::from_io(e, "create_share_file", &target))?;

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

        let mut handle = OpenOptions::new()
            .write(true)
            .open(self.file_path(file))
            .await
            .map_err(|e| StorageError::from_io(e, "upload_file_range", &target))?;
        let len = handle
            .metadata()
            .await
            .map_err(|e| StorageError::from_io(e, "upload_file_range", &target))?
            .len();
        if range.end > len {
            return Err(StorageError::InvalidRange {
                target,
                message: format!(
                    "range {}..{} exceeds file size {}",
                    range.start, range.end, len
                ),
            });
        }

        handle
            .seek(SeekFrom::Start(range.start))
            .await
            .map_err(|e| StorageError::from_io(e, "upload_file_range", &target))?;
        handle
            .write_all(&data)
            .await
            .map_err(|e| StorageError::from_io(e, "upload_file_range", &target))?;
        handle
            .flush()
            .await
            .map_err(|e| StorageError::from_io(e, "upload_file_range", &target))?;

        debug!(
            "Uploaded range={}..{} into file={}",
            range.start, range.end, target
        );
        Ok(())
    }

    /// Read a whole file. Files above [`MAX_STORE_FILE_SIZE`] are refused with
    /// `InvalidRange` rather than read into memory.
    async fn read_file(&self, file: &FileHandle) -> StorageResult<Bytes> {
        let target = file.to_string();
        let path = self.file_path(file);
        let len = fs::metadata(&path)
            .await
            .map_err(|e| StorageError::from_io(e, "read_share_file", &target))?
            .len();
        if len > MAX_STORE_FILE_SIZE {
            return Err(StorageError::InvalidRange {
                target,
                message: format!(
                    "file of {} bytes exceeds the {} byte read limit",
                    len, MAX_STORE_FILE_SIZE
                ),
            });
        }
        fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| StorageError::from_io(e, "read_share_file", &target))
    }

    async fn delete_share(&self, share: &ShareHandle) -> StorageResult<()> {
        let dir = self.share_dir(share.name());
        Self::ensure_dir(&dir, "delete_share", share.name()).await?;
        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| StorageError::from_io(e, "delete_share", share.name()))?;
        info!("Deleted share={}", share.name());
        Ok(())
    }
}

impl Debug for MountedShareProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FileShareStorage(type=mounted, provider={}, root={})",
            self.config.storage_type_str(),
            self.root.display()
        )
    }
}

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

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Range;

use super::error::{StorageError, StorageResult};

/// Longest blob or file name the service accepts.
pub const MAX_OBJECT_NAME_LEN: usize = 1024;

/// Reference to a blob container. Holding one does not keep the container alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle {
    name: String,
}

impl ContainerHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to a blob inside this container; nothing is created remotely.
    pub fn blob(&self, blob_name: impl Into<String>) -> BlobHandle {
        BlobHandle {
            container: self.name.clone(),
            name: blob_name.into(),
        }
    }
}

impl Display for ContainerHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name)
    }
}

/// Reference to a single blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    container: String,
    name: String,
}

impl BlobHandle {
    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for BlobHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.container, self.name)
    }
}

/// Metadata about a blob returned by listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobMetadata {
    /// Blob name relative to its container
    pub name: String,

    /// Content length in bytes
    pub size: u64,

    /// Last modified timestamp (if available)
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShareHandle {
    name: String,
}

impl ShareHandle {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for ShareHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryHandle {
    share: String,
    path: String,
}

impl DirectoryHandle {
    pub(crate) fn new(share: &ShareHandle, path: impl Into<String>) -> Self {
        Self {
            share: share.name.clone(),
            path: path.into(),
        }
    }

    pub fn share(&self) -> &str {
        &self.share
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for DirectoryHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.share, self.path)
    }
}

/// Reference to a pre-sized file inside a share directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    share: String,
    directory: String,
    name: String,
    size: u64,
}

impl FileHandle {
    pub(crate) fn new(directory: &DirectoryHandle, name: impl Into<String>, size: u64) -> Self {
        Self {
            share: directory.share.clone(),
            directory: directory.path.clone(),
            name: name.into(),
            size,
        }
    }

    pub fn share(&self) -> &str {
        &self.share
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size declared when the file was created.
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Display for FileHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}/{}", self.share, self.directory, self.name)
    }
}

/// Blob service operations, one call per storage action.
///
/// Implementations delegate transfer, authentication and retries to their
/// client library.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Create a container.
    ///
    /// # Errors
    ///
    /// * `Conflict` - a container with this name already exists
    /// * `ConfigError` - the name is not a valid container name
    async fn create_container(&self, name: &str) -> StorageResult<ContainerHandle>;

    /// Upload `data` as blob `blob_name`.
    ///
    /// When `overwrite` is false and the blob exists the call fails with
    /// `Conflict`.
    async fn upload_blob(
        &self,
        container: &ContainerHandle,
        blob_name: &str,
        data: Bytes,
        overwrite: bool,
    ) -> StorageResult<BlobHandle>;

    /// Lazily list the blobs of a container.
    ///
    /// Each call starts a new listing. Order is whatever the service returns.
    fn list_blobs<'a>(
        &'a self,
        container: &'a ContainerHandle,
    ) -> BoxStream<'a, StorageResult<BlobMetadata>>;

    /// Stream the content of a blob.
    async fn download_blob(
        &self,
        blob: &BlobHandle,
    ) -> StorageResult<BoxStream<'static, StorageResult<Bytes>>>;

    /// Delete a container and every blob in it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the container does not exist (already deleted included)
    async fn delete_container(&self, container: &ContainerHandle) -> StorageResult<()>;

    /// Address of a blob, for display.
    fn blob_uri(&self, blob: &BlobHandle) -> String;
}

/// File share operations.
///
/// Unlike blobs, a file must be created with its final size before any byte
/// range is written into it.
#[async_trait]
pub trait FileShareStorage: Send + Sync {
    async fn create_share(&self, name: &str) -> StorageResult<ShareHandle>;

    /// Create a directory directly under the share root.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the share does not exist
    /// * `Conflict` - the directory already exists
    async fn create_directory(
        &self,
        share: &ShareHandle,
        dir_name: &str,
    ) -> StorageResult<DirectoryHandle>;

    /// Create a zero-filled file of `size` bytes.
    ///
    /// # Errors
    ///
    /// * `NotFound` - the share or directory does not exist
    /// * `Conflict` - the file exists and `overwrite` is false
    async fn create_file(
        &self,
        directory: &DirectoryHandle,
        file_name: &str,
        size: u64,
        overwrite: bool,
    ) -> StorageResult<FileHandle>;

    /// Write `data` at `range`.
    ///
    /// # Errors
    ///
    /// * `InvalidRange` - the range is empty, exceeds the file size, or its
    ///   length differs from the payload length
    /// * `NotFound` - the file does not exist
    async fn upload_range(
        &self,
        file: &FileHandle,
        range: Range<u64>,
        data: Bytes,
    ) -> StorageResult<()>;

    async fn read_file(&self, file: &FileHandle) -> StorageResult<Bytes>;

    async fn delete_share(&self, share: &ShareHandle) -> StorageResult<()>;
}

/// Check a container or share name: 3-63 characters of lowercase letters,
/// digits and single hyphens, starting and ending with a letter or digit.
pub fn validate_container_name(name: &str) -> StorageResult<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid = (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");
    if valid {
        Ok(())
    } else {
        Err(StorageError::ConfigError(format!(
            "Invalid container or share name '{}': use 3-63 lowercase letters, digits or single hyphens",
            name
        )))
    }
}

/// Check a blob, directory or file name.
///
/// Names are 1-1024 characters. Every `/`-separated segment must be non-empty
/// and neither `.` nor `..`, so a name maps to exactly one store location.
pub fn validate_object_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.len() > MAX_OBJECT_NAME_LEN {
        return Err(StorageError::ConfigError(format!(
            "Invalid object name '{}': must be 1-{} characters",
            name, MAX_OBJECT_NAME_LEN
        )));
    }
    if name.split('/').any(str::is_empty) {
        return Err(StorageError::ConfigError(format!(
            "Invalid object name '{}': empty path segments (leading, trailing or doubled '/') are not allowed",
            name
        )));
    }
    if name.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(StorageError::ConfigError(format!(
            "Invalid object name '{}': relative path segments are not allowed",
            name
        )));
    }
    Ok(())
}

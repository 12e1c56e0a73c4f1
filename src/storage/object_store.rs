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

use super::config::{StorageConfig, StorageType};
use super::error::{StorageError, StorageResult};
use super::provider::{
    validate_container_name, validate_object_name, BlobHandle, BlobMetadata, BlobStorage,
    ContainerHandle,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use object_store::{
    local::LocalFileSystem, memory::InMemory, path::Path as ObjectPath, ObjectStore,
    ObjectStoreExt, PutMode, PutOptions, PutPayload,
};
use percent_encoding::percent_decode_str;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Marker object that makes an (otherwise implicit) container prefix exist.
pub const CONTAINER_MARKER: &str = ".container";

/// Blob storage on top of an `object_store` backend.
///
/// Each container is a top-level prefix holding a [`CONTAINER_MARKER`] object.
/// The marker is written with `PutMode::Create`, so two racing
/// `create_container` calls cannot both succeed.
pub struct ObjectStoreProvider {
    pub config: StorageConfig,
    pub store: Arc<dyn ObjectStore>,
    pub base_path: String,
}

impl ObjectStoreProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The storage type is `azure` (served by `AzureBlobProvider`)
    /// * The local `path` option is missing or is not an existing directory
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let (store, base_path) = Self::build_store(&config, "path")?;

        Ok(Self {
            config,
            store,
            base_path,
        })
    }

    /// Wrap an existing store.
    pub fn with_store(
        config: StorageConfig,
        store: Arc<dyn ObjectStore>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            config,
            store,
            base_path: base_path.into(),
        }
    }

    /// Build the object store for a local or in-memory configuration.
    ///
    /// `path_option` names the option holding the local root directory.
    pub(crate) fn build_store(
        config: &StorageConfig,
        path_option: &str,
    ) -> StorageResult<(Arc<dyn ObjectStore>, String)> {
        match config.storage_type {
            StorageType::Local => Self::build_local_store(config, path_option),
            StorageType::Memory => Ok((Arc::new(InMemory::new()), "memory://".to_string())),
            StorageType::Azure => Err(StorageError::ConfigError(
                "Azure blob storage is served by the Azure provider, not object_store"
                    .to_string(),
            )),
        }
    }

    /// Build a local filesystem store rooted at [`Self::resolve_local_dir`].
    pub(crate) fn build_local_store(
        config: &StorageConfig,
        path_option: &str,
    ) -> StorageResult<(Arc<dyn ObjectStore>, String)> {
        let canonical_path = Self::resolve_local_dir(config, path_option)?;

        let store = LocalFileSystem::new_with_prefix(&canonical_path).map_err(|e| {
            StorageError::ConfigError(format!("Failed to create local store: {}", e))
        })?;

        let base_path_str = canonical_path.to_string_lossy().to_string();
        Ok((Arc::new(store), base_path_str))
    }

    /// Canonical form of the existing directory named by `path_option`.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The option named `path_option` is missing from configuration
    /// * The path cannot be canonicalized (doesn't exist or permission denied)
    /// * The path is not a directory
    pub(crate) fn resolve_local_dir(
        config: &StorageConfig,
        path_option: &str,
    ) -> StorageResult<PathBuf> {
        let path = config.get_option(path_option).ok_or_else(|| {
            StorageError::ConfigError(format!(
                "Local storage requires '{}' option",
                path_option
            ))
        })?;
        let base_path = PathBuf::from(path);

        // Canonicalize the path (handles both relative and absolute paths, resolves symlinks)
        let canonical_path = base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to resolve path '{}': {} (path must exist)",
                path, e
            ))
        })?;

        if !canonical_path.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Base path is not a directory: {}",
                canonical_path.display()
            )));
        }
        Ok(canonical_path)
    }

    fn marker_path(container: &ContainerHandle) -> ObjectPath {
        ObjectPath::from(format!("{}/{}", container.name(), CONTAINER_MARKER))
    }

    /// Store location of a blob. `ObjectPath::from` percent-encodes reserved
    /// characters in every segment.
    fn blob_path(blob: &BlobHandle) -> ObjectPath {
        ObjectPath::from(format!("{}/{}", blob.container(), blob.name()))
    }

    /// Blob name of a listed location: the container segment is dropped and
    /// the remaining segments are percent-decoded, inverting [`Self::blob_path`].
    fn blob_name(location: &ObjectPath) -> String {
        location
            .parts()
            .skip(1)
            .map(|part| percent_decode_str(part.as_ref()).decode_utf8_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Fail with `NotFound` unless the container marker exists.
    async fn ensure_container(
        &self,
        container: &ContainerHandle,
        operation: &'static str,
    ) -> StorageResult<()> {
        self.store
            .head(&Self::marker_path(container))
            .await
            .map(|_| ())
            .map_err(|e| StorageError::from_object_store(e, operation, container.name()))
    }
}

#[async_trait]
impl BlobStorage for ObjectStoreProvider {
    async fn create_container(&self, name: &str) -> StorageResult<ContainerHandle> {
        validate_container_name(name)?;
        let container = ContainerHandle::new(name);

        let opts = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };
        self.store
            .put_opts(&Self::marker_path(&container), PutPayload::new(), opts)
            .await
            .map_err(|e| StorageError::from_object_store(e, "create_container", name))?;

        info!("Created container={} base_path={}", name, self.base_path);
        Ok(container)
    }

    async fn upload_blob(
        &self,
        container: &ContainerHandle,
        blob_name: &str,
        data: Bytes,
        overwrite: bool,
    ) -> StorageResult<BlobHandle> {
        validate_object_name(blob_name)?;
        if blob_name == CONTAINER_MARKER {
            return Err(StorageError::ConfigError(format!(
                "Blob name '{}' is reserved",
                CONTAINER_MARKER
            )));
        }
        self.ensure_container(container, "upload_object").await?;

        let blob = container.blob(blob_name);
        let size = data.len();
        let opts = PutOptions {
            mode: if overwrite {
                PutMode::Overwrite
            } else {
                PutMode::Create
            },
            ..Default::default()
        };
        self.store
            .put_opts(&Self::blob_path(&blob), PutPayload::from(data), opts)
            .await
            .map_err(|e| StorageError::from_object_store(e, "upload_object", blob.to_string()))?;

        debug!("Uploaded blob={} size={} overwrite={}", blob, size, overwrite);
        Ok(blob)
    }

    fn list_blobs<'a>(
        &'a self,
        container: &'a ContainerHandle,
    ) -> BoxStream<'a, StorageResult<BlobMetadata>> {
        let prefix = ObjectPath::from(container.name());

        stream::once(self.ensure_container(container, "list_objects"))
            .map_ok(move |()| {
                self.store.list(Some(&prefix)).map(move |meta| {
                    let meta = meta.map_err(|e| {
                        StorageError::from_object_store(e, "list_objects", container.name())
                    })?;
                    Ok(BlobMetadata {
                        name: Self::blob_name(&meta.location),
                        size: meta.size,
                        last_modified: Some(meta.last_modified),
                    })
                })
            })
            .try_flatten()
            .try_filter(|meta| future::ready(meta.name != CONTAINER_MARKER))
            .boxed()
    }

    async fn download_blob(
        &self,
        blob: &BlobHandle,
    ) -> StorageResult<BoxStream<'static, StorageResult<Bytes>>> {
        self.ensure_container(&ContainerHandle::new(blob.container()), "download_object")
            .await?;

        let target = blob.to_string();
        let result = self
            .store
            .get(&Self::blob_path(blob))
            .await
            .map_err(|e| StorageError::from_object_store(e, "download_object", &target))?;

        Ok(result
            .into_stream()
            .map_err(move |e| StorageError::from_object_store(e, "download_object", &target))
            .boxed())
    }

    async fn delete_container(&self, container: &ContainerHandle) -> StorageResult<()> {
        self.ensure_container(container, "delete_container").await?;

        let marker = Self::marker_path(container);
        let prefix = ObjectPath::from(container.name());
        let locations: Vec<ObjectPath> = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location)
            .try_filter(|location| future::ready(location != &marker))
            .try_collect()
            .await
            .map_err(|e| {
                StorageError::from_object_store(e, "delete_container", container.name())
            })?;

        for location in &locations {
            self.store.delete(location).await.map_err(|e| {
                StorageError::from_object_store(e, "delete_container", location.to_string())
            })?;
        }
        // Marker last, so a failure above leaves the container addressable.
        self.store
            .delete(&marker)
            .await
            .map_err(|e| StorageError::from_object_store(e, "delete_container", container.name()))?;

        info!(
            "Deleted container={} blob_count={}",
            container.name(),
            locations.len()
        );
        Ok(())
    }

    fn blob_uri(&self, blob: &BlobHandle) -> String {
        fn fix_uri(storage_type: &StorageType, path: &str) -> String {
            if storage_type == &StorageType::Local {
                // Convert backslashes to forward slashes for Windows compatibility
                let path = path.replace('\\', "/");

                // Remove Windows extended-length path prefix added by canonicalize()
                let path = path.strip_prefix("//?/").unwrap_or(&path).to_string();

                let path_without_scheme = path.trim_start_matches('/');

                // file:// + / + path, for both /home/... and C:/...
                format!("file:///{}", path_without_scheme)
            } else {
                path.to_string()
            }
        }

        let fp = if self.base_path.ends_with('/') {
            format!("{}{}", self.base_path, Self::blob_path(blob))
        } else {
            format!("{}/{}", self.base_path, Self::blob_path(blob))
        };
        fix_uri(&self.config.storage_type, &fp)
    }
}

impl Debug for ObjectStoreProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BlobStorage(type=object_store, provider={}, base_path={})",
            self.config.storage_type_str(),
            self.base_path
        )
    }
}

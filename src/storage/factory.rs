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

use std::sync::Arc;

use super::azure::AzureBlobProvider;
use super::config::{StorageConfig, StorageType};
use super::error::{StorageError, StorageResult};
use super::object_store::ObjectStoreProvider;
use super::provider::{BlobStorage, FileShareStorage};
use super::mounted_share::MountedShareProvider;
use super::share::ObjectStoreShareProvider;

/// Factory for creating storage providers
pub struct StorageProviderFactory;

impl StorageProviderFactory {
    /// Create the blob provider for a configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<dyn BlobStorage>)` - Azure SDK client for `azure`, `object_store`
    ///   backend for `local` and `memory`
    /// * `Err(StorageError)` - If the provider cannot be created
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The Azure connection string is missing or invalid
    /// * The local `path` option is missing or not a directory
    pub async fn blob_storage(config: StorageConfig) -> StorageResult<Arc<dyn BlobStorage>> {
        match config.storage_type {
            StorageType::Azure => Ok(Arc::new(AzureBlobProvider::new(&config)?)),
            StorageType::Local | StorageType::Memory => {
                Ok(Arc::new(ObjectStoreProvider::new(config).await?))
            }
        }
    }

    /// Create the file share provider for a configuration.
    ///
    /// Azure and local file shares are directories under the mount point given
    /// by the `share_path` option. The memory backend keeps shares in an
    /// `object_store` with a capped file size.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when an `azure` or `local` configuration has no
    /// usable `share_path`.
    pub async fn file_share_storage(
        config: StorageConfig,
    ) -> StorageResult<Arc<dyn FileShareStorage>> {
        match config.storage_type {
            StorageType::Azure => {
                if config.get_option("share_path").is_none() {
                    return Err(StorageError::ConfigError(
                        "Azure file shares require the 'share_path' option (share mount point)"
                            .to_string(),
                    ));
                }
                Ok(Arc::new(MountedShareProvider::new(config).await?))
            }
            StorageType::Local => Ok(Arc::new(MountedShareProvider::new(config).await?)),
            StorageType::Memory => Ok(Arc::new(ObjectStoreShareProvider::new(config).await?)),
        }
    }
}

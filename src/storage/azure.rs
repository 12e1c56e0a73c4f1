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

//! Azure Blob Storage provider.
//!
//! Authentication, chunked transfer and retry policies are the SDK's; this
//! module only maps handles to SDK clients and SDK errors to [`StorageError`].

use super::config::{ConnectionString, Credential, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::provider::{
    validate_container_name, validate_object_name, BlobHandle, BlobMetadata, BlobStorage,
    ContainerHandle,
};
use async_trait::async_trait;
use azure_storage::{CloudLocation, StorageCredentials};
use azure_storage_blobs::prelude::*;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Default port of the local storage emulator's blob service.
const EMULATOR_BLOB_PORT: u16 = 10000;

#[derive(Clone)]
pub struct AzureBlobProvider {
    account_name: String,
    service_url: String,
    client: Arc<BlobServiceClient>,
}

impl AzureBlobProvider {
    /// Create a provider from the `connection_string` option.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The connection string is missing or malformed
    /// * The SAS token cannot be parsed
    /// * `BlobEndpoint` is not a loopback emulator address
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let connection_string = config.connection_string()?;
        Self::from_connection_string(&connection_string)
    }

    pub fn from_connection_string(connection_string: &ConnectionString) -> StorageResult<Self> {
        let account_name = connection_string.account_name.clone();
        let credentials = match &connection_string.credential {
            Credential::AccountKey(key) => {
                StorageCredentials::access_key(account_name.clone(), key.clone())
            }
            Credential::SasToken(token) => {
                StorageCredentials::sas_token(token.as_str()).map_err(|e| {
                    StorageError::ConfigError(format!("Invalid SharedAccessSignature: {}", e))
                })?
            }
        };

        let builder = match &connection_string.blob_endpoint {
            Some(endpoint) => {
                let url = Url::parse(endpoint)?;
                let host = url.host_str().ok_or_else(|| {
                    StorageError::ConfigError(format!("BlobEndpoint has no host: {}", endpoint))
                })?;
                if !Self::is_loopback(host) {
                    return Err(StorageError::ConfigError(format!(
                        "Custom BlobEndpoint is only supported for the local emulator, got {}",
                        host
                    )));
                }
                let location = CloudLocation::Emulator {
                    address: host.to_string(),
                    port: url.port().unwrap_or(EMULATOR_BLOB_PORT),
                };
                debug!("Using emulator blob endpoint={}", endpoint);
                ClientBuilder::with_location(location, credentials)
            }
            None => ClientBuilder::new(account_name.clone(), credentials),
        };

        info!(
            "Created Azure blob provider for account={}",
            connection_string.account_name
        );
        Ok(Self {
            account_name,
            service_url: connection_string.blob_service_url(),
            client: Arc::new(builder.blob_service_client()),
        })
    }

    fn is_loopback(host: &str) -> bool {
        matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }
}

#[async_trait]
impl BlobStorage for AzureBlobProvider {
    async fn create_container(&self, name: &str) -> StorageResult<ContainerHandle> {
        validate_container_name(name)?;
        self.client
            .container_client(name)
            .create()
            .await
            .map_err(|e| StorageError::from_azure(e, "create_container", name))?;

        info!("Created container={} account={}", name, self.account_name);
        Ok(ContainerHandle::new(name))
    }

    async fn upload_blob(
        &self,
        container: &ContainerHandle,
        blob_name: &str,
        data: Bytes,
        overwrite: bool,
    ) -> StorageResult<BlobHandle> {
        validate_object_name(blob_name)?;
        let blob = container.blob(blob_name);
        let target = blob.to_string();
        let blob_client = self
            .client
            .container_client(container.name())
            .blob_client(blob_name);

        // Block blob puts always replace; refuse up front when asked not to.
        if !overwrite {
            let exists = blob_client
                .exists()
                .await
                .map_err(|e| StorageError::from_azure(e, "upload_object", &target))?;
            if exists {
                return Err(StorageError::conflict("upload_object", target));
            }
        }

        let size = data.len();
        blob_client
            .put_block_blob(data)
            .await
            .map_err(|e| StorageError::from_azure(e, "upload_object", &target))?;

        debug!("Uploaded blob={} size={} overwrite={}", target, size, overwrite);
        Ok(blob)
    }

    fn list_blobs<'a>(
        &'a self,
        container: &'a ContainerHandle,
    ) -> BoxStream<'a, StorageResult<BlobMetadata>> {
        let target = container.name().to_string();
        self.client
            .container_client(container.name())
            .list_blobs()
            .into_stream()
            .map(move |page| {
                let items: Vec<StorageResult<BlobMetadata>> = match page {
                    Ok(page) => page
                        .blobs
                        .blobs()
                        .map(|blob| {
                            let modified = blob.properties.last_modified;
                            Ok(BlobMetadata {
                                name: blob.name.clone(),
                                size: blob.properties.content_length,
                                last_modified: chrono::DateTime::from_timestamp(
                                    modified.unix_timestamp(),
                                    modified.nanosecond(),
                                ),
                            })
                        })
                        .collect(),
                    Err(e) => vec![Err(StorageError::from_azure(
                        e,
                        "list_objects",
                        target.clone(),
                    ))],
                };
                stream::iter(items)
            })
            .flatten()
            .boxed()
    }

    async fn download_blob(
        &self,
        blob: &BlobHandle,
    ) -> StorageResult<BoxStream<'static, StorageResult<Bytes>>> {
        let target = blob.to_string();
        let chunk_target = target.clone();
        let mut chunks = self
            .client
            .container_client(blob.container())
            .blob_client(blob.name())
            .get()
            .into_stream()
            .then(move |response| {
                let target = chunk_target.clone();
                async move {
                    let response = response
                        .map_err(|e| StorageError::from_azure(e, "download_object", &target))?;
                    response
                        .data
                        .collect()
                        .await
                        .map_err(|e| StorageError::from_azure(e, "download_object", &target))
                }
            })
            .boxed();

        // Surface a missing blob here rather than on the caller's first poll.
        let first = chunks.try_next().await?;
        debug!(
            "Started download of blob={} first_chunk={}",
            target,
            first.as_ref().map_or(0, Bytes::len)
        );
        Ok(stream::iter(first.map(Ok)).chain(chunks).boxed())
    }

    async fn delete_container(&self, container: &ContainerHandle) -> StorageResult<()> {
        self.client
            .container_client(container.name())
            .delete()
            .await
            .map_err(|e| StorageError::from_azure(e, "delete_container", container.name()))?;

        info!(
            "Deleted container={} account={}",
            container.name(),
            self.account_name
        );
        Ok(())
    }

    fn blob_uri(&self, blob: &BlobHandle) -> String {
        format!("{}/{}/{}", self.service_url, blob.container(), blob.name())
    }
}

impl Debug for AzureBlobProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobProvider")
            .field("account_name", &self.account_name)
            .field("service_url", &self.service_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_core::error::ErrorKind;
    use azure_core::StatusCode;

    const KEY_CS: &str =
        "DefaultEndpointsProtocol=https;AccountName=quickstartacct;AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net";

    fn http_error(status: StatusCode, code: &str) -> azure_core::Error {
        azure_core::Error::message(
            ErrorKind::HttpResponse {
                status,
                error_code: Some(code.to_string()),
            },
            "service error",
        )
    }

    #[test]
    fn test_from_connection_string_with_key() {
        let cs = ConnectionString::parse(KEY_CS).unwrap();
        let provider = AzureBlobProvider::from_connection_string(&cs).unwrap();

        assert_eq!(provider.account_name(), "quickstartacct");
        let uri = provider.blob_uri(&ContainerHandle::new("quickstartblobs1").blob("a.txt"));
        assert_eq!(
            uri,
            "https://quickstartacct.blob.core.windows.net/quickstartblobs1/a.txt"
        );
    }

    #[test]
    fn test_from_config_requires_connection_string() {
        match AzureBlobProvider::new(&StorageConfig::azure()) {
            Err(StorageError::ConfigError(msg)) => {
                assert!(msg.contains("AZURE_STORAGE_CONNECTION_STRING"))
            }
            other => panic!("Expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_development_storage_uses_emulator() {
        let cs = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        let provider = AzureBlobProvider::from_connection_string(&cs).unwrap();
        let uri = provider.blob_uri(&ContainerHandle::new("c1").blob("b"));
        assert_eq!(uri, "http://127.0.0.1:10000/devstoreaccount1/c1/b");
    }

    #[test]
    fn test_remote_custom_endpoint_rejected() {
        let cs = ConnectionString::parse(
            "AccountName=acct;AccountKey=a2V5;BlobEndpoint=https://storage.example.com/acct",
        )
        .unwrap();
        let result = AzureBlobProvider::from_connection_string(&cs);
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let cs = ConnectionString::parse(KEY_CS).unwrap();
        let provider = AzureBlobProvider::from_connection_string(&cs).unwrap();
        let debug = format!("{:?}", provider);
        assert!(debug.contains("quickstartacct"));
        assert!(!debug.contains("c2VjcmV0LWtleQ=="));
    }

    #[test]
    fn test_azure_error_mapping() {
        let err = StorageError::from_azure(
            http_error(StatusCode::NotFound, "BlobNotFound"),
            "download_object",
            "c/b",
        );
        assert!(err.is_not_found());

        let err = StorageError::from_azure(
            http_error(StatusCode::Conflict, "ContainerAlreadyExists"),
            "create_container",
            "c",
        );
        assert!(err.is_conflict());

        let err = StorageError::from_azure(
            http_error(StatusCode::Forbidden, "AuthorizationFailure"),
            "list_objects",
            "c",
        );
        assert!(matches!(err, StorageError::PermissionDenied { .. }));

        let err = StorageError::from_azure(
            http_error(StatusCode::ServiceUnavailable, "ServerBusy"),
            "upload_object",
            "c/b",
        );
        assert!(err.is_transient());

        let err = StorageError::from_azure(
            azure_core::Error::message(ErrorKind::Io, "connection reset"),
            "upload_object",
            "c/b",
        );
        assert!(err.is_transient());
    }
}

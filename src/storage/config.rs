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

use super::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;
use tracing::warn;

/// Environment variable holding the storage account connection string.
pub const CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// Options understood by at least one provider.
pub const KNOWN_OPTIONS: [&str; 4] = ["connection_string", "path", "share_path", "timeout"];

/// Default per-operation timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1200;

const EMULATOR_ACCOUNT: &str = "devstoreaccount1";
const EMULATOR_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const EMULATOR_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Storage provider type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Azure Storage account reached through a connection string
    Azure,
    /// Local filesystem directory standing in for the account
    Local,
    /// Process-local in-memory store
    Memory,
}

/// Generic configuration for the storage providers
///
/// Provider-specific settings live in a string map so the same value can be
/// built from CLI flags, environment or a serialized file.
///
/// # Examples
///
/// ## Azure
/// ```
/// use storage_quickstart::storage::StorageConfig;
///
/// let config = StorageConfig::azure()
///     .with_option("connection_string", "AccountName=acct;AccountKey=a2V5");
/// ```
///
/// ## Local filesystem
/// ```
/// use storage_quickstart::storage::StorageConfig;
///
/// let config = StorageConfig::local()
///     .with_option("path", "/tmp/account")
///     .with_option("share_path", "/mnt/sharetest");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage provider type
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    /// Provider-specific configuration options
    ///
    /// Azure:
    /// - connection_string: account connection string
    /// - share_path: mount point of the file share root
    ///
    /// Local:
    /// - path: directory holding one sub-directory per container
    /// - share_path: directory holding one sub-directory per share
    ///
    /// All:
    /// - timeout: per-operation timeout in seconds ("0" or "disabled" turns it off)
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl StorageConfig {
    /// Create a new storage configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown storage type.
    pub fn new(storage_type: impl Into<String>) -> StorageResult<Self> {
        let storage_type_str = storage_type.into();
        let storage_type = match storage_type_str.to_lowercase().as_str() {
            "azure" => StorageType::Azure,
            "local" => StorageType::Local,
            "memory" | "mem" => StorageType::Memory,
            _ => {
                return Err(StorageError::ConfigError(format!(
                    "Unknown storage type: {}",
                    storage_type_str
                )))
            }
        };

        Ok(Self {
            storage_type,
            options: Self::default_options(),
        })
    }

    pub fn azure() -> Self {
        Self {
            storage_type: StorageType::Azure,
            options: Self::default_options(),
        }
    }

    pub fn local() -> Self {
        Self {
            storage_type: StorageType::Local,
            options: Self::default_options(),
        }
    }

    pub fn memory() -> Self {
        Self {
            storage_type: StorageType::Memory,
            options: Self::default_options(),
        }
    }

    /// Azure configuration from a connection string, validated eagerly.
    pub fn from_connection_string(connection_string: &str) -> StorageResult<Self> {
        ConnectionString::parse(connection_string)?;
        Ok(Self::azure().with_option("connection_string", connection_string))
    }

    /// Get default options for all storage types.
    pub fn default_options() -> HashMap<String, String> {
        [("timeout", DEFAULT_TIMEOUT_SECS.to_string())]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Add a configuration option (for method chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple configuration options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Per-operation timeout.
    ///
    /// `None` when the `timeout` option is "0" or "disabled". Unparseable
    /// values fall back to [`DEFAULT_TIMEOUT_SECS`].
    pub fn operation_timeout(&self) -> Option<Duration> {
        match self.options.get("timeout").map(String::as_str) {
            Some("0") | Some("disabled") => None,
            Some(value) => match value.parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    warn!(
                        "Invalid timeout option value={}, using default_secs={}",
                        value, DEFAULT_TIMEOUT_SECS
                    );
                    Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                }
            },
            None => Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Option keys no provider reads, sorted.
    pub fn unknown_options(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .options
            .keys()
            .map(String::as_str)
            .filter(|key| !KNOWN_OPTIONS.contains(key))
            .collect();
        unknown.sort_unstable();
        unknown
    }

    /// Log a warning for every option no provider reads.
    pub fn warn_unknown_options(&self) {
        for key in self.unknown_options() {
            warn!(
                "Ignoring unknown storage option={} for type={}",
                key,
                self.storage_type_str()
            );
        }
    }

    /// Parsed connection string, required for the Azure provider.
    pub fn connection_string(&self) -> StorageResult<ConnectionString> {
        let raw = self.options.get("connection_string").ok_or_else(|| {
            StorageError::ConfigError(format!(
                "Azure requires a connection string (set {})",
                CONNECTION_STRING_ENV
            ))
        })?;
        ConnectionString::parse(raw)
    }

    pub fn storage_type_str(&self) -> &str {
        match self.storage_type {
            StorageType::Azure => "azure",
            StorageType::Local => "local",
            StorageType::Memory => "memory",
        }
    }
}

impl Debug for StorageConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let options: HashMap<&str, &str> = self
            .options
            .iter()
            .map(|(k, v)| {
                if k == "connection_string" {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();
        f.debug_struct("StorageConfig")
            .field("storage_type", &self.storage_type)
            .field("options", &options)
            .finish()
    }
}

/// Read a required environment variable.
///
/// Meant to be called once at the process boundary; the value is then threaded
/// through configuration.
pub fn require_env(name: &str) -> StorageResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(StorageError::ConfigError(format!(
            "Environment variable {} is empty",
            name
        ))),
        Err(_) => Err(StorageError::ConfigError(format!(
            "Environment variable {} is not set",
            name
        ))),
    }
}

/// Credential material
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    AccountKey(String),
    SasToken(String),
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::AccountKey(_) => write!(f, "AccountKey(<redacted>)"),
            Credential::SasToken(_) => write!(f, "SasToken(<redacted>)"),
        }
    }
}

/// Parsed `Key=Value;...` storage account connection string.
///
/// Neither `Debug` nor `Display` renders the key or signature.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: String,
    pub credential: Credential,
    pub protocol: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub blob_endpoint: Option<String>,
    pub file_endpoint: Option<String>,
}

impl ConnectionString {
    /// Parse a connection string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the string is empty, has no `AccountName`, or
    /// carries neither `AccountKey` nor `SharedAccessSignature`.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StorageError::ConfigError(
                "Connection string is empty".to_string(),
            ));
        }

        let pairs: HashMap<&str, &str> = raw
            .split(';')
            .filter(|segment| !segment.trim().is_empty())
            .filter_map(|segment| segment.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        if pairs
            .get("UseDevelopmentStorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(Self {
                account_name: EMULATOR_ACCOUNT.to_string(),
                credential: Credential::AccountKey(EMULATOR_KEY.to_string()),
                protocol: Some("http".to_string()),
                endpoint_suffix: None,
                blob_endpoint: Some(EMULATOR_BLOB_ENDPOINT.to_string()),
                file_endpoint: None,
            });
        }

        let account_name = pairs
            .get("AccountName")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                StorageError::ConfigError(
                    "Invalid connection string: missing AccountName".to_string(),
                )
            })?
            .to_string();

        let credential = if let Some(key) = pairs.get("AccountKey").filter(|v| !v.is_empty()) {
            Credential::AccountKey(key.to_string())
        } else if let Some(sas) = pairs
            .get("SharedAccessSignature")
            .filter(|v| !v.is_empty())
        {
            Credential::SasToken(sas.trim_start_matches('?').to_string())
        } else {
            return Err(StorageError::ConfigError(
                "Invalid connection string: missing AccountKey or SharedAccessSignature"
                    .to_string(),
            ));
        };

        let owned = |key: &str| pairs.get(key).map(|v| v.to_string());
        Ok(Self {
            account_name,
            credential,
            protocol: owned("DefaultEndpointsProtocol"),
            endpoint_suffix: owned("EndpointSuffix"),
            blob_endpoint: owned("BlobEndpoint"),
            file_endpoint: owned("FileEndpoint"),
        })
    }

    /// Base URL of the blob service.
    pub fn blob_service_url(&self) -> String {
        if let Some(endpoint) = &self.blob_endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        format!(
            "{}://{}.blob.{}",
            self.protocol.as_deref().unwrap_or("https"),
            self.account_name,
            self.endpoint_suffix.as_deref().unwrap_or("core.windows.net")
        )
    }
}

impl Debug for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("credential", &self.credential)
            .field("blob_endpoint", &self.blob_endpoint)
            .field("file_endpoint", &self.file_endpoint)
            .finish()
    }
}

impl Display for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountName={};AccountKey=***", self.account_name)
    }
}

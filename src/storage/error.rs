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

use azure_core::error::ErrorKind as AzureErrorKind;
use azure_core::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Categorised variants carry the name of the operation that failed and the
/// identifier it was working on (container, blob, share path or local file).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {target} (during {operation})")]
    NotFound {
        operation: &'static str,
        target: String,
    },

    #[error("Conflict: {target} already exists (during {operation})")]
    Conflict {
        operation: &'static str,
        target: String,
    },

    #[error("Permission denied for {target} (during {operation}): {message}")]
    PermissionDenied {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("Transport error for {target} (during {operation}): {message}")]
    Transport {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("Invalid range for {target}: {message}")]
    InvalidRange { target: String, message: String },

    #[error("Cancelled: {operation} on {target}")]
    Cancelled {
        operation: &'static str,
        target: String,
    },

    #[error("Timed out after {timeout:?}: {operation} on {target}")]
    TimedOut {
        operation: &'static str,
        target: String,
        timeout: Duration,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub fn not_found(operation: &'static str, target: impl Into<String>) -> Self {
        StorageError::NotFound {
            operation,
            target: target.into(),
        }
    }

    pub fn conflict(operation: &'static str, target: impl Into<String>) -> Self {
        StorageError::Conflict {
            operation,
            target: target.into(),
        }
    }

    /// Classify a local filesystem error.
    pub fn from_io(err: std::io::Error, operation: &'static str, target: impl Into<String>) -> Self {
        let target = target.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound { operation, target },
            std::io::ErrorKind::AlreadyExists => StorageError::Conflict { operation, target },
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                operation,
                target,
                message: err.to_string(),
            },
            _ => StorageError::IoError(err),
        }
    }

    /// Classify an `object_store` error.
    pub fn from_object_store(
        err: object_store::Error,
        operation: &'static str,
        target: impl Into<String>,
    ) -> Self {
        let target = target.into();
        match err {
            object_store::Error::NotFound { .. } => StorageError::NotFound { operation, target },
            object_store::Error::AlreadyExists { .. } => {
                StorageError::Conflict { operation, target }
            }
            object_store::Error::PermissionDenied { .. }
            | object_store::Error::Unauthenticated { .. } => StorageError::PermissionDenied {
                operation,
                target,
                message: err.to_string(),
            },
            object_store::Error::Generic { .. } => StorageError::Transport {
                operation,
                target,
                message: err.to_string(),
            },
            other => StorageError::ObjectStoreError(other),
        }
    }

    /// Classify an Azure SDK error by the HTTP status the service answered with.
    pub fn from_azure(
        err: azure_core::Error,
        operation: &'static str,
        target: impl Into<String>,
    ) -> Self {
        let target = target.into();
        match err.kind() {
            AzureErrorKind::HttpResponse { status, .. } => match status {
                StatusCode::NotFound => StorageError::NotFound { operation, target },
                StatusCode::Conflict => StorageError::Conflict { operation, target },
                StatusCode::Unauthorized | StatusCode::Forbidden => {
                    StorageError::PermissionDenied {
                        operation,
                        target,
                        message: err.to_string(),
                    }
                }
                _ => StorageError::Transport {
                    operation,
                    target,
                    message: err.to_string(),
                },
            },
            AzureErrorKind::Credential => StorageError::PermissionDenied {
                operation,
                target,
                message: err.to_string(),
            },
            _ => StorageError::Transport {
                operation,
                target,
                message: err.to_string(),
            },
        }
    }

    /// Whether the failure may go away if the caller tries again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Transport { .. } | StorageError::TimedOut { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_error() {
        let error = StorageError::ConfigError("Invalid configuration".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: Invalid configuration"
        );
    }

    #[test]
    fn test_not_found_carries_context() {
        let error = StorageError::not_found("download_object", "quickstart/missing.txt");
        assert_eq!(
            error.to_string(),
            "Not found: quickstart/missing.txt (during download_object)"
        );
        assert!(error.is_not_found());
        assert!(!error.is_transient());
    }

    #[test]
    fn test_conflict_carries_context() {
        let error = StorageError::conflict("create_container", "quickstartblobs1");
        assert!(error.is_conflict());
        assert!(error.to_string().contains("quickstartblobs1"));
        assert!(error.to_string().contains("create_container"));
    }

    #[test]
    fn test_io_error_classification() {
        let err = StorageError::from_io(
            io::Error::new(io::ErrorKind::NotFound, "gone"),
            "upload_object",
            "./data/a.txt",
        );
        match err {
            StorageError::NotFound { operation, target } => {
                assert_eq!(operation, "upload_object");
                assert_eq!(target, "./data/a.txt");
            }
            _ => panic!("Expected NotFound variant"),
        }

        let err = StorageError::from_io(
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
            "download_object",
            "/root/x",
        );
        assert!(matches!(err, StorageError::PermissionDenied { .. }));

        let err = StorageError::from_io(io::Error::other("disk on fire"), "upload_object", "x");
        assert!(matches!(err, StorageError::IoError(_)));
    }

    #[test]
    fn test_object_store_error_classification() {
        let err = StorageError::from_object_store(
            object_store::Error::NotFound {
                path: "c/blob".to_string(),
                source: "missing".into(),
            },
            "download_object",
            "c/blob",
        );
        assert!(err.is_not_found());

        let err = StorageError::from_object_store(
            object_store::Error::AlreadyExists {
                path: "c/.container".to_string(),
                source: "exists".into(),
            },
            "create_container",
            "c",
        );
        assert!(err.is_conflict());

        let err = StorageError::from_object_store(
            object_store::Error::Generic {
                store: "test",
                source: "connection reset".into(),
            },
            "list_objects",
            "c",
        );
        assert!(err.is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let storage_error: StorageError = io_error.into();

        match storage_error {
            StorageError::IoError(_) => {
                assert!(storage_error.to_string().contains("IO error"));
            }
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_url_parse_error_conversion() {
        let url_error = url::ParseError::EmptyHost;
        let storage_error: StorageError = url_error.into();

        match storage_error {
            StorageError::UrlParseError(_) => {
                assert!(storage_error.to_string().contains("URL parse error"));
            }
            _ => panic!("Expected UrlParseError variant"),
        }
    }

    #[test]
    fn test_timed_out_is_transient() {
        let err = StorageError::TimedOut {
            operation: "upload_object",
            target: "c/b".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_error_debug() {
        let error = StorageError::ConfigError("test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("ConfigError"));
    }
}

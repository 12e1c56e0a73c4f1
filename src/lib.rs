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

//! # Storage Quickstart
//!
//! A small Rust library and CLI that walks through the basic operations of an
//! Azure Storage account: blob containers and blobs, and file shares with
//! pre-sized files written by byte range.
//!
//! ## Features
//!
//! - **Blob storage**: create containers, upload local files, list, download, delete
//! - **File shares**: create shares, directories and pre-sized files, upload byte ranges
//! - **Backends**: Azure Storage (connection string, including the local emulator),
//!   local filesystem and in-memory stores for offline runs and tests
//! - **Guarded calls**: every operation honours a cancellation token and a timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storage_quickstart::{Quickstart, QuickstartOptions, StorageConfig, StorageOps};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::from_connection_string(
//!     &std::env::var("AZURE_STORAGE_CONNECTION_STRING")?,
//! )?;
//!
//! let ops = StorageOps::builder(config).build().await?;
//! let report = Quickstart::new(ops, QuickstartOptions::default())
//!     .run(|_: &str| true)
//!     .await?;
//!
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```
//!
//! ### Local filesystem
//!
//! ```rust,no_run
//! use storage_quickstart::{StorageConfig, StorageOps};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let config = StorageConfig::local()
//!     .with_option("path", "./account")
//!     .with_option("share_path", "./shares");
//!
//! let ops = StorageOps::builder(config).build().await?;
//! let container = ops.create_container("quickstartblobs").await?;
//! let blob = ops.upload_object(&container, "./data/hello.txt", None, false).await?;
//! ops.download_object(&blob, "./data/helloDOWNLOAD.txt").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`storage`] - Provider traits, configuration, errors and backends
//! - [`ops`] - Storage operations facade with cancellation and timeouts
//! - [`quickstart`] - The demonstration sequence and its report

pub mod ops;
pub mod quickstart;
pub mod storage;

// Re-export commonly used types
pub use ops::StorageOps;
pub use quickstart::{Quickstart, QuickstartOptions, QuickstartReport};
pub use storage::{StorageConfig, StorageError, StorageResult};

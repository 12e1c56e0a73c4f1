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

//! Cloud storage abstraction layer
//!
//! Two provider traits cover the storage account: [`BlobStorage`] for
//! containers and blobs, [`FileShareStorage`] for shares, directories and
//! pre-sized files.
//!
//! The blob service is reached through the Azure SDK for real accounts and
//! through the `object_store` crate for the local filesystem and in-memory
//! stand-ins. File shares live as directories under the share's mount point,
//! or in an `object_store` for the in-memory backend.

pub mod azure;
pub mod config;
pub mod error;
pub mod factory;
pub mod mounted_share;
pub mod object_store;
pub mod provider;
pub mod share;

// Public exports
pub use config::{StorageConfig, StorageType};
pub use error::{StorageError, StorageResult};
pub use factory::StorageProviderFactory;
pub use provider::{
    BlobHandle, BlobMetadata, BlobStorage, ContainerHandle, DirectoryHandle, FileHandle,
    FileShareStorage, ShareHandle,
};

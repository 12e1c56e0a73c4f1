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

use super::report::QuickstartReport;
use crate::ops::StorageOps;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::provider::ShareHandle;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Prompt shown before cleanup starts.
pub const CLEANUP_PROMPT: &str = "Press enter to begin clean up";

/// Decides whether cleanup runs once the demo steps are done.
///
/// Any `FnMut(&str) -> bool` closure is a `Confirm`; it receives the prompt.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone)]
pub struct QuickstartOptions {
    /// Directory for the generated local file and its downloaded copy
    pub data_dir: PathBuf,
    /// Text written to the generated local file
    pub content: String,
    pub container_prefix: String,
    /// Local file uploaded to the file share; the share step is skipped when unset
    pub share_source: Option<PathBuf>,
    pub share_name: String,
    pub share_directory: String,
    pub share_file: String,
}

impl Default for QuickstartOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            content: "Hello, zhaoshuai!".to_string(),
            container_prefix: "quickstartblobs".to_string(),
            share_source: None,
            share_name: "sharetest".to_string(),
            share_directory: "sample-dir".to_string(),
            share_file: "sample-file-rx".to_string(),
        }
    }
}

/// The blob quickstart: create a container, upload a generated text file,
/// list the container, download the blob next to the original, optionally
/// upload a file to a share, then clean up on confirmation.
pub struct Quickstart {
    ops: StorageOps,
    options: QuickstartOptions,
}

impl Quickstart {
    pub fn new(ops: StorageOps, options: QuickstartOptions) -> Self {
        Self { ops, options }
    }

    pub fn ops(&self) -> &StorageOps {
        &self.ops
    }

    /// Run every step in order and stop at the first failure.
    ///
    /// Resources created before a failure are left in place.
    ///
    /// # Errors
    ///
    /// Returns the first `StorageError` raised by a storage call or a local
    /// file operation.
    pub async fn run<C: Confirm>(&self, mut confirm: C) -> StorageResult<QuickstartReport> {
        let run_timestamp = chrono::Utc::now().to_rfc3339();
        let container_name = StorageOps::unique_container_name(&self.options.container_prefix);
        let container = self.ops.create_container(&container_name).await?;

        let data_dir = &self.options.data_dir;
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| StorageError::from_io(e, "create_data_dir", data_dir.display().to_string()))?;
        let file_name = format!("quickstart{}.txt", Uuid::new_v4());
        let local_file = data_dir.join(&file_name);
        write_local(&local_file, &self.options.content).await?;

        let blob = self
            .ops
            .upload_object(&container, &local_file, Some(file_name.as_str()), true)
            .await?;
        let blob_uri = self.ops.blob_uri(&blob);
        info!("Uploaded to blob storage uri={}", blob_uri);

        let listed_blobs = self.ops.list_object_names(&container).await?;
        info!(
            "Listed container={} blobs={}",
            container.name(),
            listed_blobs.len()
        );

        let download_file = data_dir.join(file_name.replace(".txt", "DOWNLOAD.txt"));
        let downloaded_bytes = self.ops.download_object(&blob, &download_file).await?;

        let share_file = match &self.options.share_source {
            Some(source) => {
                let file = self
                    .ops
                    .upload_file_to_share(
                        &self.options.share_name,
                        &self.options.share_directory,
                        &self.options.share_file,
                        source,
                        true,
                    )
                    .await?;
                Some(file.to_string())
            }
            None => None,
        };

        let cleaned_up = confirm.confirm(CLEANUP_PROMPT);
        if cleaned_up {
            self.ops.delete_container(&container).await?;
            if share_file.is_some() {
                self.ops
                    .delete_share(&ShareHandle::new(self.options.share_name.as_str()))
                    .await?;
            }
            remove_local(&local_file).await?;
            remove_local(&download_file).await?;
            info!("Cleaned up container={} and local files", container.name());
        } else {
            info!("Skipped clean up for container={}", container.name());
        }

        Ok(QuickstartReport {
            container: container.name().to_string(),
            blob: blob.name().to_string(),
            blob_uri,
            listed_blobs,
            local_file: local_file.display().to_string(),
            download_file: download_file.display().to_string(),
            downloaded_bytes,
            share_file,
            cleaned_up,
            run_timestamp,
        })
    }
}

async fn write_local(path: &Path, content: &str) -> StorageResult<()> {
    tokio::fs::write(path, content)
        .await
        .map_err(|e| StorageError::from_io(e, "write_local_file", path.display().to_string()))
}

async fn remove_local(path: &Path) -> StorageResult<()> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| StorageError::from_io(e, "remove_local_file", path.display().to_string()))
}

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

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Outcome of a quickstart run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuickstartReport {
    pub container: String,
    pub blob: String,
    pub blob_uri: String,
    pub listed_blobs: Vec<String>,
    pub local_file: String,
    pub download_file: String,
    pub downloaded_bytes: u64,
    /// `share/directory/file` when a file share upload ran
    pub share_file: Option<String>,
    pub cleaned_up: bool,
    pub run_timestamp: String,
}

impl QuickstartReport {
    pub fn to_json(&self) -> Result<String, JsonError> {
        serde_json::to_string_pretty(self)
    }
}

impl Display for QuickstartReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "\n{}", "━".repeat(80))?;
        writeln!(f, " {:<60} {:>18}", "Storage Quickstart", self.run_timestamp)?;
        writeln!(f, "{}", "━".repeat(80))?;
        writeln!(f, " {:<20} {}", "Container", self.container)?;
        writeln!(f, " {:<20} {}", "Blob", self.blob)?;
        writeln!(f, " {:<20} {}", "Blob URI", self.blob_uri)?;
        writeln!(f, " {:<20} {}", "Local file", self.local_file)?;
        writeln!(
            f,
            " {:<20} {} ({} bytes)",
            "Downloaded to", self.download_file, self.downloaded_bytes
        )?;
        if let Some(share_file) = &self.share_file {
            writeln!(f, " {:<20} {}", "Share file", share_file)?;
        }

        writeln!(f)?;
        writeln!(f, " Blobs ({})", self.listed_blobs.len())?;
        writeln!(f, "{}", "━".repeat(80))?;
        for name in &self.listed_blobs {
            writeln!(f, "   {}", name)?;
        }

        writeln!(f, "{}", "━".repeat(80))?;
        let cleanup = if self.cleaned_up {
            "done"
        } else {
            "skipped"
        };
        writeln!(f, " {:<20} {}", "Clean up", cleanup)?;
        writeln!(f, "{}", "━".repeat(80))?;
        Ok(())
    }
}

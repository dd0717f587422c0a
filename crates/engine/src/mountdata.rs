// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reading the on-disk configuration record without mounting the target.

use shine_adapters::subprocess::{run_with_timeout, DUMP_TIMEOUT};
use shine_core::disk::{DiskError, MOUNT_DATA_PATH};
use std::path::Path;
use tokio::process::Command;

/// Dump `CONFIGS/mountdata` out of an unmounted backing file system.
///
/// Uses the `debugfs` dump command into a temporary file; the tool's exit
/// code is unreliable for missing files, so short or empty dumps are
/// reported by the record parser instead.
pub(crate) async fn dump_mount_data(dev: &Path) -> Result<Vec<u8>, DiskError> {
    let tmp = tempfile::Builder::new()
        .prefix("shine-dump-")
        .suffix("-mountdata")
        .tempfile()
        .map_err(|source| DiskError::Access {
            dev: dev.to_path_buf(),
            source,
        })?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(format!(
        "PATH=/usr/lib/lustre:$PATH debugfs -c -R 'dump /{} {}' '{}'",
        MOUNT_DATA_PATH,
        tmp.path().display(),
        dev.display()
    ));

    let output = run_with_timeout(cmd, DUMP_TIMEOUT, "mountdata dump")
        .await
        .map_err(|_| DiskError::DumpFailed {
            tool: "debugfs".to_string(),
            rc: -1,
        })?;
    let rc = output.status.code().unwrap_or(-1);
    if rc > 0 {
        return Err(DiskError::DumpFailed {
            tool: "debugfs".to_string(),
            rc,
        });
    }

    std::fs::read(tmp.path()).map_err(|source| DiskError::Access {
        dev: dev.to_path_buf(),
        source,
    })
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::disk::{RECORD_MAGIC, RECORD_SIZE};
use crate::probe::Procfs;
use std::io;
use std::path::PathBuf;
use tempfile::TempDir;

/// Fabricate a well-formed on-disk configuration record.
pub fn mount_data_record(fsname: &str, svname: &str, flags: u32) -> Vec<u8> {
    let mut data = vec![0u8; RECORD_SIZE];
    data[0..4].copy_from_slice(&RECORD_MAGIC.to_ne_bytes());
    data[20..24].copy_from_slice(&flags.to_ne_bytes());
    let fs = fsname.as_bytes();
    data[32..32 + fs.len()].copy_from_slice(fs);
    let sv = svname.as_bytes();
    data[96..96 + sv.len()].copy_from_slice(sv);
    data
}

/// A temporary kernel pseudo-file tree plus a [`Procfs`] pointing at it.
pub struct ProcfsFixture {
    pub dir: TempDir,
    pub procfs: Procfs,
}

impl ProcfsFixture {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let lustre = dir.path().join("fs/lustre");
        std::fs::create_dir_all(&lustre)?;
        let mounts = dir.path().join("mounts");
        std::fs::write(&mounts, "")?;
        let partitions = dir.path().join("partitions");
        std::fs::write(&partitions, "major minor  #blocks  name\n")?;
        let procfs = Procfs {
            lustre,
            mounts,
            partitions,
            lnet: dir.path().join("sys/lnet"),
        };
        Ok(Self { dir, procfs })
    }

    /// Register a started target: create
    /// `<lustre>/<driver>/<label>/mntdev` and, optionally,
    /// `recovery_status`.
    pub fn add_started_target(
        &self,
        label: &str,
        mntdev: &str,
        recovery: Option<&str>,
    ) -> io::Result<PathBuf> {
        let dir = self.procfs.lustre.join("osd").join(label);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("mntdev"), format!("{mntdev}\n"))?;
        if let Some(content) = recovery {
            std::fs::write(dir.join("recovery_status"), content)?;
        }
        Ok(dir)
    }

    /// Append an entry to the mount table.
    pub fn add_mount(&self, dev: &str, mountpoint: &str, fstype: &str) -> io::Result<()> {
        let line = format!("{dev} {mountpoint} {fstype} rw 0 0\n");
        let mut table = std::fs::read_to_string(&self.procfs.mounts)?;
        table.push_str(&line);
        std::fs::write(&self.procfs.mounts, table)
    }

    /// Append an entry to the partition table.
    pub fn add_partition(&self, name: &str, blocks: u64) -> io::Result<()> {
        let line = format!("   8        0   {blocks} {name}\n");
        let mut table = std::fs::read_to_string(&self.procfs.partitions)?;
        table.push_str(&line);
        std::fs::write(&self.procfs.partitions, table)
    }

    /// Mark the network stack as loaded.
    pub fn add_lnet(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.procfs.lnet)
    }
}

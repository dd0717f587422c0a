// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk target metadata: device sanity checks and the fixed
//! configuration record stored at `CONFIGS/mountdata`.

use crate::probe::Procfs;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Path of the configuration record inside the backing file system.
pub const MOUNT_DATA_PATH: &str = "CONFIGS/mountdata";

/// Magic number opening the on-disk record.
pub const RECORD_MAGIC: u32 = 0x1dd0_0001;

/// Total size of the on-disk record.
pub const RECORD_SIZE: usize = 12288;

// Record flag bits.
pub const FLAG_NEED_INDEX: u32 = 0x10;
pub const FLAG_VIRGIN: u32 = 0x20;
pub const FLAG_UPDATE: u32 = 0x40;
pub const FLAG_REWRITE: u32 = 0x80;
pub const FLAG_WRITECONF: u32 = 0x100;
pub const FLAG_UPGRADE14: u32 = 0x200;
pub const FLAG_PARAM: u32 = 0x400;

/// Errors raised while inspecting a backing device or its on-disk record.
#[derive(Debug, Error)]
pub enum DiskError {
    #[error("cannot access device {}: {source}", dev.display())]
    Access { dev: PathBuf, source: io::Error },
    #[error("unsupported device type: {}", .0.display())]
    UnsupportedDeviceType(PathBuf),
    #[error("failed to run '{tool}' to read {MOUNT_DATA_PATH} (rc={rc})")]
    DumpFailed { tool: String, rc: i32 },
    #[error("failed to read {MOUNT_DATA_PATH} for {}", .0.display())]
    Unreadable(PathBuf),
    #[error("unexpected EOF while reading {MOUNT_DATA_PATH}")]
    Truncated,
    #[error("bad magic in {MOUNT_DATA_PATH}: {found:#x}!={RECORD_MAGIC:#x}")]
    BadMagic { found: u32 },
    #[error("found service {svname} for fs '{fsname}'!='{expected}' on {}", dev.display())]
    FsnameMismatch {
        svname: String,
        fsname: String,
        expected: String,
        dev: PathBuf,
    },
    #[error("found service {svname}!={expected} for fs '{fsname}' on {}", dev.display())]
    SvnameMismatch {
        svname: String,
        expected: String,
        fsname: String,
        dev: PathBuf,
    },
}

/// Snapshot of a target's backing device and its on-disk record.
///
/// `is_block`/`size` are filled by [`Disk::device_check`]; the remaining
/// fields by [`Disk::check_mount_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub dev: PathBuf,
    #[serde(default)]
    pub is_block: bool,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fsname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svname: Option<String>,
    #[serde(default)]
    pub flags: u32,
}

impl Disk {
    pub fn new(dev: impl Into<PathBuf>) -> Self {
        Self {
            dev: dev.into(),
            ..Self::default()
        }
    }

    /// Copy the fields reconciled from a distant report. The device path is
    /// local knowledge and is left untouched.
    pub fn update_from(&mut self, other: &Disk) {
        self.is_block = other.is_block;
        self.size = other.size;
        self.fsname.clone_from(&other.fsname);
        self.svname.clone_from(&other.svname);
        self.flags = other.flags;
    }

    /// Device sanity check: only block devices and regular files are
    /// accepted. Fills `is_block` and `size`.
    pub fn device_check(&mut self, procfs: &Procfs) -> Result<(), DiskError> {
        let info = std::fs::metadata(&self.dev).map_err(|source| DiskError::Access {
            dev: self.dev.clone(),
            source,
        })?;

        let ftype = info.file_type();
        if is_block_device(&ftype) {
            self.is_block = true;
            self.size = partition_size(&procfs.partitions, &self.dev);
        } else if ftype.is_file() {
            self.is_block = false;
            self.size = info.len();
        } else {
            return Err(DiskError::UnsupportedDeviceType(self.dev.clone()));
        }
        Ok(())
    }

    /// Parse the fixed on-disk record and optionally verify the configured
    /// file system and service names.
    ///
    /// The record is host-endian; see `RECORD_SIZE` for the required length.
    pub fn check_mount_data(
        &mut self,
        data: &[u8],
        fsname_check: Option<&str>,
        svname_check: Option<&str>,
    ) -> Result<(), DiskError> {
        if data.is_empty() {
            return Err(DiskError::Unreadable(self.dev.clone()));
        }
        if data.len() < RECORD_SIZE {
            return Err(DiskError::Truncated);
        }

        let magic = read_u32(data, 0);
        if magic != RECORD_MAGIC {
            return Err(DiskError::BadMagic { found: magic });
        }

        // Record layout (all offsets fixed): magic, feature flags x3,
        // config_ver, flags, svindex, mount_type, fsname[64], svname[64].
        let flags = read_u32(data, 20);
        let fsname = cstr_field(&data[32..96]);
        let svname = cstr_field(&data[96..160]);

        if let Some(expected) = fsname_check {
            if fsname != expected {
                return Err(DiskError::FsnameMismatch {
                    svname,
                    fsname,
                    expected: expected.to_string(),
                    dev: self.dev.clone(),
                });
            }
        }
        if let Some(expected) = svname_check {
            if svname != expected {
                return Err(DiskError::SvnameMismatch {
                    svname,
                    expected: expected.to_string(),
                    fsname,
                    dev: self.dev.clone(),
                });
            }
        }

        self.fsname = Some(fsname);
        self.svname = Some(svname);
        self.flags = flags;
        Ok(())
    }

    pub fn has_need_index_flag(&self) -> bool {
        self.flags & FLAG_NEED_INDEX != 0
    }

    /// Never registered with the management service.
    pub fn has_first_time_flag(&self) -> bool {
        self.flags & FLAG_VIRGIN != 0
    }

    pub fn has_update_flag(&self) -> bool {
        self.flags & FLAG_UPDATE != 0
    }

    pub fn has_rewrite_flag(&self) -> bool {
        self.flags & FLAG_REWRITE != 0
    }

    /// Configuration logs must be regenerated for this file system.
    pub fn has_writeconf_flag(&self) -> bool {
        self.flags & FLAG_WRITECONF != 0
    }

    pub fn has_upgrade14_flag(&self) -> bool {
        self.flags & FLAG_UPGRADE14 != 0
    }

    pub fn has_param_flag(&self) -> bool {
        self.flags & FLAG_PARAM != 0
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    // The record is written in host byte order.
    u32::from_ne_bytes(raw)
}

/// Extract a zero-terminated string from a fixed-width field.
fn cstr_field(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(unix)]
fn is_block_device(ftype: &std::fs::FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    ftype.is_block_device()
}

#[cfg(not(unix))]
fn is_block_device(_ftype: &std::fs::FileType) -> bool {
    false
}

/// Size in bytes of a block device, looked up in the partition table.
/// Unknown devices report zero.
fn partition_size(partitions: &Path, dev: &Path) -> u64 {
    let Some(name) = dev.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return 0;
    };
    let Ok(table) = std::fs::read_to_string(partitions) else {
        return 0;
    };
    for line in table.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() > 1 && fields[fields.len() - 1] == name {
            if let Ok(blocks) = fields[fields.len() - 2].parse::<u64>() {
                return blocks * 1024;
            }
        }
    }
    0
}

#[cfg(test)]
#[path = "disk_tests.rs"]
mod tests;

//! Zip container codec for snapshots and their bundled state documents.
//!
//! Members are stored under the full path they were supplied with, deflated, with
//! the modification time pinned to the zip epoch so identical inputs produce
//! identical archives.

use crate::constants::{naming::COMPRESSED_EXTENSION, paths::ARTIFACT_MODE};
use crate::errors::{BackupError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Members larger than this need zip64 headers
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Write `<base>.zip` containing every member; returns the archive path
pub fn archive(base: &Path, members: &[PathBuf]) -> Result<PathBuf> {
    let mut archive_path = base.as_os_str().to_owned();
    archive_path.push(".");
    archive_path.push(COMPRESSED_EXTENSION);
    let archive_path = PathBuf::from(archive_path);

    if let Err(e) = write_archive(&archive_path, members) {
        if let Err(cleanup) = fs::remove_file(&archive_path) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove partial archive {}: {}",
                    archive_path.display(),
                    cleanup
                );
            }
        }
        return Err(e);
    }

    debug!(
        "Archived {} member(s) into {}",
        members.len(),
        archive_path.display()
    );
    Ok(archive_path)
}

fn write_archive(archive_path: &Path, members: &[PathBuf]) -> Result<()> {
    let file = File::create(archive_path).map_err(|e| BackupError::io(archive_path, e))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    for member in members {
        let source = File::open(member).map_err(|e| BackupError::io(member, e))?;
        let size = source
            .metadata()
            .map_err(|e| BackupError::io(member, e))?
            .len();

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(ARTIFACT_MODE)
            .large_file(size >= ZIP64_THRESHOLD);

        writer
            .start_file(member.to_string_lossy(), options)
            .map_err(|e| archive_error(archive_path, e))?;
        io::copy(&mut BufReader::new(source), &mut writer)
            .map_err(|e| BackupError::io(member, e))?;
    }

    let mut inner = writer.finish().map_err(|e| archive_error(archive_path, e))?;
    inner.flush().map_err(|e| BackupError::io(archive_path, e))?;
    Ok(())
}

/// Stream the member named exactly `member` to `destination` with owner-only permissions
pub fn extract_member(archive_path: &Path, member: &str, destination: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| BackupError::io(archive_path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| archive_error(archive_path, e))?;

    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(BackupError::NotFound(format!(
                "member [{}] in {}",
                member,
                archive_path.display()
            )))
        }
        Err(e) => return Err(archive_error(archive_path, e)),
    };

    let mut out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(ARTIFACT_MODE)
        .open(destination)
        .map_err(|e| BackupError::io(destination, e))?;
    io::copy(&mut entry, &mut out).map_err(|e| BackupError::io(destination, e))?;

    // Mode above only applies when the file is created
    crate::storage::local::harden_permissions(destination)?;
    Ok(())
}

fn archive_error(path: &Path, e: ZipError) -> BackupError {
    match e {
        ZipError::Io(source) => BackupError::io(path, source),
        other => BackupError::Archive {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

//! Archive extraction over a target directory, plus optional ownership
//! normalization of the restored tree.

use crate::utils::errors::{BackupError, Result};
use flate2::read::GzDecoder;
use nix::unistd::{chown, Gid, Uid};
use std::fs::{DirBuilder, File, Permissions};
use std::io::{self, BufReader};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Component, Path};
use tar::EntryType;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Unpack the tar.gz archive at `archive` over `target`.
///
/// Regular-file entries are written (overwriting any same-named file) with
/// their archived permission bits; missing parent directories are created
/// with `dir_mode`. Directory entries are skipped since parents are created
/// on demand. Entries of any other type are logged and skipped, but a
/// corrupt stream is fatal.
pub fn unpack(archive: &Path, target: &Path, dir_mode: u32) -> Result<()> {
    let file = File::open(archive)?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in archive.entries()? {
        let mut entry = entry?;
        let relative = entry.path()?.into_owned();
        if !is_safe_relative(&relative) {
            warn!(name = %relative.display(), "skipping entry with unsafe path");
            continue;
        }
        let dest = target.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                debug!(path = %dest.display(), "skipping directory entry");
            }
            EntryType::Regular => {
                if let Some(parent) = dest.parent() {
                    DirBuilder::new()
                        .recursive(true)
                        .mode(dir_mode)
                        .create(parent)?;
                }
                let mode = entry.header().mode()? & 0o7777;
                debug!(path = %dest.display(), size = entry.size(), "restoring file");
                let mut out = File::create(&dest)?;
                io::copy(&mut entry, &mut out)?;
                out.set_permissions(Permissions::from_mode(mode))?;
            }
            other => {
                warn!(
                    name = %relative.display(),
                    entry_type = ?other,
                    "skipping entry of unsupported type"
                );
            }
        }
    }

    Ok(())
}

/// Entry names must stay inside the target: relative, no parent components.
fn is_safe_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Set owner and group on every path under `root`, `root` itself included.
pub fn normalize_ownership(root: &Path, uid: u32, gid: u32) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(io::Error::from)?;
        chown(entry.path(), Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
            .map_err(|err| BackupError::Chown(format!("{}: {err}", entry.path().display())))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::archive;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn round_trip_restores_paths_contents_and_modes() -> std::io::Result<()> {
        let source = TempDir::new()?;
        fs::create_dir_all(source.path().join("nested/deep"))?;
        fs::write(source.path().join("top.txt"), b"top")?;
        fs::write(source.path().join("nested/deep/leaf.txt"), b"leaf")?;
        let script = source.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n")?;
        fs::set_permissions(&script, Permissions::from_mode(0o755))?;

        let staging = TempDir::new()?;
        let archive_path = staging.path().join("backup.tar.gz");
        archive::build(source.path(), &archive_path).unwrap();

        let target = TempDir::new()?;
        unpack(&archive_path, target.path(), 0o755).unwrap();

        assert_eq!(fs::read(target.path().join("top.txt"))?, b"top");
        assert_eq!(fs::read(target.path().join("nested/deep/leaf.txt"))?, b"leaf");
        let mode = fs::metadata(target.path().join("run.sh"))?.permissions().mode() & 0o7777;
        assert_eq!(mode, 0o755);
        Ok(())
    }

    #[test]
    fn overwrites_existing_files() -> std::io::Result<()> {
        let source = TempDir::new()?;
        fs::write(source.path().join("data.txt"), b"fresh")?;

        let staging = TempDir::new()?;
        let archive_path = staging.path().join("backup.tar.gz");
        archive::build(source.path(), &archive_path).unwrap();

        let target = TempDir::new()?;
        fs::write(target.path().join("data.txt"), b"stale")?;
        unpack(&archive_path, target.path(), 0o755).unwrap();

        assert_eq!(fs::read(target.path().join("data.txt"))?, b"fresh");
        Ok(())
    }

    #[test]
    fn creates_parents_with_configured_mode() -> std::io::Result<()> {
        let source = TempDir::new()?;
        fs::create_dir(source.path().join("sub"))?;
        fs::write(source.path().join("sub/file.txt"), b"x")?;

        let staging = TempDir::new()?;
        let archive_path = staging.path().join("backup.tar.gz");
        archive::build(source.path(), &archive_path).unwrap();

        let target = TempDir::new()?;
        unpack(&archive_path, target.path(), 0o700).unwrap();

        let mode = fs::metadata(target.path().join("sub"))?.permissions().mode() & 0o7777;
        assert_eq!(mode, 0o700);
        Ok(())
    }

    #[test]
    fn skips_unsupported_entries_and_continues() -> std::io::Result<()> {
        let staging = TempDir::new()?;
        let archive_path = staging.path().join("backup.tar.gz");

        let file = File::create(&archive_path)?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(EntryType::Symlink);
        link.set_size(0);
        builder.append_link(&mut link, "dangling", "/etc/passwd")?;

        let data = b"still here";
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "after.txt", &data[..])?;
        builder.into_inner()?.finish()?;

        let target = TempDir::new()?;
        unpack(&archive_path, target.path(), 0o755).unwrap();

        assert_eq!(fs::read(target.path().join("after.txt"))?, b"still here");
        assert!(!target.path().join("dangling").exists());
        Ok(())
    }

    #[test]
    fn rejects_parent_traversal_names() {
        assert!(!is_safe_relative(Path::new("../evil.txt")));
        assert!(!is_safe_relative(Path::new("ok/../../evil.txt")));
        assert!(is_safe_relative(Path::new("ok/fine.txt")));
        assert!(is_safe_relative(Path::new("./fine.txt")));
    }
}

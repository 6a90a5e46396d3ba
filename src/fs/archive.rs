//! Archive building: data directory tree to a gzip-compressed tar stream.

use crate::utils::errors::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Build a tar.gz archive at `dest` containing every regular file under
/// `root`. Entry names are paths relative to `root`; entry modes are the
/// source files' permission bits. Directories get no entries of their own.
///
/// The build is best-effort per file: an unreadable file or walk entry is
/// logged and skipped rather than sinking the whole backup. Symlinks and
/// special files are skipped with a warning.
pub fn build(root: &Path, dest: &Path) -> Result<()> {
    let out = File::create(dest)?;
    let encoder = GzEncoder::new(out, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable walk entry");
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            warn!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        match append_file(&mut builder, entry.path(), relative) {
            Ok(()) => debug!(name = %relative.display(), "added file"),
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "skipping unreadable file")
            }
        }
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    Ok(())
}

fn append_file(
    builder: &mut tar::Builder<GzEncoder<File>>,
    path: &Path,
    name: &Path,
) -> io::Result<()> {
    let mut file = File::open(path)?;
    builder.append_file(name, &mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn entries(archive: &Path) -> Vec<(String, u32)> {
        let mut found = Vec::new();
        let mut archive = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            found.push((
                entry.path().unwrap().display().to_string(),
                entry.header().mode().unwrap() & 0o7777,
            ));
        }
        found.sort();
        found
    }

    #[test]
    fn archives_regular_files_under_relative_names() -> std::io::Result<()> {
        let source = TempDir::new()?;
        fs::create_dir(source.path().join("sub"))?;
        fs::write(source.path().join("a.txt"), b"alpha")?;
        fs::write(source.path().join("sub/b.txt"), b"beta")?;

        let out = TempDir::new()?;
        let dest = out.path().join("backup.tar.gz");
        build(source.path(), &dest).unwrap();

        let names: Vec<String> = entries(&dest).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a.txt".to_string(), "sub/b.txt".to_string()]);
        Ok(())
    }

    #[test]
    fn preserves_permission_bits() -> std::io::Result<()> {
        let source = TempDir::new()?;
        let path = source.path().join("secret.txt");
        fs::write(&path, b"shh")?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640))?;

        let out = TempDir::new()?;
        let dest = out.path().join("backup.tar.gz");
        build(source.path(), &dest).unwrap();

        assert_eq!(entries(&dest), vec![("secret.txt".to_string(), 0o640)]);
        Ok(())
    }

    #[test]
    fn skips_symlinks() -> std::io::Result<()> {
        let source = TempDir::new()?;
        fs::write(source.path().join("real.txt"), b"data")?;
        std::os::unix::fs::symlink("real.txt", source.path().join("link.txt"))?;

        let out = TempDir::new()?;
        let dest = out.path().join("backup.tar.gz");
        build(source.path(), &dest).unwrap();

        let names: Vec<String> = entries(&dest).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["real.txt".to_string()]);
        Ok(())
    }

    #[test]
    fn empty_directories_are_not_archived() -> std::io::Result<()> {
        let source = TempDir::new()?;
        fs::create_dir(source.path().join("empty"))?;
        fs::write(source.path().join("file.txt"), b"x")?;

        let out = TempDir::new()?;
        let dest = out.path().join("backup.tar.gz");
        build(source.path(), &dest).unwrap();

        let names: Vec<String> = entries(&dest).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["file.txt".to_string()]);
        Ok(())
    }
}

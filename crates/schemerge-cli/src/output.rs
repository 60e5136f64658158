use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

/// Artifact file written under a temporary name.
///
/// Only a run that reaches `Done` renames it into place; an aborted run
/// removes it, so a partial artifact is never left at the final path.
pub struct PendingArtifact {
    path: PathBuf,
    tmp_path: PathBuf,
    writer: BufWriter<File>,
}

impl PendingArtifact {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }

        let tmp_path = temp_path(path)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer: BufWriter::new(file),
        })
    }

    pub fn writer(&mut self) -> &mut BufWriter<File> {
        &mut self.writer
    }

    /// Flush, sync and move the artifact to its final path.
    pub fn commit(self) -> io::Result<PathBuf> {
        let file = self.writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()?;
        std::fs::rename(&self.tmp_path, &self.path)?;
        Ok(self.path)
    }

    pub fn discard(self) -> io::Result<()> {
        drop(self.writer);
        match std::fs::remove_file(&self.tmp_path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid artifact path: {}", path.display()),
        )
    })?;
    Ok(path.with_file_name(format!("{}.tmp", file_name.to_string_lossy())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch() -> PathBuf {
        std::env::temp_dir().join(format!("schemerge_out_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn commit_moves_artifact_into_place() {
        let dir = scratch();
        let path = dir.join("merge.sql");

        let mut artifact = PendingArtifact::create(&path).unwrap();
        artifact.writer().write_all(b"SELECT 1;\n").unwrap();
        assert!(!path.exists());

        let written = artifact.commit().unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "SELECT 1;\n");
        assert!(!dir.join("merge.sql.tmp").exists());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn discard_leaves_nothing_behind() {
        let dir = scratch();
        let path = dir.join("merge.sql");

        let mut artifact = PendingArtifact::create(&path).unwrap();
        artifact.writer().write_all(b"partial").unwrap();
        artifact.discard().unwrap();

        assert!(!path.exists());
        assert!(!dir.join("merge.sql.tmp").exists());

        let _ = std::fs::remove_dir_all(dir);
    }
}

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use huebot_contracts::{HueError, Result};

/// Source of template bytes and sink for rendered output, keyed by image id.
pub trait BlobStore: Send + Sync {
    fn read_template(&self, id: &str) -> Result<Vec<u8>>;
    fn write_output(&self, id: &str, bytes: &[u8]) -> Result<()>;
}

/// Two local directories standing in for the input and output buckets.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl DirBlobStore {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.output_dir.join(checked_id(id)?))
    }
}

/// Ids are bare file names; anything that could walk out of the bucket directory is refused.
fn checked_id(id: &str) -> Result<&str> {
    let trimmed = id.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
    {
        return Err(HueError::blob(id, "not a plain file name"));
    }
    Ok(trimmed)
}

impl BlobStore for DirBlobStore {
    fn read_template(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.input_dir.join(checked_id(id)?);
        std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => HueError::blob(id, format!("{} not found", path.display())),
            _ => HueError::blob(id, format!("failed reading {}: {err}", path.display())),
        })
    }

    fn write_output(&self, id: &str, bytes: &[u8]) -> Result<()> {
        let path = self.output_path(id)?;
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|err| HueError::blob(id, format!("{}: {err}", self.output_dir.display())))?;
        std::fs::write(&path, bytes)
            .map_err(|err| HueError::blob(id, format!("failed writing {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use huebot_contracts::HueError;

    use super::{BlobStore, DirBlobStore};

    #[test]
    fn reads_inputs_and_writes_outputs() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blobs = DirBlobStore::new(temp.path().join("in"), temp.path().join("out"));
        std::fs::create_dir_all(blobs.input_dir())?;
        std::fs::write(blobs.input_dir().join("cat.png"), b"bytes")?;

        assert_eq!(blobs.read_template("cat.png")?, b"bytes".to_vec());
        blobs.write_output("cat.png", b"rendered")?;
        assert_eq!(std::fs::read(blobs.output_dir().join("cat.png"))?, b"rendered");
        Ok(())
    }

    #[test]
    fn missing_template_is_blob_unavailable() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blobs = DirBlobStore::new(temp.path(), temp.path().join("out"));
        assert!(matches!(
            blobs.read_template("nope.png"),
            Err(HueError::BlobUnavailable { .. })
        ));
        Ok(())
    }

    #[test]
    fn path_like_ids_are_refused() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let blobs = DirBlobStore::new(temp.path(), temp.path().join("out"));
        for id in ["", "..", "../secret.png", "a/b.png", "a\\b.png"] {
            assert!(
                matches!(blobs.read_template(id), Err(HueError::BlobUnavailable { .. })),
                "{id:?}"
            );
        }
        Ok(())
    }
}

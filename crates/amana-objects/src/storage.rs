use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::path::validate_entity_id;
use crate::{ObjectError, Result};

/// On-disk object store.
///
/// Each object is stored as a flat file at `{root}/{entity_id}`. Writes land
/// in a sibling `.part` file and are linked into place on success, so a
/// reader never sees a half-written object and a published object is never
/// replaced.
pub struct ObjectStorage {
    dir: PathBuf,
}

impl ObjectStorage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Object storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn file_path(&self, entity_id: &str) -> Result<PathBuf> {
        validate_entity_id(entity_id)?;
        Ok(self.dir.join(entity_id))
    }

    /// Start writing a new object. Fails if the object already exists.
    pub async fn begin_write(&self, entity_id: &str, max_size: u64) -> Result<ObjectWriter> {
        let final_path = self.file_path(entity_id)?;
        if fs::try_exists(&final_path).await? {
            return Err(ObjectError::AlreadyExists);
        }
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = final_path.with_extension(format!("{}.part", Uuid::new_v4().simple()));
        let file = fs::File::create(&tmp_path).await?;

        Ok(ObjectWriter {
            file,
            tmp_path,
            final_path,
            written: 0,
            max_size,
        })
    }

    pub async fn open(&self, entity_id: &str) -> Result<fs::File> {
        let path = self.file_path(entity_id)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ObjectError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, entity_id: &str) -> Result<()> {
        let path = self.file_path(entity_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted object {}", entity_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {} already gone", entity_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-progress object write. Call [`ObjectWriter::finish`] to publish the
/// object or [`ObjectWriter::abort`] to discard it.
pub struct ObjectWriter {
    file: fs::File,
    tmp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
    max_size: u64,
}

impl ObjectWriter {
    pub fn written(&self) -> u64 {
        self.written
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let next = self.written + data.len() as u64;
        if next > self.max_size {
            return Err(ObjectError::TooLarge {
                limit: self.max_size,
            });
        }
        self.file.write_all(data).await?;
        self.written = next;
        Ok(())
    }

    /// Flush and publish the object. Returns its size in bytes.
    ///
    /// Publishing hard-links the temp file onto the final path, which fails
    /// if another writer got there first. The temp file is removed whether
    /// or not publishing succeeds.
    pub async fn finish(mut self) -> Result<u64> {
        let published = self.publish().await;

        let Self {
            file,
            tmp_path,
            written,
            ..
        } = self;
        drop(file);
        remove_part_file(&tmp_path).await;

        published.map(|()| written)
    }

    async fn publish(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;

        match fs::hard_link(&self.tmp_path, &self.final_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ObjectError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn abort(self) {
        drop(self.file);
        remove_part_file(&self.tmp_path).await;
    }
}

async fn remove_part_file(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Failed to remove partial upload {}: {}", path.display(), e);
    }
}

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::db::UserId;
use crate::error::StorageError;
use crate::sanitize::secure_filename;

/// Extensions accepted for upload, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["xls", "xlsx", "csv"];

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Durable storage for uploaded spreadsheets under
/// `<root>/<user_id>/<batch_name>/<filename>`.
#[derive(Debug, Clone)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one batch of a user.
    pub fn batch_dir(&self, user_id: UserId, batch_name: &str) -> Result<PathBuf, StorageError> {
        let batch = secure_filename(batch_name)
            .ok_or_else(|| StorageError::InvalidName(batch_name.to_string()))?;
        Ok(self.root.join(user_id.to_string()).join(batch))
    }

    /// Writes `content` and returns the path it was saved at.
    ///
    /// The filename is sanitized and must carry an allowed extension. An
    /// existing file is never overwritten; `_2`, `_3`, ... is appended to the
    /// stem instead.
    pub async fn save(
        &self,
        user_id: UserId,
        batch_name: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let safe_name =
            secure_filename(filename).ok_or_else(|| StorageError::InvalidName(filename.to_string()))?;
        let extension = allowed_extension(&safe_name)?;

        let dir = self.batch_dir(user_id, batch_name)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: dir.clone(),
                source: e,
            })?;

        let stem = &safe_name[..safe_name.len() - extension.len() - 1];
        let path = create_unique(&dir, stem, &extension, content).await?;

        log::debug!(
            "Saved upload {} ({} bytes) for user {}",
            path.display(),
            content.len(),
            user_id
        );
        Ok(path)
    }
}

/// Lowercased extension of `filename` if it is accepted.
pub fn allowed_extension(filename: &str) -> Result<String, StorageError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(StorageError::UnsupportedType(extension))
    }
}

async fn create_unique(
    dir: &Path,
    stem: &str,
    extension: &str,
    content: &[u8],
) -> Result<PathBuf, StorageError> {
    for counter in 1..=MAX_NAME_ATTEMPTS {
        let candidate = if counter == 1 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}_{}.{}", stem, counter, extension)
        };
        let path = dir.join(&candidate);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                let written = async {
                    file.write_all(content).await?;
                    file.sync_all().await
                }
                .await;
                if let Err(e) = written {
                    let _ = tokio::fs::remove_file(&path).await;
                    return Err(StorageError::WriteFile { path, source: e });
                }
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(StorageError::WriteFile { path, source: e }),
        }
    }

    Err(StorageError::FileExists(
        dir.join(format!("{}.{}", stem, extension)),
    ))
}

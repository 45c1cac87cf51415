use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::StorageError;

/// Upload written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Name the file was stored under. Differs from the client's name when
    /// an upload with that name already existed.
    pub filename: String,
    pub path: PathBuf,
}

/// Filesystem layout for uploads and generated artifacts.
///
/// Uploads live flat under `uploads_dir`; artifacts live under
/// `artifacts_dir/<job_id>/<type>.md`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    uploads_dir: PathBuf,
    artifacts_dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(uploads_dir: P, artifacts_dir: Q) -> Self {
        Self {
            uploads_dir: uploads_dir.as_ref().to_path_buf(),
            artifacts_dir: artifacts_dir.as_ref().to_path_buf(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.uploads_dir, &settings.artifacts_dir)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// Stores upload bytes under the final component of `filename`.
    ///
    /// Existing uploads are never overwritten; a numbered variant
    /// (`project_2.zip`) is chosen instead.
    pub fn save_upload(&self, filename: &str, content: &[u8]) -> Result<StoredUpload, StorageError> {
        let name = upload_name(filename)
            .ok_or_else(|| StorageError::InvalidName(filename.to_string()))?;

        self.ensure_directory(&self.uploads_dir)?;
        let path = self.store_with_atomic_creation(&self.uploads_dir, name, content)?;

        let stored_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name)
            .to_string();

        log::debug!("Stored upload {} ({} bytes)", stored_name, content.len());

        Ok(StoredUpload {
            filename: stored_name,
            path,
        })
    }

    /// Opens an upload for reading.
    pub fn open_upload(&self, path: &Path) -> Result<File, StorageError> {
        File::open(path).map_err(|e| StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Returns the job's artifact directory, creating it if needed.
    pub fn job_dir(&self, job_id: &str) -> Result<PathBuf, StorageError> {
        let job_id =
            safe_component(job_id).ok_or_else(|| StorageError::InvalidName(job_id.to_string()))?;
        let dir = self.artifacts_dir.join(job_id);
        self.ensure_directory(&dir)?;
        Ok(dir)
    }

    /// Writes an artifact file, replacing any earlier version.
    pub fn write_artifact(
        &self,
        job_id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<PathBuf, StorageError> {
        let file_name = safe_component(file_name)
            .ok_or_else(|| StorageError::InvalidName(file_name.to_string()))?;
        let path = self.job_dir(job_id)?.join(file_name);

        std::fs::write(&path, content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    /// Locates an existing artifact file.
    ///
    /// Returns `None` when either name is not a plain path component or the
    /// file does not exist, so callers cannot reach outside the job directory.
    pub fn resolve_artifact(&self, job_id: &str, file_name: &str) -> Option<PathBuf> {
        let job_id = safe_component(job_id)?;
        let file_name = safe_component(file_name)?;
        let path = self.artifacts_dir.join(job_id).join(file_name);
        path.is_file().then_some(path)
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        std::fs::read(path).map_err(|e| StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Creates `filename` in `dir_path` with `create_new`, falling back to
    /// numbered variants when the name is taken.
    fn store_with_atomic_creation(
        &self,
        dir_path: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) if dot_pos > 0 => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            _ => (filename, None),
        };

        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = dir_path.join(&try_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(dir_path.join(filename)))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Final path component of a client-supplied name. Both `/` and `\` count
/// as separators.
fn upload_name(filename: &str) -> Option<&str> {
    let last = filename.rsplit(['/', '\\']).next()?.trim();
    safe_component(last)
}

/// `name` if it is a single, non-special path component.
fn safe_component(name: &str) -> Option<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    (!invalid).then_some(name)
}

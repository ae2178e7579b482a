//! JSON file storage shared by the file-backed stores.
//!
//! Collections are always read whole and rewritten whole. Writes go to a temp file in the
//! destination directory and are renamed into place, so readers never see a partial file.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Serialize, de::DeserializeOwned};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors reading or writing a JSON store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),

    /// Stored data could not be encoded or decoded
    #[error("invalid stored data: {0}")]
    Json(#[from] serde_json::Error),

    /// The temp file could not be moved into place
    #[error("failed to replace stored file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Read a JSON document, returning the default value if the file does not exist.
///
/// # Errors
///
/// Returns a [`StorageError`] if the file exists but cannot be read or decoded.
pub fn read_json_or_default<T>(path: &Path) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(error) => return Err(error.into()),
    };

    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Atomically replace `path` with the JSON encoding of `value`.
///
/// # Errors
///
/// Returns a [`StorageError`] if the directory cannot be created, or encoding, writing or
/// renaming fails. The temp file is removed on every failure path.
pub fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }

    temp.persist(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn missing_file_reads_as_default() -> TestResult {
        let dir = tempfile::tempdir()?;

        let value: Vec<u32> = read_json_or_default(&dir.path().join("missing.json"))?;

        assert!(value.is_empty());

        Ok(())
    }

    #[test]
    fn written_value_reads_back() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("values.json");

        write_json_atomic(&path, &[1_u32, 2, 3])?;

        let value: Vec<u32> = read_json_or_default(&path)?;

        assert_eq!(value, vec![1, 2, 3]);

        Ok(())
    }

    #[test]
    fn corrupt_file_is_an_error() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("values.json");
        fs::write(&path, "not json")?;

        let result: Result<Vec<u32>, _> = read_json_or_default(&path);

        assert!(matches!(result, Err(StorageError::Json(_))));

        Ok(())
    }

    #[test]
    fn no_temp_files_are_left_behind() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("values.json");

        write_json_atomic(&path, &["a"])?;
        write_json_atomic(&path, &["b"])?;

        let entries = fs::read_dir(dir.path())?.count();

        assert_eq!(entries, 1);

        Ok(())
    }
}

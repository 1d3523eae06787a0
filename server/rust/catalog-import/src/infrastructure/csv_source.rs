use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tempfile::TempPath;

use crate::domain::service::ImportSource;

enum SourcePath {
    /// アップロードの一時コピー。ソースの破棄と同時に削除される。
    Temporary(TempPath),
    /// 呼び出し側が所有するファイル。削除しない。
    Borrowed(PathBuf),
}

/// CsvFileSource はディスク上のファイルを入力とする ImportSource 実装。
pub struct CsvFileSource {
    path: SourcePath,
}

impl CsvFileSource {
    /// 一時コピーを入力とする。ソースが破棄されるとファイルも削除される。
    pub fn temporary(path: TempPath) -> Self {
        Self {
            path: SourcePath::Temporary(path),
        }
    }

    /// 既存ファイルを入力とする。ファイルは削除されない。
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: SourcePath::Borrowed(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        match &self.path {
            SourcePath::Temporary(p) => &**p,
            SourcePath::Borrowed(p) => p.as_path(),
        }
    }
}

impl ImportSource for CsvFileSource {
    fn open(&self) -> anyhow::Result<Box<dyn Read + Send>> {
        let file = File::open(self.path())
            .with_context(|| format!("failed to open {}", self.path().display()))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_twice_reads_from_start() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"sku\nA1\n").unwrap();
        let source = CsvFileSource::temporary(file.into_temp_path());

        for _ in 0..2 {
            let mut buf = String::new();
            source.open().unwrap().read_to_string(&mut buf).unwrap();
            assert_eq!(buf, "sku\nA1\n");
        }
    }

    #[test]
    fn test_temporary_copy_removed_on_drop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = CsvFileSource::temporary(file.into_temp_path());
        let path = source.path().to_path_buf();
        assert!(path.exists());
        drop(source);
        assert!(!path.exists());
    }

    #[test]
    fn test_borrowed_file_kept_on_drop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = CsvFileSource::borrowed(file.path());
        drop(source);
        assert!(file.path().exists());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvFileSource::borrowed(dir.path().join("missing.csv"));
        let err = source.open().err().unwrap();
        assert!(err.to_string().contains("failed to open"));
    }
}

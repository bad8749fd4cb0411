use std::io;
use std::path::{Path, PathBuf};

/// On-disk layout of a server instance.
///
/// Everything lives under one data directory:
///
/// ```text
/// {data_dir}/cabos.sqlite     boxes, cable types, projects, usage ledger
/// {data_dir}/blobs/           rendered QR labels
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,

    /// Overrides `{data_dir}/cabos.sqlite`.
    pub sqlite_path: Option<PathBuf>,

    pub listen: String,
}

pub const DEFAULT_LISTEN: &str = "0.0.0.0:5002";

impl ServiceConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            sqlite_path: None,
            listen: DEFAULT_LISTEN.to_string(),
        }
    }

    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cabos.sqlite"))
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    /// Create the data directory, the blob directory and the database's
    /// parent directory if they are missing.
    pub fn prepare_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.blob_dir())?;
        if let Some(parent) = self.sqlite_path().parent().filter(|p| *p != Path::new("")) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_data_dir() {
        let config = ServiceConfig::new("/data");
        assert_eq!(config.sqlite_path(), PathBuf::from("/data/cabos.sqlite"));
        assert_eq!(config.blob_dir(), PathBuf::from("/data/blobs"));
        assert_eq!(config.listen, DEFAULT_LISTEN);
    }

    #[test]
    fn explicit_sqlite_path_wins() {
        let config = ServiceConfig {
            sqlite_path: Some(PathBuf::from("/fast/db.sqlite")),
            ..ServiceConfig::new("/data").with_listen("127.0.0.1:9090")
        };
        assert_eq!(config.sqlite_path(), PathBuf::from("/fast/db.sqlite"));
        assert_eq!(config.blob_dir(), PathBuf::from("/data/blobs"));
        assert_eq!(config.listen, "127.0.0.1:9090");
    }

    #[test]
    fn prepare_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            sqlite_path: Some(tmp.path().join("db/cabos.sqlite")),
            ..ServiceConfig::new(tmp.path().join("data"))
        };
        config.prepare_dirs().unwrap();
        assert!(config.data_dir.is_dir());
        assert!(config.blob_dir().is_dir());
        assert!(tmp.path().join("db").is_dir());
    }
}

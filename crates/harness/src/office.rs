use std::path::{Path, PathBuf};

use leadbook_core::UserId;
use leadbook_storage::{SqliteStorage, StorageError};
use tempfile::TempDir;

use crate::TestClient;

/// A database file shared by any number of clients, each on its own
/// connection. The file is removed when the office is dropped.
pub struct TestOffice {
    _dir: TempDir,
    path: PathBuf,
}

impl TestOffice {
    pub fn new() -> Result<Self, std::io::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("leadbook.db");
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new connection acting as `user`.
    pub fn connect(&self, user: UserId) -> Result<TestClient, StorageError> {
        Ok(TestClient::with_storage(user, SqliteStorage::open(&self.path)?))
    }

    /// Open a new connection for a brand-new user.
    pub fn new_agent(&self) -> Result<TestClient, StorageError> {
        self.connect(UserId::new())
    }
}

//! Bucket lifecycle: reset the key namespace and mint fresh run prefixes.

use crate::backend::ObjectBackend;
use crate::keyspace::KeySpace;
use anyhow::Result;

pub struct BucketManager<'a> {
    backend: &'a dyn ObjectBackend,
    keys: KeySpace,
}

impl<'a> BucketManager<'a> {
    pub fn new(backend: &'a dyn ObjectBackend, keys: KeySpace) -> Self {
        Self { backend, keys }
    }

    /// Delete everything under the namespace root, then return a freshly
    /// minted unique run prefix. Deletion failure propagates unconditionally.
    pub async fn initialize(&self) -> Result<String> {
        self.backend.remove_prefix(self.keys.root()).await?;
        Ok(self.keys.fresh_run_prefix())
    }

    /// Delete everything under the namespace root. Safe to call on an
    /// already-empty root.
    pub async fn clear(&self) -> Result<()> {
        self.backend.remove_prefix(self.keys.root()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TransportOptions;
    use crate::backend::localfs::LocalFsBackend;

    #[tokio::test]
    async fn initialize_clears_leftovers_and_mints_fresh_prefixes() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = LocalFsBackend::new(dir.path());
        backend
            .put_object("ns/stale/old.txt", b"stale", &TransportOptions::new())
            .await
            .unwrap();

        let bucket = BucketManager::new(&backend, KeySpace::new("bucket", "ns"));
        let first = bucket.initialize().await.unwrap();
        assert!(backend.get_object("ns/stale/old.txt").await.unwrap().is_none());

        let second = bucket.initialize().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn clear_twice_leaves_root_empty_both_times() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = LocalFsBackend::new(dir.path());
        backend
            .put_object("ns/run/a.txt", b"x", &TransportOptions::new())
            .await
            .unwrap();

        let bucket = BucketManager::new(&backend, KeySpace::new("bucket", "ns"));
        bucket.clear().await.unwrap();
        assert!(backend.get_object("ns/run/a.txt").await.unwrap().is_none());
        bucket.clear().await.unwrap();
    }
}

//! Mock blob storage backed by a map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::BlobStorage;

#[derive(Debug, Clone, Default)]
pub struct MockBlobStorage {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    counter: Arc<AtomicU64>,
    fail_deletes: Arc<AtomicBool>,
}

impl MockBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs
            .lock()
            .map(|b| b.contains_key(path))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStorage for MockBlobStorage {
    fn store(&self, dir: &str, extension: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = format!("{dir}/blob-{n}.{extension}");
        self.blobs
            .lock()
            .map_err(|_| anyhow::anyhow!("blob lock poisoned"))?
            .insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    fn delete(&self, path: &str) -> anyhow::Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("storage backend unavailable");
        }
        self.blobs
            .lock()
            .map_err(|_| anyhow::anyhow!("blob lock poisoned"))?
            .remove(path);
        Ok(())
    }
}

//! Blob storage for message attachments.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use uuid7::uuid7;

pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `dir`, returning the relative path of the blob.
    fn store(&self, dir: &str, extension: &str, bytes: &[u8]) -> anyhow::Result<String>;

    /// Remove a blob previously returned by [`BlobStorage::store`]. Removing a
    /// missing blob succeeds.
    fn delete(&self, path: &str) -> anyhow::Result<()>;
}

/// Directory backed storage. Every stored blob gets a fresh uuid7 file name,
/// so deleting one message's image never affects another's.
#[derive(Debug, Clone)]
pub struct FsBlobStorage {
    root: PathBuf,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            anyhow::bail!("blob path {path} leaves the storage root");
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStorage for FsBlobStorage {
    fn store(&self, dir: &str, extension: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let name = format!("{}.{extension}", uuid7());
        let path = format!("{}/{name}", dir.trim_end_matches('/'));
        let target = self.resolve(&path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating blob directory {}", parent.display()))?;
        }
        fs::write(&target, bytes).with_context(|| format!("writing blob {}", target.display()))?;

        Ok(path)
    }

    fn delete(&self, path: &str) -> anyhow::Result<()> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing blob {}", target.display())),
        }
    }
}

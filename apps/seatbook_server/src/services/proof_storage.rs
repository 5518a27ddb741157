// apps/seatbook_server/src/services/proof_storage.rs
use anyhow::Context;
use async_trait::async_trait;
use seatbook::ProofStore;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Stores proof images as files in one directory.
pub struct FsProofStore {
  root: PathBuf,
}

impl FsProofStore {
  pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root)
      .await
      .with_context(|| format!("creating proof directory {}", root.display()))?;
    Ok(Self { root })
  }
}

#[async_trait]
impl ProofStore for FsProofStore {
  #[instrument(name = "FsProofStore::store", skip(self, bytes), fields(size = bytes.len()))]
  async fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String> {
    // Names come from the engine, but never let one escape the directory.
    let file_name = Path::new(suggested_name)
      .file_name()
      .and_then(|name| name.to_str())
      .context("proof name has no file component")?
      .to_string();
    let path = self.root.join(&file_name);

    // Write under a temporary name so a reader never sees a partial file.
    let partial = self.root.join(format!(".{}.partial", file_name));
    tokio::fs::write(&partial, bytes)
      .await
      .with_context(|| format!("writing {}", partial.display()))?;
    tokio::fs::rename(&partial, &path)
      .await
      .with_context(|| format!("moving proof into {}", path.display()))?;

    debug!(path = %path.display(), "Proof stored.");
    Ok(file_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("seatbook-proofs-{}", uuid::Uuid::new_v4()))
  }

  #[tokio::test]
  async fn stores_bytes_under_the_suggested_name() {
    let dir = scratch_dir();
    let store = FsProofStore::open(&dir).await.unwrap();

    let reference = store.store(b"\x89PNG", "order_20260307190000.png").await.unwrap();

    assert_eq!(reference, "order_20260307190000.png");
    assert_eq!(tokio::fs::read(dir.join(&reference)).await.unwrap(), b"\x89PNG");
    tokio::fs::remove_dir_all(&dir).await.ok();
  }

  #[tokio::test]
  async fn path_components_are_stripped() {
    let dir = scratch_dir();
    let store = FsProofStore::open(&dir).await.unwrap();

    let reference = store.store(b"x", "../../etc/receipt.png").await.unwrap();

    assert_eq!(reference, "receipt.png");
    assert!(dir.join("receipt.png").exists());
    tokio::fs::remove_dir_all(&dir).await.ok();
  }
}

// seatbook/src/proof.rs

//! Proof-of-payment uploads: validation, reference naming and the storage port.

use crate::error::{BookingError, BookingResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

pub const DEFAULT_MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPolicy {
  pub max_bytes: usize,
  /// Lower-case extensions without the dot.
  pub allowed_extensions: Vec<String>,
}

impl Default for ProofPolicy {
  fn default() -> Self {
    Self {
      max_bytes: DEFAULT_MAX_PROOF_BYTES,
      allowed_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
    }
  }
}

/// An uploaded image as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofUpload {
  pub file_name: String,
  pub bytes: Vec<u8>,
}

impl ProofUpload {
  pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
    Self {
      file_name: file_name.into(),
      bytes: bytes.into(),
    }
  }
}

/// A proof that passed `ProofPolicy::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProof {
  pub extension: String,
  pub bytes: Vec<u8>,
}

impl ProofPolicy {
  pub fn validate(&self, upload: ProofUpload) -> BookingResult<ValidatedProof> {
    if upload.file_name.trim().is_empty() {
      return Err(BookingError::invalid_proof("no file selected"));
    }
    if upload.bytes.is_empty() {
      return Err(BookingError::invalid_proof("file is empty"));
    }
    if upload.bytes.len() > self.max_bytes {
      return Err(BookingError::invalid_proof(format!(
        "file is {} bytes, limit is {}",
        upload.bytes.len(),
        self.max_bytes
      )));
    }

    let extension = match upload.file_name.rsplit_once('.') {
      Some((stem, ext)) if !stem.is_empty() || !ext.is_empty() => ext.to_ascii_lowercase(),
      _ => return Err(BookingError::invalid_proof("file has no extension")),
    };
    if !self.allowed_extensions.iter().any(|allowed| *allowed == extension) {
      return Err(BookingError::invalid_proof(format!(
        "'.{}' is not allowed; upload one of: {}",
        extension,
        self.allowed_extensions.join(", ")
      )));
    }

    Ok(ValidatedProof {
      extension,
      bytes: upload.bytes,
    })
  }
}

/// `<order id>_<yyyymmddHHMMSS>.<ext>`: unique per order and traceable to it.
pub fn proof_reference_name(order_id: Uuid, at: DateTime<Utc>, extension: &str) -> String {
  format!("{}_{}.{}", order_id, at.format("%Y%m%d%H%M%S"), extension)
}

/// Content store for proof images.
#[async_trait]
pub trait ProofStore: Send + Sync {
  /// Persists `bytes` under (or near) `suggested_name` and returns the reference
  /// to record on the order.
  async fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Default)]
pub struct InMemoryProofStore {
  files: Mutex<HashMap<String, Vec<u8>>>,
  fail: AtomicBool,
}

impl InMemoryProofStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_stores(&self, fail: bool) {
    self.fail.store(fail, Ordering::SeqCst);
  }

  pub fn get(&self, reference: &str) -> Option<Vec<u8>> {
    self.files.lock().get(reference).cloned()
  }

  pub fn len(&self) -> usize {
    self.files.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.files.lock().is_empty()
  }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
  async fn store(&self, bytes: &[u8], suggested_name: &str) -> anyhow::Result<String> {
    if self.fail.load(Ordering::SeqCst) {
      anyhow::bail!("proof store unavailable");
    }
    self.files.lock().insert(suggested_name.to_string(), bytes.to_vec());
    Ok(suggested_name.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn policy() -> ProofPolicy {
    ProofPolicy::default()
  }

  #[test]
  fn accepts_allowed_image_extensions_case_insensitively() {
    let proof = policy().validate(ProofUpload::new("receipt.PNG", vec![1, 2, 3])).unwrap();
    assert_eq!(proof.extension, "png");
    assert!(policy().validate(ProofUpload::new("receipt.jpeg", vec![1])).is_ok());
  }

  #[test]
  fn rejects_executables_empty_and_oversized_files() {
    let cases = [
      ProofUpload::new("payload.exe", vec![1]),
      ProofUpload::new("receipt.png", Vec::new()),
      ProofUpload::new("", vec![1]),
      ProofUpload::new("receipt", vec![1]),
      ProofUpload::new("receipt.png", vec![0; DEFAULT_MAX_PROOF_BYTES + 1]),
    ];
    for upload in cases {
      let name = upload.file_name.clone();
      assert!(
        matches!(policy().validate(upload), Err(BookingError::InvalidProof { .. })),
        "{name:?} should be rejected"
      );
    }
  }

  #[test]
  fn accepts_a_file_exactly_at_the_limit() {
    let upload = ProofUpload::new("receipt.jpg", vec![0; DEFAULT_MAX_PROOF_BYTES]);
    assert!(policy().validate(upload).is_ok());
  }

  #[test]
  fn reference_name_embeds_order_and_timestamp() {
    let order_id = Uuid::nil();
    let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    assert_eq!(
      proof_reference_name(order_id, at, "png"),
      "00000000-0000-0000-0000-000000000000_20260102030405.png"
    );
  }
}

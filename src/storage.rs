//! Object storage for home logos, cover images, need images and verification documents.
//!
//! Public assets are served directly. Verification documents live in a private bucket and
//! are only reachable through HMAC-signed URLs that expire.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Storage buckets
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bucket {
    /// Logos, covers and need images, readable by anyone
    Public,
    /// Registration documents, readable only through signed URLs
    Documents,
}

impl Bucket {
    /// Name used in URLs and on disk.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Documents => "documents",
        }
    }

    /// Parses a bucket name from a URL segment.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "public" => Some(Self::Public),
            "documents" => Some(Self::Documents),
            _ => None,
        }
    }
}

/// Result of a successful upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Object path inside the bucket
    pub path: String,
    /// Direct URL, only for public buckets
    pub public_url: Option<String>,
}

/// A file received from a client, ready to be stored
#[derive(Clone, Debug)]
pub struct Upload {
    /// Original file name, used as a hint for the object name
    pub file_name: String,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Object storage collaborator.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `path` in `bucket`.
    async fn upload(&self, bucket: Bucket, path: &str, bytes: &[u8]) -> Result<StoredObject>;

    /// Reads an object back.
    async fn read(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>>;

    /// Returns a temporary URL for a private object.
    fn signed_url(&self, bucket: Bucket, path: &str, ttl: Duration) -> Result<String>;

    /// Checks a signature produced by [`ObjectStore::signed_url`].
    fn verify_signature(
        &self,
        bucket: Bucket,
        path: &str,
        expires: u64,
        signature: &str,
        now: u64,
    ) -> bool;
}

/// Builds an object path `prefix/<uuid>-<sanitized name>`.
#[must_use]
pub fn object_path(prefix: &str, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');
    let name = if sanitized.is_empty() { "file" } else { sanitized };
    format!("{prefix}/{}-{name}", uuid::Uuid::new_v4())
}

/// Filesystem-backed store.
#[derive(Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
    signing_key: Vec<u8>,
}

impl std::fmt::Debug for LocalObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalObjectStore")
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl LocalObjectStore {
    /// Creates a store rooted at `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        signing_key: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        let signing_key = signing_key.into();
        if signing_key.is_empty() {
            return Err(Error::Config {
                message: "Storage signing key cannot be empty".to_string(),
            });
        }
        Ok(Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            signing_key,
        })
    }

    fn resolve(&self, bucket: Bucket, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let is_safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            return Err(Error::Storage {
                message: format!("Invalid object path: {path}"),
            });
        }
        Ok(self.root.join(bucket.as_str()).join(relative))
    }

    fn signature(&self, bucket: Bucket, path: &str, expires: u64) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key).map_err(|e| Error::Storage {
            message: format!("Invalid signing key: {e}"),
        })?;
        mac.update(format!("{}/{path}:{expires}", bucket.as_str()).as_bytes());
        Ok(mac)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, bucket: Bucket, path: &str, bytes: &[u8]) -> Result<StoredObject> {
        let target = self.resolve(bucket, path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        debug!(bucket = bucket.as_str(), path, size = bytes.len(), "Stored object");

        let public_url = match bucket {
            Bucket::Public => Some(format!(
                "{}/{}/{path}",
                self.public_base_url,
                bucket.as_str()
            )),
            Bucket::Documents => None,
        };
        Ok(StoredObject {
            path: path.to_string(),
            public_url,
        })
    }

    async fn read(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve(bucket, path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::not_found("file", path)),
            Err(e) => Err(e.into()),
        }
    }

    fn signed_url(&self, bucket: Bucket, path: &str, ttl: Duration) -> Result<String> {
        self.resolve(bucket, path)?;
        let expires = chrono::Utc::now()
            .timestamp()
            .unsigned_abs()
            .saturating_add(ttl.as_secs());
        let signature = hex::encode(self.signature(bucket, path, expires)?.finalize().into_bytes());
        Ok(format!(
            "{}/{}/{path}?expires={expires}&signature={signature}",
            self.public_base_url,
            bucket.as_str()
        ))
    }

    fn verify_signature(
        &self,
        bucket: Bucket,
        path: &str,
        expires: u64,
        signature: &str,
        now: u64,
    ) -> bool {
        if expires < now {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        self.signature(bucket, path, expires)
            .is_ok_and(|mac| mac.verify_slice(&expected).is_ok())
    }
}

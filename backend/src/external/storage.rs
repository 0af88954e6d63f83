//! Signed download URLs for the external object store
//!
//! A download URL is `{public_base_url}/{bucket}/{path}?expires={unix}&signature={sig}`
//! where `sig` is base64url(HMAC-SHA256(secret, "{bucket}/{path}:{expires}")).
//! The store gateway holds the same secret and verifies both values.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use serde::Serialize;
use sha2::Sha256;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Issues time-limited download URLs
#[derive(Clone)]
pub struct UrlSigner {
    base_url: Url,
    bucket: String,
    secret: Vec<u8>,
    ttl: Duration,
}

/// A signed URL and when it stops working
#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl UrlSigner {
    /// Create a signer from storage configuration
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.public_base_url).map_err(|e| {
            AppError::Configuration(format!("invalid storage.public_base_url: {}", e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Configuration(
                "storage.public_base_url cannot be a base URL".to_string(),
            ));
        }
        if config.signing_secret.is_empty() {
            return Err(AppError::Configuration(
                "storage.signing_secret must not be empty".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            bucket: config.bucket.clone(),
            secret: config.signing_secret.as_bytes().to_vec(),
            ttl: Duration::seconds(config.signed_url_ttl.max(1)),
        })
    }

    /// Sign a download URL for `path`, valid for the configured TTL
    pub fn sign(&self, path: &str) -> AppResult<SignedUrl> {
        self.sign_at(path, Utc::now())
    }

    pub fn sign_at(&self, path: &str, now: DateTime<Utc>) -> AppResult<SignedUrl> {
        shared::validate_storage_path(path).map_err(|e| AppError::StorageError(e.to_string()))?;

        let expires_at = now + self.ttl;
        let expires = expires_at.timestamp();
        let signature = self.signature(path, expires)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::StorageError("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(path.split('/'));
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);

        Ok(SignedUrl {
            url: url.into(),
            expires_at,
        })
    }

    /// Check a signature produced by [`UrlSigner::sign`]
    pub fn verify(&self, path: &str, expires: i64, signature: &str, now: DateTime<Utc>) -> bool {
        if now.timestamp() >= expires {
            return false;
        }
        let Ok(provided) = BASE64URL.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(self.message(path, expires).as_bytes());
        mac.verify_slice(&provided).is_ok()
    }

    fn signature(&self, path: &str, expires: i64) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| AppError::Internal("failed to create HMAC".to_string()))?;
        mac.update(self.message(path, expires).as_bytes());
        Ok(BASE64URL.encode(mac.finalize().into_bytes()))
    }

    fn message(&self, path: &str, expires: i64) -> String {
        format!("{}/{}:{}", self.bucket, path, expires)
    }
}

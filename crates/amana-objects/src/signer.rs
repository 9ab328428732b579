use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::path::{object_path, validate_entity_id};
use crate::{ObjectError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Issues and checks time-limited upload URLs.
///
/// A URL carries `expires` (unix seconds) and `signature`, the hex HMAC-SHA256
/// of `PUT\n<entity_id>\n<expires>` under the server secret.
pub struct UploadSigner {
    secret: Vec<u8>,
    public_base_url: String,
    ttl: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUpload {
    pub entity_id: String,
    pub upload_url: String,
    pub object_path: String,
    pub expires_at: u64,
}

impl UploadSigner {
    pub fn new(secret: &str, public_base_url: &str, ttl: Duration) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            ttl,
        }
    }

    pub fn presign(&self, entity_id: &str, now_unix: u64) -> Result<PresignedUpload> {
        validate_entity_id(entity_id)?;

        let expires_at = now_unix + self.ttl.as_secs();
        let signature = hex::encode(self.mac(entity_id, expires_at)?.finalize().into_bytes());

        Ok(PresignedUpload {
            entity_id: entity_id.to_string(),
            upload_url: format!(
                "{}/{}?expires={}&signature={}",
                self.public_base_url, entity_id, expires_at, signature
            ),
            object_path: object_path(entity_id),
            expires_at,
        })
    }

    /// Expiry is checked first so a stale URL reports `Expired` even when its
    /// signature is intact.
    pub fn verify(&self, entity_id: &str, expires: u64, signature: &str, now_unix: u64) -> Result<()> {
        if now_unix > expires {
            return Err(ObjectError::Expired);
        }

        let provided = hex::decode(signature).map_err(|_| ObjectError::BadSignature)?;
        self.mac(entity_id, expires)?
            .verify_slice(&provided)
            .map_err(|_| ObjectError::BadSignature)
    }

    fn mac(&self, entity_id: &str, expires: u64) -> Result<HmacSha256> {
        // HMAC takes keys of any length; the error arm is unreachable in practice.
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| ObjectError::BadSignature)?;
        mac.update(b"PUT\n");
        mac.update(entity_id.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}

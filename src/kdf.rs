//! Key derivation from passphrases.
//!
//! A passphrase and a 16-byte salt are stretched into AES-256 key material
//! using PBKDF2-HMAC-SHA256 with a fixed iteration count. The derivation is
//! deterministic: the same (passphrase, salt) pair always produces the same
//! key and IV, which is what lets decryption recompute the key from the salt
//! stored in the container header.

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptboxError, ErrorCategory, ErrorKind, Result};

/// Length of the per-file salt in bytes.
pub const SALT_LEN: usize = 16;

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// AES-256 key and CBC IV derived from a passphrase and salt.
///
/// Both components are drawn from a single PBKDF2 output stream: the first
/// 32 bytes become the key and the next 16 bytes become the IV. Deriving
/// the IV independently would be more conventional, but changing the split
/// would make every existing container undecryptable, so it stays.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    pub key: [u8; KEY_LEN],
    pub iv: [u8; IV_LEN],
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}

/// Derive (key, IV) from a passphrase and a 16-byte salt.
///
/// The salt length is fixed by the parameter type; callers cannot hand in a
/// salt of the wrong size.
pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Result<KeyMaterial> {
    let mut stream = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
    pbkdf2::<Hmac<Sha256>>(passphrase, salt, PBKDF2_ITERATIONS, &mut *stream).map_err(|e| {
        CryptboxError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("PBKDF2 derivation failed: {}", e),
            e,
        )
    })?;

    let mut material = KeyMaterial {
        key: [0u8; KEY_LEN],
        iv: [0u8; IV_LEN],
    };
    material.key.copy_from_slice(&stream[..KEY_LEN]);
    material.iv.copy_from_slice(&stream[KEY_LEN..]);
    Ok(material)
}

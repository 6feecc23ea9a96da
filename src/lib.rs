//! Cryptbox - Passphrase-based file encryption using PBKDF2 and AES-256-CBC
//!
//! The container format is a 16-byte random salt followed by
//! AES-256-CBC/PKCS#7 ciphertext. Key and IV are derived from the
//! passphrase and salt with PBKDF2-HMAC-SHA256 (10,000 iterations).
//!
//! There is no authentication tag: a wrong passphrase is detected only
//! through padding validation, and corruption is indistinguishable from a
//! wrong passphrase. This is a known limitation of the format.

#![forbid(unsafe_code)]

pub mod container;
pub mod error;
pub mod file_ops;
pub mod kdf;
pub mod passphrase;
pub mod streamcrypt;

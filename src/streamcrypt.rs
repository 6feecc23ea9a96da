//! Streaming AES-256-CBC transform.
//!
//! Both directions are block oriented: bytes move through a fixed-size
//! buffer, so memory use does not depend on input size. PKCS#7 padding is
//! always appended on encryption, meaning the ciphertext is 1 to 16 bytes
//! longer than the plaintext and never empty - an empty plaintext still
//! produces one full padding block.
//!
//! This module never sees the container header. It only consumes
//! (stream, key, iv); the salt handling lives in [`crate::container`].

use std::io::{ErrorKind as IoErrorKind, Read, Write};

use aes::{Aes256, Block};
use cbc::cipher::block_padding::{Padding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{CryptboxError, ErrorCategory, ErrorKind, Result};
use crate::kdf::KeyMaterial;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Cipher block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// I/O chunk size. Must be a multiple of the block size.
const BUF_LEN: usize = 64 * 1024;

/// Message reported when padding validation fails. Deliberately a single
/// message: without an authentication tag the code cannot tell a wrong
/// passphrase apart from a corrupted container.
pub const BAD_PADDING_MSG: &str = "incorrect passphrase or corrupted container";

/// Read until `buf` is full or the reader reaches end of stream.
///
/// A single `read` call is not guaranteed to return everything available,
/// so this loops. Returns the number of bytes read; a value smaller than
/// `buf.len()` means end of stream was reached.
pub(crate) fn read_full(source: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Encrypt `source` to `destination` with AES-256-CBC and PKCS#7 padding.
pub fn encrypt(
    source: &mut impl Read,
    destination: &mut impl Write,
    material: &KeyMaterial,
) -> Result<()> {
    let mut cipher = Aes256CbcEnc::new(&material.key.into(), &material.iv.into());
    let mut buf = vec![0u8; BUF_LEN];

    loop {
        let n = read_full(source, &mut buf)?;
        let aligned = n - (n % BLOCK_LEN);
        for chunk in buf[..aligned].chunks_exact_mut(BLOCK_LEN) {
            cipher.encrypt_block_mut(Block::from_mut_slice(chunk));
        }
        destination.write_all(&buf[..aligned])?;

        if n < BUF_LEN {
            // End of stream: pad the remainder (possibly empty) into the
            // final block. This runs even for an empty input.
            let rem = n - aligned;
            let mut last = Block::default();
            last[..rem].copy_from_slice(&buf[aligned..n]);
            Pkcs7::pad(&mut last, rem);
            cipher.encrypt_block_mut(&mut last);
            destination.write_all(&last)?;
            return Ok(());
        }
    }
}

/// Decrypt `source` to `destination`, validating the final block's padding.
///
/// Plaintext is written as it is produced, so on failure the destination
/// may already hold partial output; callers that write to permanent storage
/// are responsible for discarding it (see [`crate::file_ops::decrypt_file`]).
pub fn decrypt(
    source: &mut impl Read,
    destination: &mut impl Write,
    material: &KeyMaterial,
) -> Result<()> {
    let mut cipher = Aes256CbcDec::new(&material.key.into(), &material.iv.into());
    let mut buf = vec![0u8; BUF_LEN];

    // The most recently decrypted block is held back until we know whether
    // it is the final one, because only the final block carries padding.
    let mut held: Option<[u8; BLOCK_LEN]> = None;

    loop {
        let n = read_full(source, &mut buf)?;
        if n == 0 {
            break;
        }
        if n % BLOCK_LEN != 0 {
            return Err(CryptboxError::with_kind(
                ErrorCategory::User,
                ErrorKind::BinaryFormat,
                "ciphertext length is not a multiple of the cipher block size",
            ));
        }

        for chunk in buf[..n].chunks_exact_mut(BLOCK_LEN) {
            cipher.decrypt_block_mut(Block::from_mut_slice(chunk));
        }

        if let Some(prev) = held.take() {
            destination.write_all(&prev)?;
        }
        destination.write_all(&buf[..n - BLOCK_LEN])?;
        let mut last = [0u8; BLOCK_LEN];
        last.copy_from_slice(&buf[n - BLOCK_LEN..n]);
        held = Some(last);

        if n < BUF_LEN {
            break;
        }
    }

    let last = held.ok_or_else(|| {
        CryptboxError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedContainer,
            "container has no ciphertext after the salt header",
        )
    })?;

    let unpadded = Pkcs7::unpad(Block::from_slice(&last)).map_err(|_| {
        CryptboxError::with_kind(ErrorCategory::User, ErrorKind::BadPadding, BAD_PADDING_MSG)
    })?;
    destination.write_all(unpadded)?;
    Ok(())
}

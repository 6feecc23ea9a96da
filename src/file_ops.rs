//! File encryption/decryption operations
//!
//! This module provides the file-level operations for encrypting and
//! decrypting files in the cryptbox container format, plus the default
//! output-path naming convention (appending or stripping the `.cbx`
//! suffix).
//!
//! Files are streamed through the container layer rather than slurped, so
//! files larger than available memory work.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::container;
use crate::error::{CryptboxError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::PassphraseReader;

/// File name suffix marking an encrypted file.
pub const ENCRYPTED_SUFFIX: &str = "cbx";

/// Encrypt a file with a passphrase
///
/// Streams plaintext from `input_path`, encrypts it using a passphrase from
/// `passphrase_reader`, and writes the container to `output_path`.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let passphrase = passphrase_reader.read_passphrase()?;
    if passphrase.is_empty() {
        // Rejected before the output file is even created.
        return Err(empty_passphrase_error());
    }
    let mut source = File::open(input_path).map_err(|e| read_error(input_path, e))?;
    let mut destination = create_file_secure(output_path)?;
    container::encrypt_stream(&mut source, &mut destination, &passphrase)
        .map_err(|e| e.with_context(format!("failed to encrypt to {}", output_path.display())))?;
    Ok(())
}

/// Decrypt a file with a passphrase
///
/// Streams the container from `input_path`, decrypts it using a passphrase
/// from `passphrase_reader`, and writes the plaintext to `output_path`.
///
/// When decryption fails structurally (truncated or malformed container) or
/// cryptographically (padding validation, i.e. wrong passphrase or
/// corruption), the partially written output file is closed and deleted
/// before the error propagates; a half-written plaintext file is never left
/// behind looking complete. Plain I/O failures propagate without deleting.
///
/// The output file is created with mode 0o600 (read/write for owner only) on Unix systems.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let passphrase = passphrase_reader.read_passphrase()?;
    if passphrase.is_empty() {
        return Err(empty_passphrase_error());
    }
    let mut source = File::open(input_path).map_err(|e| read_error(input_path, e))?;
    let mut destination = create_file_secure(output_path)?;
    match container::decrypt_stream(&mut source, &mut destination, &passphrase) {
        Ok(()) => Ok(()),
        Err(err) => {
            // Close the handle before removing; Windows refuses to delete
            // an open file.
            drop(destination);
            if matches!(
                err.kind,
                Some(
                    ErrorKind::BadPadding
                        | ErrorKind::TruncatedContainer
                        | ErrorKind::BinaryFormat
                )
            ) {
                let _ = fs::remove_file(output_path);
            }
            Err(err.with_context(format!("failed to decrypt {}", input_path.display())))
        }
    }
}

/// Default output path for encryption: the input path with the encrypted
/// suffix appended (`notes.txt` becomes `notes.txt.cbx`).
pub fn encrypted_path(input_path: &Path) -> PathBuf {
    let mut name = input_path.as_os_str().to_os_string();
    name.push(".");
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// Default output path for decryption: the input path with the encrypted
/// suffix stripped. Fails when the input does not carry the suffix, since
/// there is then no sensible default.
pub fn decrypted_path(input_path: &Path) -> Result<PathBuf> {
    match input_path.extension() {
        Some(ext) if ext == ENCRYPTED_SUFFIX => Ok(input_path.with_extension("")),
        _ => Err(CryptboxError::new(
            ErrorCategory::User,
            format!(
                "{} does not end in .{}; specify an output path explicitly",
                input_path.display(),
                ENCRYPTED_SUFFIX
            ),
        )),
    }
}

/// Create the output file with secure permissions (0o600 on Unix)
fn create_file_secure(path: &Path) -> Result<File> {
    #[cfg(unix)]
    let opened = {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
    };

    #[cfg(not(unix))]
    let opened = File::create(path);

    opened.map_err(|e| {
        CryptboxError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to open {}", path.display()),
            e,
        )
    })
}

fn read_error(path: &Path, err: io::Error) -> CryptboxError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    CryptboxError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

fn empty_passphrase_error() -> CryptboxError {
    CryptboxError::with_kind(
        ErrorCategory::User,
        ErrorKind::EmptyPassphrase,
        "passphrase must not be empty",
    )
}

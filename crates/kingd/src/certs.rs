//! Per-run trust-anchor file handed to the HTTP client.

use std::fs;
use std::io::{self, ErrorKind, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use thiserror::Error;

const CERTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::certs");

/// Failures writing the trust-anchor file.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The source bundle could not be read.
    #[error("failed to read trust anchors '{path}': {source}")]
    Read {
        /// Source bundle.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The transient file could not be written.
    #[error("failed to write trust anchors into '{dir}': {source}")]
    Write {
        /// Directory the file was created in.
        dir: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The transient file path was not valid UTF-8.
    #[error("trust anchor path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
}

/// Trust-anchor file written at startup and removed on loop exit.
#[derive(Debug)]
pub struct TransientCertificates {
    path: Utf8PathBuf,
}

impl TransientCertificates {
    /// Copies `source` into a fresh file under `dir`.
    ///
    /// A missing source yields an empty file, which leaves the HTTP client
    /// with its built-in roots.
    ///
    /// # Errors
    ///
    /// Fails when the source exists but cannot be read, or the file cannot
    /// be written.
    pub fn write(source: &Utf8Path, dir: &Utf8Path) -> Result<Self, CertificateError> {
        let bundle = match fs::read(source) {
            Ok(bundle) => bundle,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::warn!(target: CERTS_TARGET, path = %source, "trust anchor bundle missing");
                Vec::new()
            }
            Err(error) => {
                return Err(CertificateError::Read {
                    path: source.to_path_buf(),
                    source: error,
                });
            }
        };

        let write_error = |cause| CertificateError::Write {
            dir: dir.to_path_buf(),
            source: cause,
        };
        let mut file = Builder::new()
            .prefix("kingd-certs-")
            .suffix(".pem")
            .tempfile_in(dir)
            .map_err(write_error)?;
        file.write_all(&bundle).map_err(write_error)?;
        file.flush().map_err(write_error)?;
        let (_, kept) = file.keep().map_err(|error| write_error(error.error))?;
        let path = Utf8PathBuf::from_path_buf(kept)
            .map_err(|raw| CertificateError::NonUtf8Path(raw.display().to_string()))?;
        tracing::debug!(target: CERTS_TARGET, %path, bytes = bundle.len(), "wrote trust anchors");
        Ok(Self { path })
    }

    /// Location of the trust-anchor file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Deletes the file. A file that is already gone is not an error.
    pub fn remove(self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(target: CERTS_TARGET, path = %self.path, "removed trust anchors");
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(
                    target: CERTS_TARGET,
                    path = %self.path,
                    %error,
                    "failed to remove trust anchors"
                );
            }
        }
    }
}

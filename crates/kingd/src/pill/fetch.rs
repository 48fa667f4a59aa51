//! Blocking HTTP download of pill images.

use std::fs;
use std::io::{self, Read};

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::{Certificate, redirect};
use thiserror::Error;
use url::Url;

use super::PILL_TARGET;

/// Failures downloading a pill.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The trust-anchor file could not be loaded.
    #[error("failed to load trust anchors from '{path}': {message}")]
    TrustAnchors {
        /// Trust-anchor file.
        path: Utf8PathBuf,
        /// Description of the failure.
        message: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Client(String),
    /// The request could not be completed.
    #[error("pill: unable to fetch {url}: {message}")]
    Transport {
        /// Requested URL.
        url: Url,
        /// Transport failure description.
        message: String,
    },
    /// The server answered with a non-success status.
    #[error("pill: unable to fetch {url}: status {status}")]
    Status {
        /// Requested URL.
        url: Url,
        /// Status code returned.
        status: u16,
    },
    /// The response body could not be read.
    #[error("pill: unable to read body of {url}: {source}")]
    Body {
        /// Requested URL.
        url: Url,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Downloads the full body at a URL.
#[cfg_attr(test, mockall::automock)]
pub trait PillFetcher {
    /// Fetches `url`, failing on transport errors and any status of 300 or
    /// above.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for transport failures and rejected statuses.
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// [`PillFetcher`] backed by a blocking `reqwest` client.
///
/// Redirects are not followed, so a redirecting status is reported as a
/// failure like any other status of 300 or above.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher trusting the PEM bundle at `trust_anchors`.
    ///
    /// An empty bundle leaves only the client's built-in roots.
    ///
    /// # Errors
    ///
    /// Fails when the bundle cannot be read or parsed, or the client cannot
    /// be constructed.
    pub fn new(trust_anchors: &Utf8Path) -> Result<Self, FetchError> {
        let anchors_error = |message: String| FetchError::TrustAnchors {
            path: trust_anchors.to_path_buf(),
            message,
        };
        let bundle = fs::read(trust_anchors).map_err(|error| anchors_error(error.to_string()))?;

        let mut builder = Client::builder()
            .use_rustls_tls()
            .redirect(redirect::Policy::none());
        if !bundle.is_empty() {
            let certificates = Certificate::from_pem_bundle(&bundle)
                .map_err(|error| anchors_error(error.to_string()))?;
            tracing::debug!(
                target: PILL_TARGET,
                path = %trust_anchors,
                count = certificates.len(),
                "loaded trust anchors"
            );
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder
            .build()
            .map_err(|error| FetchError::Client(error.to_string()))?;
        Ok(Self { client })
    }
}

impl PillFetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        tracing::info!(target: PILL_TARGET, %url, "boot: downloading pill");
        let mut response =
            self.client
                .get(url.clone())
                .send()
                .map_err(|error| FetchError::Transport {
                    url: url.clone(),
                    message: error.to_string(),
                })?;

        let status = response.status().as_u16();
        if status >= 300 {
            return Err(FetchError::Status {
                url: url.clone(),
                status,
            });
        }

        let mut body = Vec::new();
        response
            .read_to_end(&mut body)
            .map_err(|source| FetchError::Body {
                url: url.clone(),
                source,
            })?;
        tracing::debug!(target: PILL_TARGET, %url, bytes = body.len(), "pill downloaded");
        Ok(body)
    }
}

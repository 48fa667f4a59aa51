//! Typed interpretations of the pill and key selectors.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use url::Url;

use crate::Config;

/// Origin of the boot pill, resolved in strict precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PillSource {
    /// A pill file on the local filesystem.
    Local(Utf8PathBuf),
    /// A URL derived from the latest system commit of a source repository.
    Repository(Utf8PathBuf),
    /// An explicitly configured URL.
    Url(Url),
}

/// Errors raised while interpreting configured sources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// No pill path, repository, or URL was configured.
    #[error("no pill source configured: set a pill path, a pill URL, or a git repository")]
    NoPillSource,
    /// The configured pill URL did not parse.
    #[error("invalid pill url '{url}': {message}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
}

impl PillSource {
    /// Applies the local path, then repository, then URL precedence.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoPillSource`] when nothing is configured and
    /// [`SourceError::InvalidUrl`] when the URL does not parse.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        if let Some(path) = &config.pill_path {
            return Ok(Self::Local(path.clone()));
        }
        if config.git_pill
            && let Some(repository) = &config.arvo_path
        {
            return Ok(Self::Repository(repository.clone()));
        }
        let text = config.pill_url.as_deref().ok_or(SourceError::NoPillSource)?;
        Url::parse(text)
            .map(Self::Url)
            .map_err(|error| SourceError::InvalidUrl {
                url: text.to_owned(),
                message: error.to_string(),
            })
    }
}

/// Origin of the encoded seed for an attested boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// The seed is stored in a file.
    File(Utf8PathBuf),
    /// The seed was given inline.
    Inline(String),
    /// No seed was configured.
    Missing,
}

impl KeySource {
    /// Prefers a key file over an inline key.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        match (&config.key_file, &config.generated_key) {
            (Some(path), _) => Self::File(path.clone()),
            (None, Some(key)) => Self::Inline(key.clone()),
            (None, None) => Self::Missing,
        }
    }

    /// File path, when the seed lives on disk.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::File(path) => Some(path.as_path()),
            Self::Inline(_) | Self::Missing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config() -> Config {
        Config {
            pill_path: Some(Utf8PathBuf::from("/tmp/solid.pill")),
            pill_url: Some("https://example.org/solid.pill".to_owned()),
            arvo_path: Some(Utf8PathBuf::from("/src/arvo")),
            git_pill: true,
            ..Config::default()
        }
    }

    #[test]
    fn local_path_wins_over_everything() {
        let source = PillSource::from_config(&config());
        assert_eq!(
            source,
            Ok(PillSource::Local(Utf8PathBuf::from("/tmp/solid.pill")))
        );
    }

    #[test]
    fn repository_wins_over_url_when_git_enabled() {
        let config = Config {
            pill_path: None,
            ..config()
        };
        assert_eq!(
            PillSource::from_config(&config),
            Ok(PillSource::Repository(Utf8PathBuf::from("/src/arvo")))
        );
    }

    #[rstest]
    #[case(false, Some("/src/arvo"))]
    #[case(true, None)]
    fn url_used_without_git_repository(#[case] git_pill: bool, #[case] arvo: Option<&str>) {
        let config = Config {
            pill_path: None,
            git_pill,
            arvo_path: arvo.map(Utf8PathBuf::from),
            ..config()
        };
        let source = PillSource::from_config(&config).expect("url should resolve");
        assert!(matches!(source, PillSource::Url(url) if url.as_str() == "https://example.org/solid.pill"));
    }

    #[test]
    fn missing_sources_are_reported() {
        assert_eq!(
            PillSource::from_config(&Config::default()),
            Err(SourceError::NoPillSource)
        );
    }

    #[test]
    fn malformed_url_is_rejected() {
        let config = Config {
            pill_url: Some("not a url".to_owned()),
            ..Config::default()
        };
        assert!(matches!(
            PillSource::from_config(&config),
            Err(SourceError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn key_file_takes_precedence() {
        let config = Config {
            key_file: Some(Utf8PathBuf::from("/keys/zod.key")),
            generated_key: Some("abc".to_owned()),
            ..Config::default()
        };
        assert_eq!(
            KeySource::from_config(&config).path(),
            Some(Utf8Path::new("/keys/zod.key"))
        );
        assert_eq!(KeySource::from_config(&Config::default()), KeySource::Missing);
    }
}

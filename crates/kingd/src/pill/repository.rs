//! Pill URLs derived from a source repository's latest system commit.

use std::borrow::Cow;

use camino::Utf8Path;
use url::Url;

use super::{PILL_TARGET, PillError, ShellRunner};

/// Base of hash-derived pill URLs.
pub const GIT_PILL_URL_BASE: &str = "https://bootstrap.urbit.org/git-";
/// Suffix of hash-derived pill URLs.
pub const GIT_PILL_URL_SUFFIX: &str = ".pill";
/// Width of the commit token interpolated into the URL.
pub const HASH_TOKEN_LEN: usize = 10;

const GIT_LOOKUP: &str = "command -v git";
const LOOKUP_LIMIT: usize = 4096;
const HASH_LIMIT: usize = 64;

/// Resolves the pill URL for `repository`.
///
/// Only commits touching the repository's `sys/` tree affect the result.
///
/// # Errors
///
/// Fails with [`PillError::GitUnavailable`] when no `git` is on the path,
/// and with [`PillError::Hash`] or [`PillError::MalformedHash`] when the
/// commit query fails.
pub fn pill_url(repository: &Utf8Path, shell: &dyn ShellRunner) -> Result<Url, PillError> {
    shell
        .first_line(GIT_LOOKUP, LOOKUP_LIMIT)
        .map_err(|source| PillError::GitUnavailable { source })?;

    let command = hash_command(repository);
    let output = shell
        .first_line(&command, HASH_LIMIT)
        .map_err(|source| PillError::Hash {
            repository: repository.to_path_buf(),
            source,
        })?;
    let token = hash_token(&output)?;
    tracing::debug!(target: PILL_TARGET, %repository, token, "resolved repository hash");

    let text = format!("{GIT_PILL_URL_BASE}{token}{GIT_PILL_URL_SUFFIX}");
    Url::parse(&text).map_err(|error| PillError::InvalidUrl {
        url: text,
        message: error.to_string(),
    })
}

fn hash_command(repository: &Utf8Path) -> String {
    let quoted = shell_escape::escape(Cow::Borrowed(repository.as_str()));
    format!("git -C {quoted} log -1 HEAD --format=%H -- sys/")
}

fn hash_token(output: &str) -> Result<&str, PillError> {
    let trimmed = output.trim();
    trimmed
        .char_indices()
        .map(|(index, _)| index)
        .chain(std::iter::once(trimmed.len()))
        .nth(HASH_TOKEN_LEN)
        .and_then(|end| trimmed.get(..end))
        .ok_or_else(|| PillError::MalformedHash {
            output: output.to_owned(),
        })
}

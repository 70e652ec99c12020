// Reading and rewriting the on-disk credentials file.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use influxboot_common::credentials::CredentialsRecord;
use influxboot_common::types::{BootstrapSettings, TOKEN_FIELD};

use crate::error::BootstrapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteOutcome {
    /// Only the token value changed.
    Rewritten,
    /// The file already held the new token.
    Unchanged,
    /// No `token = "..."` assignment; file left as is.
    SkippedFieldMissing,
    /// The stored token no longer matches what was read earlier; file left as is.
    SkippedValueChanged,
}

impl RewriteOutcome {
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::SkippedFieldMissing | Self::SkippedValueChanged)
    }
}

pub fn read_record(path: &Path) -> Result<CredentialsRecord, BootstrapError> {
    let text = fs::read_to_string(path).map_err(|source| BootstrapError::CredentialsUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(CredentialsRecord::parse(&text))
}

pub fn load_settings(path: &Path) -> Result<BootstrapSettings, BootstrapError> {
    let record = read_record(path)?;
    BootstrapSettings::from_record(&record)
        .map_err(|source| BootstrapError::Credentials { path: path.to_path_buf(), source })
}

/// Replace the stored token with `new_token`, but only if the file still holds
/// `expected_current`. Anything else leaves the file byte-identical.
pub fn rewrite_token(
    path: &Path,
    expected_current: &str,
    new_token: &str,
) -> Result<RewriteOutcome, BootstrapError> {
    let mut record = read_record(path)?;

    let current = record.get(TOKEN_FIELD).map(str::to_string);

    let outcome = match current.as_deref() {
        None => RewriteOutcome::SkippedFieldMissing,
        Some(current) if current == new_token => RewriteOutcome::Unchanged,
        Some(current) if current != expected_current => RewriteOutcome::SkippedValueChanged,
        Some(_) => {
            record
                .set(TOKEN_FIELD, new_token)
                .map_err(|source| BootstrapError::Credentials { path: path.to_path_buf(), source })?;
            fs::write(path, record.render()).map_err(|source| {
                BootstrapError::io(format!("failed to write `{}`", path.display()), source)
            })?;
            RewriteOutcome::Rewritten
        }
    };

    match outcome {
        RewriteOutcome::Rewritten => info!(path = %path.display(), "stored new token"),
        RewriteOutcome::Unchanged => info!(path = %path.display(), "token already up to date"),
        RewriteOutcome::SkippedFieldMissing => {
            warn!(path = %path.display(), "no token field in credentials file; not rewritten")
        }
        RewriteOutcome::SkippedValueChanged => warn!(
            path = %path.display(),
            "token in credentials file changed since it was read; not rewritten"
        ),
    }

    Ok(outcome)
}

// Core domain types shared across influxboot crates.

use serde::{Deserialize, Serialize};

use crate::credentials::{CredentialsRecord, RecordError};

/// Fields the setup command needs, in the order they are reported when missing.
pub const INPUT_FIELDS: [&str; 5] = ["user", "password", "org", "bucket", "retention"];

pub const TOKEN_FIELD: &str = "token";

/// Placeholder value provisioned before the first bootstrap.
pub const PLACEHOLDER_TOKEN: &str = "PLACEHOLDER";

/// Values read from the credentials file and handed from step to step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapSettings {
    pub user: String,
    pub password: String,
    pub org: String,
    pub bucket: String,
    pub retention: String,
    /// Token currently stored in the file; empty when the field is absent.
    #[serde(default)]
    pub token: String,
}

impl BootstrapSettings {
    /// Collect the setup inputs. Every absent or empty input field is reported
    /// at once so the file can be fixed in a single pass. Values holding a
    /// backslash are rejected, since `\"` would end the value early.
    pub fn from_record(record: &CredentialsRecord) -> Result<Self, RecordError> {
        let missing: Vec<String> = INPUT_FIELDS
            .iter()
            .filter(|field| record.get(field).map_or(true, str::is_empty))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RecordError::MissingFields(missing));
        }
        if let Some(escaped) = INPUT_FIELDS
            .iter()
            .chain([&TOKEN_FIELD])
            .find(|field| record.get(field).is_some_and(|value| value.contains('\\')))
        {
            return Err(RecordError::EscapedValue(escaped.to_string()));
        }

        let field = |name: &str| record.get(name).unwrap_or_default().to_string();
        Ok(Self {
            user: field("user"),
            password: field("password"),
            org: field("org"),
            bucket: field("bucket"),
            retention: field("retention"),
            token: field(TOKEN_FIELD),
        })
    }

    pub fn has_placeholder_token(&self) -> bool {
        is_placeholder_token(&self.token)
    }
}

pub fn is_placeholder_token(token: &str) -> bool {
    let token = token.trim();
    token.is_empty() || token.eq_ignore_ascii_case(PLACEHOLDER_TOKEN)
}

//! OAuth token persistence.
//!
//! A single token record is kept as JSON on disk. The format matches the
//! `token.json` files written by other Google OAuth clients, so an existing
//! file can be reused as-is.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens expiring within this window are treated as stale.
const EXPIRY_SKEW_SECS: i64 = 10;

/// An OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    /// Bearer value presented to the API.
    pub access_token: String,

    /// Token type tag, usually `Bearer`.
    #[serde(default)]
    pub token_type: String,

    /// Long-lived value used to mint new access tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry of the access token; `None` means it does not expire.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

/// Zero timestamps (`0001-01-01T00:00:00Z`) mean "no expiry".
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|dt| dt.year() > 1))
}

impl OAuthToken {
    /// Creates a bearer token with no refresh value and no expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        }
    }

    /// Sets the refresh value.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the absolute expiry.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the expiry relative to now.
    pub fn expires_in(self, secs: i64) -> Self {
        self.with_expiry(Utc::now() + Duration::seconds(secs))
    }

    /// Returns true if the access value is expired or about to expire.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            None => false,
        }
    }

    /// Returns true if the token can be refreshed.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// File-backed token storage.
///
/// Last writer wins; there is no cross-process locking.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the token file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token record.
    ///
    /// A missing file is `TokenNotFound`; unreadable or malformed content is
    /// `TokenIo`.
    pub fn load(&self) -> ProviderResult<OAuthToken> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ProviderError::token_not_found(format!(
                    "no token file at {}",
                    self.path.display()
                ))
            } else {
                ProviderError::token_io(format!(
                    "failed to read token file {}: {}",
                    self.path.display(),
                    e
                ))
                .with_source(e)
            }
        })?;

        let token: OAuthToken = serde_json::from_str(&content).map_err(|e| {
            ProviderError::token_io(format!(
                "failed to parse token file {}: {}",
                self.path.display(),
                e
            ))
            .with_source(e)
        })?;

        if token.access_token.is_empty() && !token.can_refresh() {
            return Err(ProviderError::token_io(format!(
                "token file {} holds no usable token",
                self.path.display()
            )));
        }

        debug!("loaded token from {}", self.path.display());
        Ok(token)
    }

    /// Writes the token record, replacing any previous content.
    ///
    /// The file is restricted to the owner (`0600`) on Unix, including when
    /// it already existed with broader permissions.
    pub fn save(&self, token: &OAuthToken) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.write_error("create directory for", e))?;
        }

        let mut content = serde_json::to_vec(token).map_err(|e| {
            ProviderError::internal(format!("failed to serialize token: {}", e)).with_source(e)
        })?;
        content.push(b'\n');

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&self.path)
            .map_err(|e| self.write_error("open", e))?;
        file.write_all(&content)
            .map_err(|e| self.write_error("write", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.write_error("restrict permissions of", e))?;
        }

        info!("saved token to {}", self.path.display());
        Ok(())
    }

    fn write_error(&self, action: &str, e: io::Error) -> ProviderError {
        ProviderError::token_io(format!(
            "failed to {} token file {}: {}",
            action,
            self.path.display(),
            e
        ))
        .with_source(e)
    }
}

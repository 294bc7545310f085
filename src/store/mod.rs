//! File-backed credential store.
//!
//! One UTF-8 line per enrolled user, four colon-joined fields:
//! `username:provider:provider_user_id:api_key`. The delimiter is not
//! escaped on disk, so fields containing it are rejected before a write.
//! All writers serialize on one per-store lock held across the whole
//! read-modify-write; the guard is dropped on every exit path, so an error
//! mid-sequence cannot leak the lock.

use crate::cli::globals::ServiceConfig;
use crate::errors::{Error, Result};
use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

pub const FIELD_SEPARATOR: char = ':';

/// A user's second-factor state. `provider == None` means not enrolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub provider: Option<ProviderKind>,
    /// Provider-defined: the base32 secret for local codes, the id
    /// assigned by the remote service for push verification.
    pub provider_user_id: String,
    /// API key captured at enrollment time, empty when not applicable.
    pub api_key: String,
}

impl UserRecord {
    #[must_use]
    pub fn unenrolled(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            provider: None,
            provider_user_id: String::new(),
            api_key: String::new(),
        }
    }

    fn to_line(&self) -> Result<String> {
        let Some(provider) = self.provider else {
            return Err(Error::StoreFormat(
                "cannot serialize an unenrolled record".to_string(),
            ));
        };
        if self.provider_user_id.is_empty() {
            return Err(Error::InvalidField {
                field: "provider_user_id",
                reason: "must not be empty for an enrolled record".to_string(),
            });
        }
        for (field, value) in [
            ("username", self.username.as_str()),
            ("provider_user_id", self.provider_user_id.as_str()),
            ("api_key", self.api_key.as_str()),
        ] {
            reject_unstorable(field, value)?;
        }
        Ok(format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.username,
            provider.as_str(),
            self.provider_user_id,
            self.api_key,
            sep = FIELD_SEPARATOR,
        ))
    }

    fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        match fields.as_slice() {
            [username, provider, provider_user_id, api_key] => {
                let provider = if provider.is_empty() {
                    None
                } else {
                    Some(ProviderKind::resolve(provider)?)
                };
                Ok(Self {
                    username: (*username).to_string(),
                    provider,
                    provider_user_id: (*provider_user_id).to_string(),
                    api_key: (*api_key).to_string(),
                })
            }
            other => Err(Error::StoreFormat(format!(
                "expected 4 fields, found {}",
                other.len()
            ))),
        }
    }
}

/// Storing the delimiter would corrupt the line format on the next read.
fn reject_unstorable(field: &'static str, value: &str) -> Result<()> {
    if value.contains(FIELD_SEPARATOR) || value.contains('\n') || value.contains('\r') {
        return Err(Error::InvalidField {
            field,
            reason: format!("must not contain {FIELD_SEPARATOR:?} or line breaks"),
        });
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(Error::InvalidField {
            field: "username",
            reason: "must not be empty".to_string(),
        });
    }
    reject_unstorable("username", username)
}

/// Credential store over the file named by
/// [`ServiceConfig::credential_file`]. With no file configured, reads
/// come back empty and writes fail with [`Error::StoreDisabled`].
#[derive(Debug, Default)]
pub struct CredentialStore {
    /// Coarse, whole-store lock: concurrent saves for different users
    /// still serialize. Held across read-modify-write.
    write_lock: Mutex<()>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for `username`. Returns `None` when the store is
    /// disabled, the user has no line, or the line carries no provider.
    ///
    /// # Errors
    /// `Error::StoreIo` on read failure, `Error::StoreFormat` /
    /// `Error::UnknownProvider` when the user's line does not parse.
    pub async fn load(
        &self,
        username: &str,
        config: &ServiceConfig,
    ) -> Result<Option<UserRecord>> {
        let Some(path) = config.credential_file.as_deref() else {
            return Ok(None);
        };
        for line in read_lines(path).await? {
            if line_username(&line) == Some(username) {
                let record = UserRecord::parse_line(&line)?;
                return Ok(record.provider.is_some().then_some(record));
            }
        }
        Ok(None)
    }

    /// Write `username`'s second-factor state: replace the first matching
    /// line, remove it when `provider` is `None`, append when absent.
    ///
    /// The store lock is held from before the re-read until after the
    /// write-back, so concurrent saves cannot lose updates.
    ///
    /// # Errors
    /// `Error::StoreDisabled` with no configured file,
    /// `Error::InvalidField` for unstorable field values, `Error::StoreIo`
    /// on read/write failure.
    pub async fn save(
        &self,
        username: &str,
        config: &ServiceConfig,
        provider: Option<ProviderKind>,
        provider_user_id: &str,
        api_key: &str,
    ) -> Result<()> {
        let Some(path) = config.credential_file.as_deref() else {
            return Err(Error::StoreDisabled);
        };
        validate_username(username)?;
        let new_line = match provider {
            Some(provider) => Some(
                UserRecord {
                    username: username.to_string(),
                    provider: Some(provider),
                    provider_user_id: provider_user_id.to_string(),
                    api_key: api_key.to_string(),
                }
                .to_line()?,
            ),
            None => None,
        };

        let _guard = self.write_lock.lock().await;

        let lines = read_lines(path).await?;
        let mut out = Vec::with_capacity(lines.len() + 1);
        let mut seen = false;
        for line in lines {
            if !seen && line_username(&line) == Some(username) {
                seen = true;
                if let Some(new_line) = &new_line {
                    out.push(new_line.clone());
                }
            } else {
                out.push(line);
            }
        }
        if !seen {
            if let Some(new_line) = &new_line {
                out.push(new_line.clone());
            }
        }

        write_lines(path, &out).await?;
        debug!(user = %username, enrolled = new_line.is_some(), "credential store updated");
        Ok(())
    }
}

fn line_username(line: &str) -> Option<&str> {
    line.split(FIELD_SEPARATOR).next()
}

async fn read_lines(path: &Path) -> Result<Vec<String>> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(contents.lines().map(str::to_string).collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::StoreIo(e)),
    }
}

/// Write through a sibling temp file and rename, so readers never observe
/// a torn store.
async fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut contents = lines.join("\n");
    if !contents.is_empty() {
        contents.push('\n');
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

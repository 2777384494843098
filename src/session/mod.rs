use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session token is empty")]
    EmptyToken,
    #[error("not signed in")]
    SignedOut,
}

/// Credentials of a signed-in user. Created on login, dropped on logout.
#[derive(Clone)]
pub struct AuthSession {
    token: String,
    email: Option<String>,
    started_at: OffsetDateTime,
}

impl AuthSession {
    pub fn new(token: impl Into<String>) -> Result<Self, SessionError> {
        Self::started(token, OffsetDateTime::now_utc())
    }

    fn started(token: impl Into<String>, started_at: OffsetDateTime) -> Result<Self, SessionError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let email = email_from_token(&token);
        Ok(Self {
            token,
            email,
            started_at,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn started_at(&self) -> OffsetDateTime {
        self.started_at
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .field("started_at", &self.started_at)
            .finish()
    }
}

/// Reads the `email` claim from a JWT payload without verifying it.
fn email_from_token(token: &str) -> Option<String> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims["email"].as_str().map(str::to_string)
}

/// Owner of the current session; passed explicitly to whatever needs auth.
#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<AuthSession>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(session: Option<AuthSession>) -> Self {
        Self { current: session }
    }

    pub fn login(&mut self, token: impl Into<String>) -> Result<&AuthSession, SessionError> {
        let session = AuthSession::new(token)?;
        tracing::info!(email = session.email().unwrap_or("unknown"), "signed in");
        Ok(self.current.insert(session))
    }

    pub fn logout(&mut self) -> Option<AuthSession> {
        let ended = self.current.take();
        if ended.is_some() {
            tracing::info!("signed out");
        }
        ended
    }

    pub fn current(&self) -> Option<&AuthSession> {
        self.current.as_ref()
    }

    pub fn require(&self) -> Result<&AuthSession, SessionError> {
        self.current.as_ref().ok_or(SessionError::SignedOut)
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }
}

const SESSION_TMP_EXTENSION: &str = "json.tmp";

#[derive(Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    started_at: i64,
}

/// Persists the session token between CLI invocations.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<AuthSession>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading session file {}", self.path.display()))
            }
        };
        let record: TokenRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(%err, path = %self.path.display(), "ignoring unreadable session file");
                return Ok(None);
            }
        };
        let started_at = OffsetDateTime::from_unix_timestamp(record.started_at)
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        match AuthSession::started(record.token, started_at) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                tracing::warn!(%err, "ignoring stored session");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        let record = TokenRecord {
            token: session.token.clone(),
            started_at: session.started_at.unix_timestamp(),
        };
        let json = serde_json::to_vec(&record).context("serialising session")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }

        let tmp_path = self.path.with_extension(SESSION_TMP_EXTENSION);
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            options.mode(0o600);
        }
        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("opening temporary session file {}", tmp_path.display()))?;
        file.write_all(&json)
            .with_context(|| format!("writing temporary session file {}", tmp_path.display()))?;
        drop(file);
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("atomically persisting session file {}", self.path.display())
        })?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("removing session file {}", self.path.display()))
            }
        }
    }
}

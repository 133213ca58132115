use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthError, TokenStorage};

/// How long a session stays valid after sign-in.
pub const SESSION_LIFETIME_DAYS: i64 = 7;

const SESSION_KEY: &str = "session";

/// A signed-in user as issued by the auth service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token for the task API.
    pub token: String,
    /// Id that scopes task operations.
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session issued at `now`, valid for [`SESSION_LIFETIME_DAYS`].
    pub fn issue(token: impl Into<String>, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
            expires_at: now + Duration::days(SESSION_LIFETIME_DAYS),
        }
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Reads and writes the current [`Session`] through a [`TokenStorage`].
#[derive(Debug)]
pub struct SessionManager<S: TokenStorage> {
    storage: S,
}

impl<S: TokenStorage> SessionManager<S> {
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Records a sign-in completed by the auth service.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingField`] for a blank token or user id, or
    /// a storage error if the session cannot be persisted.
    pub fn sign_in(
        &self,
        token: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingField("token"));
        }
        if user_id.trim().is_empty() {
            return Err(AuthError::MissingField("user id"));
        }
        let session = Session::issue(token.trim(), user_id.trim(), now);
        self.save(&session)?;
        tracing::info!(user_id = %session.user_id, expires_at = %session.expires_at, "signed in");
        Ok(session)
    }

    /// Persists `session` as the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the storage write fails.
    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        let encoded = serde_json::to_string(session)?;
        self.storage.store(SESSION_KEY, &encoded)
    }

    /// The stored session, if one exists and has not expired at `now`.
    ///
    /// Expired and undecodable sessions are removed from storage.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the storage cannot be read or cleaned up.
    pub fn current(&self, now: DateTime<Utc>) -> Result<Option<Session>, AuthError> {
        let Some(raw) = self.storage.load(SESSION_KEY)? else {
            return Ok(None);
        };
        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable session");
                self.storage.remove(SESSION_KEY)?;
                return Ok(None);
            }
        };
        if session.is_expired(now) {
            tracing::info!(user_id = %session.user_id, "session expired");
            self.storage.remove(SESSION_KEY)?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Signs out by dropping the stored session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the storage write fails.
    pub fn clear(&self) -> Result<(), AuthError> {
        self.storage.remove(SESSION_KEY)
    }
}

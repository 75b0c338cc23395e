//! # Session
//!
//! The token is persisted as a plain file, the CLI's stand-in for browser
//! local storage. Its payload is decoded without checking the signature; the
//! result only drives what the client offers, never what the server allows.
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use payloads::{Claims, Role};

use crate::api::ClientError;

pub enum Action {
    Login(Claims),
    Logout,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<Claims>,
}

impl AuthState {
    pub fn reduce(self, action: Action) -> Self {
        match action {
            Action::Login(claims) => Self { user: Some(claims) },
            Action::Logout => Self { user: None },
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|claims| claims.role)
    }
}

/// Reads the claim set out of a JWT without verifying it.
pub fn decode_claims(token: &str) -> Result<Claims, ClientError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClientError::MalformedToken("expected three segments".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::MalformedToken(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ClientError::MalformedToken(e.to_string()))
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

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

    pub fn load(&self) -> Result<Option<String>, ClientError> {
        match fs::read_to_string(&self.path) {
            Ok(token) => Ok(Some(token.trim().to_string()).filter(|token| !token.is_empty())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, token)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Persisted token plus the auth state derived from it.
pub struct Session {
    tokens: TokenStore,
    token: Option<String>,
    pub state: AuthState,
}

impl Session {
    /// Unreadable or expired tokens start a logged-out session.
    pub fn restore(tokens: TokenStore) -> Result<Self, ClientError> {
        let mut session = Self {
            tokens,
            token: None,
            state: AuthState::default(),
        };

        if let Some(token) = session.tokens.load()? {
            match decode_claims(&token) {
                Ok(claims) if claims.exp > now() => {
                    session.state = session.state.reduce(Action::Login(claims));
                    session.token = Some(token);
                }
                _ => {}
            }
        }

        Ok(session)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn login(&mut self, token: String) -> Result<&Claims, ClientError> {
        let claims = decode_claims(&token)?;

        self.tokens.save(&token)?;
        self.token = Some(token);
        self.state = std::mem::take(&mut self.state).reduce(Action::Login(claims));

        self.state
            .user
            .as_ref()
            .ok_or_else(|| ClientError::MalformedToken("login produced no user".into()))
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.tokens.clear()?;
        self.token = None;
        self.state = std::mem::take(&mut self.state).reduce(Action::Logout);

        Ok(())
    }
}

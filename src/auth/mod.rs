//! Login identity and session tokens.

use crate::error::AuthError;
use crate::models::User;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

pub mod password;

pub use password::{hash_password, verify_password};

type HmacSha256 = Hmac<Sha256>;

/// An account that can be logged in and carried across requests in a
/// session cookie.
pub trait Authenticatable {
    /// Stable identifier stored in the session.
    fn auth_id(&self) -> i64;

    /// Credential material bound into session tokens. Changing it
    /// invalidates every token issued before the change.
    fn credential(&self) -> &str;

    fn session_token(&self, key: &str, remember: bool) -> Result<SessionToken, AuthError> {
        SessionToken::issue(key, self, remember)
    }
}

impl Authenticatable for User {
    fn auth_id(&self) -> i64 {
        self.id
    }

    fn credential(&self) -> &str {
        &self.password_hash
    }
}

/// Signed session token of the form `<user id>.<remember>.<signature>`.
///
/// The signature is HMAC-SHA256 keyed with the site secret over the user
/// id, the remember flag and the account credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    user_id: i64,
    remember: bool,
    signature: Vec<u8>,
}

fn mac(key: &str, user_id: i64, remember: bool, credential: &str) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| AuthError::Signing(format!("HMAC error: {e}")))?;
    mac.update(&user_id.to_be_bytes());
    mac.update(&[u8::from(remember)]);
    mac.update(credential.as_bytes());
    Ok(mac)
}

impl SessionToken {
    pub fn issue<A: Authenticatable + ?Sized>(
        key: &str,
        account: &A,
        remember: bool,
    ) -> Result<Self, AuthError> {
        let user_id = account.auth_id();
        let signature = mac(key, user_id, remember, account.credential())?
            .finalize()
            .into_bytes()
            .to_vec();
        Ok(Self {
            user_id,
            remember,
            signature,
        })
    }

    /// Identifier of the account this token claims to belong to. Only
    /// trustworthy after [`SessionToken::verify`].
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Whether the session should outlive the browser session.
    pub fn remember(&self) -> bool {
        self.remember
    }

    /// Check the signature against `account` in constant time.
    pub fn verify<A: Authenticatable + ?Sized>(&self, key: &str, account: &A) -> bool {
        account.auth_id() == self.user_id
            && mac(key, self.user_id, self.remember, account.credential())
                .is_ok_and(|mac| mac.verify_slice(&self.signature).is_ok())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.user_id,
            u8::from(self.remember),
            URL_SAFE_NO_PAD.encode(&self.signature)
        )
    }
}

impl FromStr for SessionToken {
    type Err = AuthError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.trim().splitn(3, '.');
        let (Some(id), Some(flag), Some(signature)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };
        let user_id = id.parse::<i64>().map_err(|_| AuthError::InvalidToken)?;
        let remember = match flag {
            "0" => false,
            "1" => true,
            _ => return Err(AuthError::InvalidToken),
        };
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;
        if signature.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(Self {
            user_id,
            remember,
            signature,
        })
    }
}

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::claims::{Claims, Role, TokenPurpose};
use crate::state::security_config::SecurityConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("one-time code mismatch")]
    OtpMismatch,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Who a token is about.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub email: String,
    pub role: Option<Role>,
    pub otp: Option<String>,
}

/// Issues and verifies every token the backend hands out. The signing key is
/// fixed for the life of the process; restarting with a new secret
/// invalidates all outstanding tokens.
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenService {
    pub fn new(security: &SecurityConfig) -> Self {
        Self {
            algorithm: security.algorithm,
            encoding: EncodingKey::from_secret(&security.jwt_secret),
            decoding: DecodingKey::from_secret(&security.jwt_secret),
        }
    }

    pub fn issue(
        &self,
        subject: TokenSubject,
        purpose: TokenPurpose,
        now: SystemTime,
    ) -> Result<String, TokenError> {
        let iat = epoch_secs(now)?;
        let exp = iat + purpose.ttl().as_secs() as i64;

        let claims = Claims {
            email: subject.email,
            role: subject.role,
            otp: subject.otp,
            pur: purpose,
            iat,
            exp,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn issue_session(&self, email: &str, role: Role, now: SystemTime) -> Result<String, TokenError> {
        self.issue(
            TokenSubject {
                email: email.to_string(),
                role: Some(role),
                otp: None,
            },
            TokenPurpose::Session,
            now,
        )
    }

    pub fn issue_access(&self, email: &str, role: Role, now: SystemTime) -> Result<String, TokenError> {
        self.issue(
            TokenSubject {
                email: email.to_string(),
                role: Some(role),
                otp: None,
            },
            TokenPurpose::Access,
            now,
        )
    }

    pub fn issue_otp(&self, email: &str, code: &str, now: SystemTime) -> Result<String, TokenError> {
        self.issue(
            TokenSubject {
                email: email.to_string(),
                role: None,
                otp: Some(code.to_string()),
            },
            TokenPurpose::Otp,
            now,
        )
    }

    pub fn issue_reset(&self, email: &str, now: SystemTime) -> Result<String, TokenError> {
        self.issue(
            TokenSubject {
                email: email.to_string(),
                role: None,
                otp: None,
            },
            TokenPurpose::Reset,
            now,
        )
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, SystemTime::now())
    }

    /// Checks algorithm, signature and expiry against `now`.
    ///
    /// Only the configured algorithm is accepted; a token whose header names
    /// anything else (including `none`) fails before its signature is used.
    pub fn verify_at(&self, token: &str, now: SystemTime) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below against the caller's clock, without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })?;

        let now_secs = epoch_secs(now).map_err(|_| TokenError::Malformed)?;
        if now_secs >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// As `verify_at`, plus the token must have been issued for `purpose`
    /// and carry the fields that purpose requires.
    pub fn verify_purpose(
        &self,
        token: &str,
        purpose: TokenPurpose,
        now: SystemTime,
    ) -> Result<Claims, TokenError> {
        let claims = self.verify_at(token, now)?;
        if claims.pur != purpose {
            return Err(TokenError::Malformed);
        }
        check_shape(&claims)?;
        Ok(claims)
    }

    /// Accepts session and access tokens, the two kinds that sign a user in.
    pub fn verify_session_at(&self, token: &str, now: SystemTime) -> Result<(String, Role), TokenError> {
        let claims = self.verify_at(token, now)?;
        if !claims.pur.carries_role() {
            return Err(TokenError::Malformed);
        }
        match claims.role {
            Some(role) => Ok((claims.email, role)),
            None => Err(TokenError::Malformed),
        }
    }

    /// Verifies an OTP token and compares its embedded code with `supplied`
    /// in constant time. Returns the email the code was issued to.
    pub fn verify_otp(&self, token: &str, supplied: &str, now: SystemTime) -> Result<String, TokenError> {
        let claims = self.verify_purpose(token, TokenPurpose::Otp, now)?;
        let expected = claims.otp.ok_or(TokenError::Malformed)?;
        if !constant_time_eq(expected.as_bytes(), supplied.as_bytes()) {
            return Err(TokenError::OtpMismatch);
        }
        Ok(claims.email)
    }
}

fn check_shape(claims: &Claims) -> Result<(), TokenError> {
    let role_ok = claims.pur.carries_role() == claims.role.is_some();
    let otp_ok = (claims.pur == TokenPurpose::Otp) == claims.otp.is_some();
    if role_ok && otp_ok {
        Ok(())
    } else {
        Err(TokenError::Malformed)
    }
}

fn epoch_secs(now: SystemTime) -> Result<i64, TokenError> {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| TokenError::Signing("clock is before the unix epoch".to_string()))
}

/// Constant-time byte comparison. Length is not secret here.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

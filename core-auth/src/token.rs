//! # Token Issuer
//!
//! Stateless HS256 session tokens.
//!
//! ## Overview
//!
//! A token binds the user's id, username and email to an issue time and an
//! expiry. Verification checks the signature, the algorithm, the issuer and
//! the expiry with zero leeway. Nothing is stored server-side: the
//! `users.token` column only remembers the last token handed out, so logging
//! out does not revoke a copy held elsewhere.
//!
//! Refresh is only granted inside the final hour of a token's life
//! ([`REFRESH_WINDOW_SECS`]); earlier attempts fail with
//! [`AuthError::NotRefreshable`].

use crate::error::{AuthError, Result};
use crate::types::{AuthIdentity, UserId};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `iss` claim stamped on and required of every token.
pub const TOKEN_ISSUER: &str = "clipboard-sync-server";

/// Remaining lifetime below which a token may be refreshed.
pub const REFRESH_WINDOW_SECS: i64 = 60 * 60;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn identity(&self) -> Result<AuthIdentity> {
        let user_id = UserId::from_string(&self.user_id)
            .map_err(|_| AuthError::InvalidToken("malformed user id claim".to_string()))?;
        Ok(AuthIdentity::new(
            user_id,
            self.username.clone(),
            self.email.clone(),
        ))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_default()
    }
}

/// A signed token together with its expiry.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("lifetime_hours", &self.lifetime.num_hours())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_hours: u32) -> Result<Self> {
        if secret.is_empty() {
            return Err(AuthError::Config("token secret cannot be empty".to_string()));
        }
        if lifetime_hours == 0 {
            return Err(AuthError::Config(
                "token lifetime must be at least one hour".to_string(),
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(i64::from(lifetime_hours)),
        })
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, identity: &AuthIdentity) -> Result<IssuedToken> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, identity: &AuthIdentity, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now + self.lifetime;
        let claims = Claims {
            user_id: identity.user_id.to_string(),
            username: identity.username.clone(),
            email: identity.email.clone(),
            sub: identity.user_id.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Config(format!("failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature, issuer and expiry against the instant `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is checked below against the supplied clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::InvalidToken("token expired".to_string()));
        }

        Ok(claims)
    }

    /// Verify a token and recover the caller's identity.
    pub fn authenticate(&self, token: &str) -> Result<AuthIdentity> {
        self.verify(token)?.identity()
    }

    pub fn refresh(&self, token: &str) -> Result<IssuedToken> {
        self.refresh_at(token, Utc::now())
    }

    /// Re-issue `token` if it is inside its final hour at `now`.
    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        let claims = self.verify_at(token, now)?;

        let remaining_secs = claims.exp - now.timestamp();
        if remaining_secs >= REFRESH_WINDOW_SECS {
            return Err(AuthError::NotRefreshable { remaining_secs });
        }

        self.issue_at(&claims.identity()?, now)
    }
}

/// Strip an optional `Bearer ` scheme prefix from an authorization value.
pub fn strip_bearer(header: &str) -> &str {
    let trimmed = header.trim();
    trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 168).unwrap()
    }

    fn identity() -> AuthIdentity {
        AuthIdentity::new(UserId::new(), "alice", "alice@example.com")
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = issuer();
        let identity = identity();
        let issued = issuer.issue(&identity).unwrap();

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.user_id, identity.user_id.to_string());
        assert_eq!(claims.sub, claims.user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
        assert_eq!(claims.identity().unwrap(), identity);
    }

    #[test]
    fn test_expires_at_matches_lifetime() {
        let issuer = TokenIssuer::new("s", 2).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let issued = issuer.issue_at(&identity(), now).unwrap();

        assert_eq!(
            issued.expires_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued = issuer().issue(&identity()).unwrap();
        let other = TokenIssuer::new("other-secret", 168).unwrap();

        assert!(matches!(
            other.verify(&issued.token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tampered_and_garbage_tokens_rejected() {
        let issuer = issuer();
        let issued = issuer.issue(&identity()).unwrap();
        let mut tampered = issued.token.clone();
        tampered.push('x');

        assert!(matches!(issuer.verify(&tampered), Err(AuthError::InvalidToken(_))));
        assert!(matches!(issuer.verify("abc.def.ghi"), Err(AuthError::InvalidToken(_))));
        assert!(matches!(issuer.verify(""), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new("s", 1).unwrap();
        let issued_at = Utc::now() - Duration::hours(2);
        let issued = issuer.issue_at(&identity(), issued_at).unwrap();

        assert!(matches!(
            issuer.verify(&issued.token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expiry_has_no_leeway() {
        let issuer = TokenIssuer::new("s", 1).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let issued = issuer.issue_at(&identity(), now).unwrap();

        let just_before = now + Duration::hours(1) - Duration::seconds(1);
        assert!(issuer.verify_at(&issued.token, just_before).is_ok());
        assert!(issuer.verify_at(&issued.token, now + Duration::hours(1)).is_err());
    }

    #[test]
    fn test_refresh_rejected_outside_window() {
        let issuer = issuer();
        let issued = issuer.issue(&identity()).unwrap();

        match issuer.refresh(&issued.token) {
            Err(AuthError::NotRefreshable { remaining_secs }) => {
                assert!(remaining_secs > REFRESH_WINDOW_SECS);
            }
            other => panic!("expected NotRefreshable, got {:?}", other),
        }
    }

    #[test]
    fn test_refresh_inside_window() {
        let issuer = TokenIssuer::new("s", 2).unwrap();
        let identity = identity();
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let issued = issuer.issue_at(&identity, issued_at).unwrap();

        let late = issued_at + Duration::minutes(90);
        let refreshed = issuer.refresh_at(&issued.token, late).unwrap();

        assert_eq!(refreshed.expires_at, late + Duration::hours(2));
        let claims = issuer.verify_at(&refreshed.token, late).unwrap();
        assert_eq!(claims.identity().unwrap(), identity);
    }

    #[test]
    fn test_refresh_of_expired_token_is_invalid() {
        let issuer = TokenIssuer::new("s", 1).unwrap();
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let issued = issuer.issue_at(&identity(), issued_at).unwrap();

        assert!(matches!(
            issuer.refresh_at(&issued.token, issued_at + Duration::hours(3)),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_constructor_validation() {
        assert!(matches!(TokenIssuer::new("", 1), Err(AuthError::Config(_))));
        assert!(matches!(TokenIssuer::new("s", 0), Err(AuthError::Config(_))));
    }

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc.def"), "abc.def");
        assert_eq!(strip_bearer("bearer abc.def"), "abc.def");
        assert_eq!(strip_bearer("abc.def"), "abc.def");
        assert_eq!(strip_bearer("  Bearer   abc  "), "abc");
        // a bare scheme is passed through and fails verification
        assert_eq!(strip_bearer("Bearer "), "Bearer");
    }

    #[test]
    fn test_issued_token_debug_is_redacted() {
        let issued = issuer().issue(&identity()).unwrap();
        assert!(!format!("{:?}", issued).contains(&issued.token));
    }
}

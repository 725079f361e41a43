//! Opaque identifiers and their derivation.
//!
//! A [`UserHash`] is the user's stable public key: a one-way digest of the
//! primary provider id keyed with a server secret. A [`TeamHash`] names a team
//! and is random rather than derived, so it leaks nothing about its members.
//! The hash is assigned once at first registration; re-authentication looks
//! the user up by provider id and reuses the stored hash, which keeps existing
//! session cookies valid across secret rotation.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Validation errors for opaque identifiers received from the outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierValidationError {
    /// The identifier was empty once trimmed.
    Empty,
    /// The identifier contained characters outside lowercase hex.
    NotHex,
}

impl fmt::Display for IdentifierValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier must not be empty"),
            Self::NotHex => write!(f, "identifier must be a lowercase hex digest"),
        }
    }
}

impl std::error::Error for IdentifierValidationError {}

fn validate_digest(raw: &str) -> Result<(), IdentifierValidationError> {
    if raw.is_empty() {
        return Err(IdentifierValidationError::Empty);
    }
    if !raw
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return Err(IdentifierValidationError::NotHex);
    }
    Ok(())
}

/// Server-side secret keying the user hash derivation.
///
/// Wrapped in [`Zeroizing`] so the secret is wiped when dropped.
#[derive(Clone)]
pub struct HashSecret(Zeroizing<String>);

impl HashSecret {
    /// Wrap a secret loaded from configuration.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for HashSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashSecret(..)")
    }
}

/// Opaque per-user identifier derived from the primary provider identity.
///
/// ## Invariants
/// - Always a lowercase hex SHA-256 digest.
/// - Deterministic for a given `(osu_id, secret)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserHash(String);

impl UserHash {
    /// Derive the hash for a primary provider identity.
    ///
    /// Same identity and secret always yield the same hash, so repeated
    /// authentication cannot duplicate users.
    ///
    /// # Examples
    /// ```
    /// use tourney_backend::domain::{HashSecret, UserHash};
    ///
    /// let secret = HashSecret::new("server-secret");
    /// assert_eq!(UserHash::derive(42, &secret), UserHash::derive(42, &secret));
    /// assert_ne!(UserHash::derive(42, &secret), UserHash::derive(43, &secret));
    /// ```
    pub fn derive(osu_id: i64, secret: &HashSecret) -> Self {
        let digest = Sha256::digest(format!("{osu_id}+{}", secret.as_str()).as_bytes());
        Self(hex::encode(digest))
    }

    /// Validate and wrap an identifier received from a cookie or path.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentifierValidationError> {
        let raw = raw.into();
        validate_digest(&raw)?;
        Ok(Self(raw))
    }
}

impl AsRef<str> for UserHash {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserHash> for String {
    fn from(value: UserHash) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserHash {
    type Error = IdentifierValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Opaque random identifier naming a team.
///
/// Not derived from user data; two teams created by the same user at
/// different times receive unrelated hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamHash(String);

impl TeamHash {
    /// Generate a fresh random team identifier.
    pub fn random() -> Self {
        let mut bytes = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Validate and wrap an identifier received from a query parameter.
    pub fn parse(raw: impl Into<String>) -> Result<Self, IdentifierValidationError> {
        let raw = raw.into();
        validate_digest(&raw)?;
        Ok(Self(raw))
    }
}

impl AsRef<str> for TeamHash {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TeamHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<TeamHash> for String {
    fn from(value: TeamHash) -> Self {
        value.0
    }
}

impl TryFrom<String> for TeamHash {
    type Error = IdentifierValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[test]
    fn derivation_is_deterministic_per_identity() {
        let secret = HashSecret::new("s3cret");
        assert_eq!(
            UserHash::derive(1234, &secret),
            UserHash::derive(1234, &secret)
        );
    }

    #[test]
    fn derivation_depends_on_the_secret() {
        let a = HashSecret::new("alpha");
        let b = HashSecret::new("beta");
        assert_ne!(UserHash::derive(1234, &a), UserHash::derive(1234, &b));
    }

    #[test]
    fn team_hashes_are_unique() {
        assert_ne!(TeamHash::random(), TeamHash::random());
    }

    #[rstest]
    #[case("", IdentifierValidationError::Empty)]
    #[case("UPPER", IdentifierValidationError::NotHex)]
    #[case("g0g0", IdentifierValidationError::NotHex)]
    #[case("abc 123", IdentifierValidationError::NotHex)]
    fn parse_rejects_malformed_identifiers(
        #[case] raw: &str,
        #[case] expected: IdentifierValidationError,
    ) {
        let err = UserHash::parse(raw).expect_err("malformed identifier must fail");
        assert_eq!(err, expected);
    }

    #[test]
    fn parse_accepts_derived_hashes() {
        let secret = HashSecret::new("s3cret");
        let hash = UserHash::derive(99, &secret);
        let reparsed = UserHash::parse(hash.as_ref()).expect("derived hash parses");
        assert_eq!(reparsed, hash);
    }

    #[test]
    fn secret_debug_does_not_leak() {
        let secret = HashSecret::new("visible-nowhere");
        assert!(!format!("{secret:?}").contains("visible-nowhere"));
    }
}

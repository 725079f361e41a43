//! Team aggregate and title validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::TeamHash;

/// Maximum number of players on a team.
pub const TEAM_CAPACITY: usize = 2;

/// Maximum allowed length for a team title.
pub const TEAM_TITLE_MAX: usize = 16;

/// Validation errors returned by [`TeamTitle::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamTitleValidationError {
    /// Title was empty once trimmed.
    Empty,
    /// Title exceeded [`TEAM_TITLE_MAX`] characters.
    TooLong {
        /// The enforced maximum.
        max: usize,
    },
    /// Title contained a character outside printable ASCII.
    NonPrintable,
}

impl fmt::Display for TeamTitleValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "team title must not be empty"),
            Self::TooLong { max } => write!(f, "team title must be at most {max} characters"),
            Self::NonPrintable => {
                write!(f, "team title may only contain printable ASCII characters")
            }
        }
    }
}

impl std::error::Error for TeamTitleValidationError {}

/// Validated team display title.
///
/// ## Invariants
/// - At most [`TEAM_TITLE_MAX`] characters.
/// - Printable ASCII only (space through tilde).
///
/// # Examples
/// ```
/// use tourney_backend::domain::TeamTitle;
///
/// let title = TeamTitle::new("Duo Deluxe").unwrap();
/// assert_eq!(title.as_ref(), "Duo Deluxe");
/// assert!(TeamTitle::new("seventeen chars!!").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamTitle(String);

impl TeamTitle {
    /// Validate and construct a title from owned input.
    pub fn new(title: impl Into<String>) -> Result<Self, TeamTitleValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TeamTitleValidationError::Empty);
        }
        if title.chars().count() > TEAM_TITLE_MAX {
            return Err(TeamTitleValidationError::TooLong {
                max: TEAM_TITLE_MAX,
            });
        }
        if !title.bytes().all(|b| (b' '..=b'~').contains(&b)) {
            return Err(TeamTitleValidationError::NonPrintable);
        }
        Ok(Self(title))
    }
}

impl AsRef<str> for TeamTitle {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TeamTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<TeamTitle> for String {
    fn from(value: TeamTitle) -> Self {
        value.0
    }
}

impl TryFrom<String> for TeamTitle {
    type Error = TeamTitleValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Two-player team.
///
/// ## Invariants
/// - A persisted team always has one or two members; membership lives on the
///   [`crate::domain::User`] side as `team_hash` links.
/// - `lobby_id` refers to an existing lobby or is `None`; a team holds at
///   most one assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Opaque random identifier naming the team.
    #[schema(value_type = String)]
    pub team_hash: TeamHash,
    /// Validated display title.
    #[schema(value_type = String)]
    pub title: TeamTitle,
    /// Avatar URL on the image host, set after a successful upload.
    pub avatar_url: Option<String>,
    /// Current qualifier lobby assignment, if any.
    pub lobby_id: Option<i32>,
}

impl Team {
    /// Build a new team with no avatar or lobby assignment.
    pub fn new(team_hash: TeamHash, title: TeamTitle) -> Self {
        Self {
            team_hash,
            title,
            avatar_url: None,
            lobby_id: None,
        }
    }
}

//! Pending team invites.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::{TeamHash, UserHash};

/// A pending offer from a team with a free slot to a prospective member.
///
/// ## Invariants
/// - At most one outstanding invite per `(team_hash, invited)` pair.
/// - The invited user is not already a member of the team.
/// - Only issued while the team has fewer than two members.
///
/// Consumed on accept; deleted on decline, cancel, team dissolution, or when
/// the addressee founds a team of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    /// Team offering the slot.
    #[schema(value_type = String)]
    pub team_hash: TeamHash,
    /// Member who issued the invite.
    #[schema(value_type = String)]
    pub inviter: UserHash,
    /// Prospective member the offer is addressed to.
    #[schema(value_type = String)]
    pub invited: UserHash,
}

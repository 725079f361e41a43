//! Guard and error-mapping helpers shared by the domain services.

use mockable::Clock;

use crate::domain::ports::{MembershipStore, MembershipStoreError};
use crate::domain::{Error, SignupWindow, User, UserHash};

/// Map ambient store failures onto the domain taxonomy.
///
/// Specific guard variants (`StaleLink`, `DuplicateKey`, `CapacityExceeded`,
/// `MissingRow`) carry operation-dependent meaning, so callers match on them
/// first and only fall through to this for the remainder.
pub(crate) fn map_store_error(error: MembershipStoreError) -> Error {
    match error {
        MembershipStoreError::Connection { message } => {
            Error::service_unavailable(format!("membership store unavailable: {message}"))
        }
        other => Error::internal(format!("membership store error: {other}")),
    }
}

/// Load the user behind a session identity or fail with `UserNotFound`.
pub(crate) async fn require_user<S>(store: &S, hash: &UserHash) -> Result<User, Error>
where
    S: MembershipStore + ?Sized,
{
    store
        .find_user(hash)
        .await
        .map_err(map_store_error)?
        .ok_or_else(|| Error::user_not_found("no user matches the session identity"))
}

/// Reject banned callers.
pub(crate) fn require_active(user: &User) -> Result<(), Error> {
    if user.is_banned {
        return Err(Error::forbidden("account is banned"));
    }
    Ok(())
}

/// Load the acting user and reject callers without the admin flag.
pub(crate) async fn require_admin<S>(store: &S, hash: &UserHash) -> Result<User, Error>
where
    S: MembershipStore + ?Sized,
{
    let user = require_user(store, hash).await?;
    if !user.is_admin {
        return Err(Error::forbidden("admin privileges required"));
    }
    Ok(user)
}

/// Reject sign-up mutations once the registration deadline has passed.
pub(crate) fn ensure_signups_open(window: SignupWindow, clock: &dyn Clock) -> Result<(), Error> {
    if !window.is_open_at(clock.utc()) {
        return Err(Error::forbidden("the sign-up period has closed"));
    }
    Ok(())
}

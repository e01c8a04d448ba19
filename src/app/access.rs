//! Session checks that run before the core is called.
//!
//! The ingestion core never looks at roles; these helpers decide whether a
//! session may upload or view at all.

use tracing::warn;

use crate::domain::{OwnerContext, Role};
use crate::error::AppError;

/// Build the session context, rejecting an anonymous (blank) owner id.
pub fn authenticate(owner: &str, role: Role) -> Result<OwnerContext, AppError> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(AppError::forbidden("Not logged in: an owner id is required"));
    }
    Ok(OwnerContext::new(owner, role))
}

/// Uploading (and purging) replaces data, so it needs the admin role.
pub fn require_admin(ctx: &OwnerContext) -> Result<(), AppError> {
    match ctx.role {
        Role::Admin => Ok(()),
        Role::Viewer => {
            warn!(owner = %ctx.id, "non-admin session attempted a write");
            Err(AppError::forbidden(format!(
                "Access denied: owner '{}' is not an admin",
                ctx.id
            )))
        }
    }
}

/// Viewing only needs an authenticated session of any role.
pub fn require_authenticated(ctx: &OwnerContext) -> Result<(), AppError> {
    if ctx.id.as_str().trim().is_empty() {
        return Err(AppError::forbidden("Not logged in: an owner id is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_owner_is_not_authenticated() {
        let err = authenticate("   ", Role::Admin).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(require_authenticated(&OwnerContext::viewer("")).is_err());
    }

    #[test]
    fn only_admins_may_write() {
        let admin = authenticate(" alice ", Role::Admin).unwrap();
        assert_eq!(admin.id.as_str(), "alice");
        assert!(require_admin(&admin).is_ok());

        let viewer = authenticate("bob", Role::Viewer).unwrap();
        assert!(require_authenticated(&viewer).is_ok());
        assert_eq!(require_admin(&viewer).unwrap_err().exit_code(), 5);
    }
}

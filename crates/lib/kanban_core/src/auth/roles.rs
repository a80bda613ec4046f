//! Role gate and role-change policy.

use super::{AuthError, Forbidden, Unauthenticated};
use crate::models::auth::{Principal, Role, User};

/// Require `principal` to hold at least `min_role`.
///
/// A missing principal is an authentication failure, not a permission one.
pub fn require(principal: Option<&Principal>, min_role: Role) -> Result<&Principal, AuthError> {
    let principal = principal.ok_or(Unauthenticated::MissingToken)?;
    if principal.role.rank() >= min_role.rank() {
        Ok(principal)
    } else {
        Err(Forbidden::InsufficientPermissions.into())
    }
}

/// Decide whether `actor` may set `target`'s role to `new_role`.
///
/// Clearing the generic admin gate is necessary but not sufficient: only a
/// superadmin may change their own role, grant admin or superadmin, or touch
/// an existing administrator.
pub fn authorize_role_change(
    actor: &Principal,
    target: &User,
    new_role: Role,
) -> Result<(), AuthError> {
    require(Some(actor), Role::Admin)?;
    if actor.role == Role::Superadmin {
        return Ok(());
    }
    if target.id == actor.id {
        return Err(Forbidden::RoleChange("Only superadmins can change their own role").into());
    }
    if new_role >= Role::Admin {
        return Err(Forbidden::RoleChange("Only superadmins can grant administrative roles").into());
    }
    if target.role >= Role::Admin {
        return Err(Forbidden::RoleChange("Only superadmins can modify administrators").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::now_v7(),
            email: format!("{role}@example.com"),
            role,
            display_name: role.to_string(),
        }
    }

    fn user(role: Role) -> User {
        User {
            id: Uuid::now_v7(),
            email: "target@example.com".into(),
            display_name: "Target".into(),
            role,
        }
    }

    fn as_user(p: &Principal) -> User {
        User {
            id: p.id,
            email: p.email.clone(),
            display_name: p.display_name.clone(),
            role: p.role,
        }
    }

    #[test]
    fn admin_gate_passes_admin_and_superadmin_only() {
        assert!(require(Some(&principal(Role::Admin)), Role::Admin).is_ok());
        assert!(require(Some(&principal(Role::Superadmin)), Role::Admin).is_ok());
        assert!(matches!(
            require(Some(&principal(Role::User)), Role::Admin),
            Err(AuthError::Forbidden(Forbidden::InsufficientPermissions))
        ));
    }

    #[test]
    fn superadmin_gate_passes_superadmin_only() {
        assert!(require(Some(&principal(Role::Superadmin)), Role::Superadmin).is_ok());
        assert!(require(Some(&principal(Role::Admin)), Role::Superadmin).is_err());
        assert!(require(Some(&principal(Role::User)), Role::Superadmin).is_err());
    }

    #[test]
    fn user_gate_passes_everyone() {
        for role in [Role::User, Role::Admin, Role::Superadmin] {
            assert!(require(Some(&principal(role)), Role::User).is_ok());
        }
    }

    #[test]
    fn missing_principal_is_unauthenticated() {
        assert!(matches!(
            require(None, Role::User),
            Err(AuthError::Unauthenticated(Unauthenticated::MissingToken))
        ));
    }

    #[test]
    fn admin_cannot_elevate_self_to_superadmin() {
        let admin = principal(Role::Admin);
        assert!(require(Some(&admin), Role::Admin).is_ok());
        let err = authorize_role_change(&admin, &as_user(&admin), Role::Superadmin).unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(Forbidden::RoleChange(_))));
    }

    #[test]
    fn admin_cannot_change_own_role_at_all() {
        let admin = principal(Role::Admin);
        assert!(authorize_role_change(&admin, &as_user(&admin), Role::User).is_err());
    }

    #[test]
    fn admin_cannot_grant_admin_or_superadmin() {
        let admin = principal(Role::Admin);
        assert!(authorize_role_change(&admin, &user(Role::User), Role::Admin).is_err());
        assert!(authorize_role_change(&admin, &user(Role::User), Role::Superadmin).is_err());
    }

    #[test]
    fn admin_cannot_demote_another_admin() {
        let admin = principal(Role::Admin);
        assert!(authorize_role_change(&admin, &user(Role::Admin), Role::User).is_err());
    }

    #[test]
    fn admin_may_set_a_regular_user_role() {
        let admin = principal(Role::Admin);
        assert!(authorize_role_change(&admin, &user(Role::User), Role::User).is_ok());
    }

    #[test]
    fn superadmin_may_do_anything() {
        let root = principal(Role::Superadmin);
        assert!(authorize_role_change(&root, &user(Role::User), Role::Superadmin).is_ok());
        assert!(authorize_role_change(&root, &user(Role::Admin), Role::User).is_ok());
        assert!(authorize_role_change(&root, &as_user(&root), Role::Admin).is_ok());
    }

    #[test]
    fn regular_user_fails_the_generic_gate_first() {
        let err = authorize_role_change(&principal(Role::User), &user(Role::User), Role::User)
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Forbidden(Forbidden::InsufficientPermissions)
        ));
    }
}

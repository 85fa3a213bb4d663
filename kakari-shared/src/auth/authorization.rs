/// Authorization helpers and permission checks
///
/// Every check compares identifiers. The acting user is carried as an
/// [`Actor`] resolved from the access token, and resources expose the ID of
/// their owner or creator.
///
/// # Permission Model
///
/// 1. **Admin role**: users whose roles contain `"admin"` pass every ownership check
/// 2. **Ownership**: project owners and task creators may manage their own resources
/// 3. **Self-service**: users may edit their own profile
///
/// # Example
///
/// ```
/// use kakari_shared::auth::authorization::{require_owner_or_admin, Actor};
/// use uuid::Uuid;
///
/// let owner = Uuid::new_v4();
/// let actor = Actor::new(owner, vec!["user".to_string()]);
/// assert!(require_owner_or_admin(&actor, owner).is_ok());
///
/// let stranger = Actor::new(Uuid::new_v4(), vec!["user".to_string()]);
/// assert!(require_owner_or_admin(&stranger, owner).is_err());
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::User;

/// Role name granting administrative rights
pub const ADMIN_ROLE: &str = "admin";

/// Role given to newly registered users
pub const DEFAULT_ROLE: &str = "user";

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Actor is neither the owner of the resource nor an admin
    #[error("Not authorized to modify this resource")]
    NotOwner,

    /// Actor lacks the admin role
    #[error("Admin role required")]
    NotAdmin,
}

/// The authenticated identity attempting an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User ID (token subject)
    pub id: Uuid,

    /// Roles held by the user at request time
    pub roles: Vec<String>,
}

impl Actor {
    /// Creates an actor from an ID and its roles
    pub fn new(id: Uuid, roles: Vec<String>) -> Self {
        Self { id, roles }
    }

    /// Builds the actor for a freshly loaded user
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            roles: user.roles.clone(),
        }
    }

    /// Whether the actor holds the admin role
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }

    /// Whether the actor is the given user
    pub fn is(&self, user_id: Uuid) -> bool {
        self.id == user_id
    }
}

/// Passes when the actor owns the resource or is an admin
pub fn require_owner_or_admin(actor: &Actor, owner_id: Uuid) -> Result<(), AuthzError> {
    if actor.is(owner_id) || actor.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

/// Passes only for admins
pub fn require_admin(actor: &Actor) -> Result<(), AuthzError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_actor() -> Actor {
        Actor::new(Uuid::new_v4(), vec![DEFAULT_ROLE.to_string()])
    }

    fn admin_actor() -> Actor {
        Actor::new(
            Uuid::new_v4(),
            vec![DEFAULT_ROLE.to_string(), ADMIN_ROLE.to_string()],
        )
    }

    #[test]
    fn test_is_admin() {
        assert!(!user_actor().is_admin());
        assert!(admin_actor().is_admin());
        assert!(!Actor::new(Uuid::new_v4(), vec![]).is_admin());
    }

    #[test]
    fn test_owner_passes() {
        let actor = user_actor();
        assert!(require_owner_or_admin(&actor, actor.id).is_ok());
    }

    #[test]
    fn test_admin_passes_for_foreign_resource() {
        assert!(require_owner_or_admin(&admin_actor(), Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_stranger_is_rejected() {
        let result = require_owner_or_admin(&user_actor(), Uuid::new_v4());
        assert_eq!(result, Err(AuthzError::NotOwner));
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&admin_actor()).is_ok());
        assert_eq!(require_admin(&user_actor()), Err(AuthzError::NotAdmin));
    }

    #[test]
    fn test_role_match_is_exact() {
        let actor = Actor::new(Uuid::new_v4(), vec!["administrator".to_string()]);
        assert!(!actor.is_admin());
    }
}

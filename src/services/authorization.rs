//! Behörighetskontroll vid API-gränsen. Kärntjänsterna anropar aldrig detta.

use std::collections::HashSet;

use crate::models::{Permission, Role, User, ROLE_PERMISSIONS};
use crate::utils::{AppError, AppResult};

/// Roll -> behörighet-tabell som kontrolleras mot en användares roller
#[derive(Debug, Clone, Copy)]
pub struct Authorizer {
    table: &'static [(Role, &'static [Permission])],
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(ROLE_PERMISSIONS)
    }
}

impl Authorizer {
    pub fn new(table: &'static [(Role, &'static [Permission])]) -> Self {
        Self { table }
    }

    pub fn permissions_for(&self, role: Role) -> &'static [Permission] {
        self.table
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, perms)| *perms)
            .unwrap_or(&[])
    }

    pub fn has_permission(&self, roles: &HashSet<Role>, permission: Permission) -> bool {
        roles
            .iter()
            .any(|role| self.permissions_for(*role).contains(&permission))
    }

    pub fn require(&self, user: &User, permission: Permission) -> AppResult<()> {
        if self.has_permission(&user.roles, permission) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "{} saknar {:?}",
                user.username, permission
            )))
        }
    }
}

use super::order::UserId;
use crate::error::{OrderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated caller of a workflow operation.
///
/// Issued by the outer layer after token verification and passed into every
/// call explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn customer(user_id: u64) -> Self {
        Self {
            user_id: UserId(user_id),
            role: Role::Customer,
        }
    }

    pub fn admin(user_id: u64) -> Self {
        Self {
            user_id: UserId(user_id),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(OrderError::Forbidden(format!(
                "user {} may not {action}",
                self.user_id
            )))
        }
    }
}

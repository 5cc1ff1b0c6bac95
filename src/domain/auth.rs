use super::UserId;

/// Who is making the request, resolved from the bearer token.
///
/// Built once per request and passed down explicitly; services never read
/// credentials from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl CallerContext {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }
}

/// Caller lacks the capability an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied;

/// Policy: catalog writes are reserved for staff.
pub fn require_admin(caller: &CallerContext) -> Result<(), AccessDenied> {
    if caller.is_admin {
        Ok(())
    } else {
        Err(AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        assert_eq!(require_admin(&CallerContext::admin(UserId::new())), Ok(()));
        assert_eq!(
            require_admin(&CallerContext::user(UserId::new())),
            Err(AccessDenied)
        );
    }
}

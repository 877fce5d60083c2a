//! Request-level and object-level access checks.
//!
//! Handlers run [`authorize`] before touching the store and
//! [`authorize_object`] once the target has been loaded. Neither check is
//! ever skipped for read-only methods; they simply pass.

use axum::http::Method;

use crate::{auth::Actor, error::AppError};

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Request-level policy attached to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    AllowAny,
    Authenticated,
    AuthenticatedOrReadOnly,
}

impl Access {
    pub fn has_permission(self, method: &Method, actor: &Actor) -> bool {
        match self {
            Access::AllowAny => true,
            Access::Authenticated => actor.is_authenticated(),
            Access::AuthenticatedOrReadOnly => is_safe_method(method) || actor.is_authenticated(),
        }
    }
}

/// Entities with a single owning user.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

pub fn has_object_permission(method: &Method, actor: &Actor, target: &impl Owned) -> bool {
    is_safe_method(method) || actor.user().is_some_and(|user| user.id == target.owner_id())
}

pub fn authorize(access: Access, method: &Method, actor: &Actor) -> Result<(), AppError> {
    if access.has_permission(method, actor) {
        Ok(())
    } else if actor.is_authenticated() {
        Err(AppError::Forbidden)
    } else {
        Err(AppError::unauthenticated())
    }
}

pub fn authorize_object(
    method: &Method,
    actor: &Actor,
    target: &impl Owned,
) -> Result<(), AppError> {
    if has_object_permission(method, actor, target) {
        Ok(())
    } else if actor.is_authenticated() {
        Err(AppError::Forbidden)
    } else {
        Err(AppError::unauthenticated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    struct Thing(i64);

    impl Owned for Thing {
        fn owner_id(&self) -> i64 {
            self.0
        }
    }

    fn user(id: i64) -> Actor {
        Actor::User(AuthUser {
            id,
            username: format!("user{}", id),
        })
    }

    #[test]
    fn read_only_methods_pass_for_anyone() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(Access::AuthenticatedOrReadOnly.has_permission(&method, &Actor::Anonymous));
            assert!(has_object_permission(&method, &Actor::Anonymous, &Thing(1)));
            assert!(has_object_permission(&method, &user(2), &Thing(1)));
        }
    }

    #[test]
    fn mutations_need_an_actor() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(!Access::AuthenticatedOrReadOnly.has_permission(&method, &Actor::Anonymous));
            assert!(Access::AuthenticatedOrReadOnly.has_permission(&method, &user(1)));
        }
    }

    #[test]
    fn authenticated_policy_covers_reads_too() {
        assert!(!Access::Authenticated.has_permission(&Method::GET, &Actor::Anonymous));
        assert!(Access::Authenticated.has_permission(&Method::GET, &user(1)));
        assert!(Access::AllowAny.has_permission(&Method::DELETE, &Actor::Anonymous));
    }

    #[test]
    fn only_the_owner_may_mutate() {
        assert!(has_object_permission(&Method::PATCH, &user(1), &Thing(1)));
        assert!(!has_object_permission(&Method::PATCH, &user(2), &Thing(1)));
        assert!(!has_object_permission(&Method::DELETE, &Actor::Anonymous, &Thing(1)));
    }

    #[test]
    fn failures_map_to_401_or_403() {
        assert!(matches!(
            authorize(Access::AuthenticatedOrReadOnly, &Method::POST, &Actor::Anonymous),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authorize_object(&Method::PUT, &user(2), &Thing(1)),
            Err(AppError::Forbidden)
        ));
        assert!(authorize_object(&Method::PUT, &user(1), &Thing(1)).is_ok());
    }
}

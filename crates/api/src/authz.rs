//! API-side authorization guard.
//!
//! Handlers call `require` before touching services; the domain and infra
//! layers stay auth-agnostic.

use stockroom_auth::{authorize, AuthzError, Permission};

use crate::context::PrincipalContext;

pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), AuthzError> {
    authorize(&principal.to_principal(), &Permission::from_static(permission))
}

#[cfg(test)]
mod tests {
    use stockroom_auth::Role;
    use stockroom_core::UserId;

    use super::*;

    #[test]
    fn staff_can_read_products_but_not_delete_them() {
        let ctx = PrincipalContext::new(UserId::new(), "clerk", vec![Role::STAFF]);
        assert!(require(&ctx, "products.read").is_ok());
        assert_eq!(
            require(&ctx, "products.delete"),
            Err(AuthzError::Forbidden("products.delete".into()))
        );
    }
}

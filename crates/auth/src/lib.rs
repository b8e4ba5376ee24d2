//! `stockroom-auth`: authentication and authorization boundary.
//!
//! Roles, permissions and the authorization check are pure. Token signing
//! (`jsonwebtoken`) and password hashing (`argon2`) live here too so the HTTP
//! layer only deals with headers and status codes.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod tokens;
pub mod user;

pub use authorize::{authorize, AuthzError, Principal};
pub use claims::{validate_claims, JwtClaims, TokenUse, TokenValidationError};
pub use password::{hash_password, validate_password_strength, verify_password, PasswordError};
pub use permissions::{role_permissions, Permission};
pub use roles::Role;
pub use tokens::{TokenConfig, TokenError, TokenPair, TokenService};
pub use user::{NewUser, User, UserPatch, UserStatus};

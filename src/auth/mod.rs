//! Authentication and authorization module

pub mod guard;
pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use guard::{check_roles, AccessPolicy, GuardChain};
pub use identity::{IdentityResolver, Principal};
pub use jwt::{Claims, JwtService};
pub use middleware::{extract_credential, guard_middleware, RouteGuard};
pub use password::PasswordHasher;

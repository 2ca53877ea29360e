//! 数据模型模块

pub mod auth;
pub mod environment_permission;
pub mod role;
pub mod role_assignment;
pub mod user;

pub use environment_permission::{EnvironmentPermission, PermittedAction};
pub use role::Role;
pub use role_assignment::{AssignmentState, RoleAssignment};
pub use user::{User, UserRole};

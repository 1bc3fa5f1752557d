pub mod auth;
pub mod capabilities;
pub mod file_validation;

pub use auth::{AuthenticatedUser, Claims};
pub use capabilities::{Capability, CapabilityPolicy, RoleCapabilityPolicy};

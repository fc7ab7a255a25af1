pub mod permissions;
pub mod resolver;

pub use permissions::{Caller, DenialReason, PermissionCheck, PermissionChecker, Requirement};
pub use resolver::Resolver;

pub mod id;
pub mod roles;
pub mod types;

//! Domain models shared across the identity crates.

pub mod identity;
pub mod institution;
pub mod notification;
pub mod profile;
pub mod role;

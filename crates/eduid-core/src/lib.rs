//! eduid core: domain model of platform staff identities, the
//! contracts of the identity provider and its neighbours, and the
//! projection of profiles onto the provider's attribute bag.

pub mod attributes;
pub mod error;
pub mod gateway;
pub mod models;
pub mod projection;

pub use error::{EduIdError, EduIdResult, NotificationError, ValidationError};
pub use projection::{AttributeProjector, ParseAnomaly, ProfilePatch};

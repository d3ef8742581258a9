//! eduid idp: adapters behind the core's gateway contracts. An
//! in-memory identity provider, institution validators, and
//! notification gateways.

pub mod error;
pub mod institution;
pub mod memory;
pub mod notification;

pub use error::IdpError;
pub use institution::{HttpInstitutionValidator, StaticInstitutionValidator};
pub use memory::InMemoryIdentityGateway;
pub use notification::{LogNotificationGateway, OutboxNotificationGateway};

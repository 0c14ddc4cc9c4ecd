//! Port traits at every collaborator seam of the domain.

pub mod catalog_port;
pub mod clock_port;
pub mod config_port;
pub mod provider_port;
pub mod store_port;

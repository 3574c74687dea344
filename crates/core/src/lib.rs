//! # Endorsement Core
//!
//! Domain model and service logic for maritime service endorsements.
//!
//! An endorsement records that an organization vouches for a service, optionally
//! narrowed to a single user. Records are keyed by `(orgMrn, serviceMrn)`.
//!
//! ## Features
//!
//! - **Types**: `Endorsement`, `EndorsementList`
//! - **Pagination**: `PageRequest`, `Page`
//! - **Capabilities**: `EndorsementStore` and `AccessControl` traits
//! - **Service**: `EndorsementService` (upsert, lookups, listings, delete)
//! - **Access policy**: `OrgMembershipAccess`
//! - **In-memory store**: `MemoryEndorsementStore`

#![warn(missing_docs)]

pub mod access;
pub mod error;
pub mod memory;
pub mod page;
pub mod ports;
pub mod service;
pub mod types;

pub use access::{Caller, OrgMembershipAccess, DEFAULT_ADMIN_ROLE};
pub use error::{EndorsementError, Result};
pub use memory::MemoryEndorsementStore;
pub use page::{Page, PageRequest, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
pub use ports::{AccessControl, EndorsementStore};
pub use service::EndorsementService;
pub use types::{Endorsement, EndorsementList};

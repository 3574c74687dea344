//! Axum-based API server for endorsements.
//!
//! This crate provides:
//! - `POST /oidc/endorsements` - Create or re-assign an endorsement
//! - `GET /oidc/endorsements/:serviceMrn` - Endorsements of a service (paged)
//! - `POST /oidc/endorsement-list` - Endorsement lists for a batch of services
//! - `GET /oidc/endorsements-by/:serviceLevel/:orgMrn` - Endorsements by level and org (paged)
//! - `DELETE /oidc/endorsements/:serviceMrn/:orgMrn` - Delete an endorsement
//! - `GET /oidc/endorsement-by/:serviceMrn/:orgMrn` - Single endorsement
//! - `GET /oidc/endorsed-children/:parentMrn[/:orgMrn]` - Endorsed children (paged)

#![warn(missing_docs)]

pub mod config;
pub mod logging;
/// API server runtime and in-process app builder.
pub mod server;

//! HTTP handlers for cadenza-api.
//!
//! Every `/api/v1` handler takes a [`crate::RequireAuth`] extractor, so an
//! unauthenticated request is rejected before the handler body runs.

pub mod analytics;
pub mod audit;
pub mod health;
pub mod hierarchy;
pub mod permissions;
pub mod templates;
pub mod versions;

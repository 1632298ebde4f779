//! # cadenza-core
//!
//! Core types, traits, and tag governance logic for cadenza.
//!
//! This crate holds the data model, the repository traits that `cadenza-db`
//! implements, the pure algorithms (hierarchy projection, correlation, the
//! version logger), and the services the HTTP layer calls.

pub mod correlation;
pub mod error;
pub mod events;
pub mod hierarchy;
pub mod memory;
pub mod notification;
pub mod services;
pub mod tags;
pub mod traits;
pub mod uuid_utils;
pub mod versioning;

// Re-export commonly used types at crate root
pub use correlation::{related_tags, related_tags_with_limit, DEFAULT_RELATED_LIMIT};
pub use error::{Error, Result};
pub use events::{EventActor, EventBus, EventEnvelope, ServerEvent};
pub use hierarchy::{ancestors, build_hierarchy, descendants, would_create_cycle};
pub use memory::InMemoryStore;
pub use notification::{describe_permission_change, role_label};
pub use services::{Governance, Stores};
pub use tags::*;
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
pub use versioning::TagVersionLogger;

//! Core types for Home Assistant
//!
//! This crate provides the fundamental types shared by the registries,
//! the service registry and the components: EntityId, Context, ServiceCall
//! and the slug helpers used by configuration validation.

mod context;
mod entity_id;
mod service_call;
pub mod slug;

pub use context::Context;
pub use entity_id::{split_entity_id, EntityId, EntityIdError};
pub use service_call::{ServiceCall, SupportsResponse};
pub use slug::{is_slug, slugify};

//! Home Assistant Built-in Components
//!
//! This crate contains implementations of Home Assistant's built-in components
//! (integrations) that don't require Python.

pub mod auto_group;
pub mod group;

pub use auto_group::{async_setup, AutoGroupConfig, BuiltGroup, GroupService, SetupReport};
pub use group::{register_group_services, GroupEntry, GroupStore};

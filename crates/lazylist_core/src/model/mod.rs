//! Domain model for containers and their shopping lists.
//!
//! # Responsibility
//! - Define the container -> category -> item hierarchy used by the engine.
//! - Keep the wire naming (`camelCase`) in one place via serde attributes.
//!
//! # Invariants
//! - Every entity owns its data; cloning never aliases caller state.
//! - Category and item identity is the string `id`, never the name.
//!
//! # See also
//! - crate::sync::sanitize for the persisted-shape rules.

pub mod shopping;

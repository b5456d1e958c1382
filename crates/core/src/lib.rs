//! Gobi Eats Core - Shared types library.
//!
//! This crate provides common types used across all Gobi Eats components:
//! - `storefront` - cart, checkout, and payment client core
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This
//! keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

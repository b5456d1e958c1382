//! Gobi Eats Storefront core library.
//!
//! The headless half of the food-delivery storefront client: guest and
//! account carts, the one-time migration between them at sign-in, the
//! cart view model the UI renders from, checkout, and QPay invoice
//! polling. The presentation layer embeds this crate and owns routing,
//! rendering, and token issuance.
//!
//! # Architecture
//!
//! - The guest cart lives in client-side persistent storage
//!   ([`storage`]); the account cart lives on the delivery backend
//!   ([`backend`]).
//! - Exactly one of the two is authoritative at any moment, selected by
//!   the auth session ([`cart::sync`]).
//! - All user-visible failures go through the [`notify`] bus; internal
//!   detail stays in `tracing` output.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod backend;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod notify;
pub mod payment;
pub mod state;
pub mod storage;
pub mod telemetry;

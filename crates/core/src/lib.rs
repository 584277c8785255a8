//! Jewellery Core - Shared types library.
//!
//! This crate provides common types used across the storefront components:
//! - `storefront` - Cart controller, cart service client and rendering
//! - `cli` - Command-line driver for the cart against a live backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

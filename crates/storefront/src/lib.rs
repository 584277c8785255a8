//! Jewellery storefront cart.
//!
//! A client for the store's session-scoped cart API together with the
//! controller that keeps the cart panel in step with it. The page itself is
//! modelled headlessly (see [`ui`]), so every interaction can be driven and
//! inspected from Rust.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod controller;
pub mod error;
pub mod service;
pub mod ui;

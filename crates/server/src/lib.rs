//! Emporium server library.
//!
//! Catalog, account, cart and favourites JSON API. Exposed as a library so
//! the router can be driven from integration tests over the in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;

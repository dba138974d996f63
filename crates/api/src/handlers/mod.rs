//! HTTP request handlers, grouped by resource.

pub mod auth;
pub mod definition;
pub mod inbox;
pub mod instance;

//! Logue - blog section content service
//!
//! Index pages list dated Logue pages four at a time; pages carry authors,
//! tags, categories, a gallery, related links and a structured body.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, validated JSON extractor
//! - `modules`: handlers grouped by resource (transactions, health, metrics)
//! - `router`: assembles the routes and tower layers

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiContext};

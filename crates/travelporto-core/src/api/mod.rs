//! REST API client module for the STCP transit backend.
//!
//! This module provides the `ApiClient` for fetching stops, routes, route
//! stop listings and arrival boards, and the `TransitApi` trait the request
//! caches are written against.
//!
//! Every request carries the `X-API-Key` header and every response is a
//! `{ "data": ... }` envelope.

pub mod client;
pub mod error;
pub mod source;

pub use client::ApiClient;
pub use error::{ApiError, SharedError};
pub use source::TransitApi;

//! Filtering, pagination and saved-list core for the scholar directory.
//!
//! The [`scholars`] module holds the domain: filter state, derived filter options, the
//! predicate/query builder, pagination, saved lists and the store contract. The HTTP surface
//! lives in [`scholars::router`] so the API service only has to wire state and middleware.

pub mod config;
pub mod error;
pub mod scholars;
pub mod telemetry;

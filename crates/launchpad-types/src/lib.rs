//! Shared domain and wire types for Launchpad.
//!
//! `models` holds the domain records the API hands out, `api` the request and
//! response bodies. Neither knows about storage.

pub mod api;
pub mod models;

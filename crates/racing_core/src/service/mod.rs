//! Transport-facing use-case services.
//!
//! # Responsibility
//! - Translate request envelopes into repository calls.
//! - Map repository errors onto transport status codes.
//! - Keep transport layers decoupled from storage details.

pub mod racing_service;

//! Storage abstractions for service layer
//!
//! The record set is persisted as one JSON document, replaced wholesale on save.

pub mod snapshot;

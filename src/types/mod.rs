//! Core type definitions.
//!
//! Identity types shared across modules.

mod authoring_id;

pub use authoring_id::AuthoringId;

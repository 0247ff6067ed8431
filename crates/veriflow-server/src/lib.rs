//! HTTP front end for the verification workflow.
//!
//! Thin layer over `veriflow-core`: decodes the inbound multipart form,
//! runs the workflow, and returns the structured outcome with its full log.

pub mod routes;

pub use routes::{router, AppState};

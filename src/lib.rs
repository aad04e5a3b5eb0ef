//! Library crate backing the `newsceg-backend` binary: the CEG pipeline,
//! its external collaborator traits, and the read/ops HTTP surface are all
//! exposed here so `main.rs` stays a thin entry point and the top-level
//! `tests/` suite can exercise real business logic instead of re-deriving it.

pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

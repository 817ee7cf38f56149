//! PostgreSQL persistence for the rota scheduling engine.
//!
//! - [`config`] resolves the connection URL.
//! - [`pool`] creates pools and applies the embedded migrations.
//! - [`models`] holds the row types; [`template`] the weekly-template
//!   document stored on each plan.
//! - [`queries`] holds one module of query functions per table.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
pub mod template;

#![forbid(unsafe_code)]

//! Persistence for the enrollment and progress engine.
//!
//! [`repository`] defines the storage contracts plus an in-memory backend;
//! [`sqlite`] implements them on `SQLite` via sqlx.

pub mod repository;
pub mod sqlite;

#![forbid(unsafe_code)]

//! Domain model and progress arithmetic for the enrollment engine.
//!
//! Everything here is synchronous and side-effect free: entities validate
//! on construction, and the `progress` module derives enrollment state from
//! ledger counts. Persistence and orchestration live in the `storage` and
//! `services` crates.

pub mod error;
pub mod model;
pub mod progress;
pub mod time;

pub use error::Error;
pub use time::{Clock, fixed_now};

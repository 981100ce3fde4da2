//! Grid core domain crate.
//!
//! Pure types, constants and rules shared by every other crate. Nothing in
//! here performs I/O: persistence lives in `grid-db`, delivery in
//! `grid-events` and registry access in `grid-registry`.

pub mod catalog;
pub mod channels;
pub mod constraints;
pub mod error;
pub mod job_kind;
pub mod lifecycle;
pub mod queue_health;
pub mod types;

//! Domain layer of the gesture-to-text service.
//!
//! Holds the error taxonomy, configuration model, recognition value types,
//! the letter confirmation state machine and the session model. Nothing in
//! this crate performs I/O; concrete collaborators live in
//! `signdesk-infrastructure`.

pub mod config;
pub mod confirmation;
pub mod error;
pub mod recognition;
pub mod session;

pub use error::{Result, SignDeskError};

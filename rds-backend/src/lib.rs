//! # rds-backend
//!
//! Remote-session display backend. Owns one [`rds_core::SessionController`]
//! and drives it from a single-threaded control loop: a TCP listener for
//! clients, a software renderer that paints into the framebuffer every
//! tick, and an external program for message prompts.

pub mod config;
pub mod display;
pub mod input;
pub mod prompt;
pub mod service;

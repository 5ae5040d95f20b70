//! Foundation types and traits for g15control.
//!
//! This crate contains the backend-agnostic types shared by all g15control
//! crates: LCD geometry, button decoding, the drawing surface trait,
//! configuration, the shared command queue, and error types.

pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod queue;
pub mod surface;

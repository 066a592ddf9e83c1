//! UI Module
//!
//! This module exports the UI components for the terminal wallet:
//!
//! - `app`: Application state and event loop
//! - `views`: Rendering functions for all UI views
//!
//! The UI module provides a complete terminal interface for the connected
//! wallet: balance, transfer submission, and recent transactions.

mod app;
mod views;

pub use app::{run_app, App};

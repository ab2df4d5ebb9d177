//! Terminal dashboard for Brent oil change-point analysis results.
//!
//! The analysis itself runs elsewhere; this crate talks to its REST API,
//! normalises transport failures, and renders the results as text cards.

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod render;

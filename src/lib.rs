//! weatherdeck library
//!
//! Weather dashboard core: a call budget and response cache in front of the
//! Tomorrow.io forecast API, with stale fallback and background refresh.
//! The binary in `main.rs` is a thin shell over these modules.

pub mod app;
pub mod batch;
pub mod budget;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod forecaster;
pub mod insights;
pub mod provider;
pub mod refresh;
pub mod ui;

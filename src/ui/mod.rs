//! Plain-text rendering for weatherdeck
//!
//! Everything here returns a `String`; the binary decides where it goes.

pub mod dashboard;
pub mod sparkline;
pub mod usage;

pub use dashboard::{render_city, render_dashboard, render_dashboard_json};
pub use usage::{render_search, render_usage};

//! DriverKit example page server
//!
//! Serves fixed HTML pages over plain HTTP GET for tests that need a real
//! page to navigate to: `/example.html`, `/frame_a.html` to `/frame_d.html`
//! and `/health`.

pub mod error;
pub mod pages;
pub mod server;

pub use error::{FixtureError, FixtureResult};
pub use server::{FixtureHandle, FixtureServer};

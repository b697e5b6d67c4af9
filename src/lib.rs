//! Track-based rendering of geological core data.
//!
//! A [`Scene`](scene::Scene) lays out tracks (rulers, core sections, core
//! images) against a shared depth axis and draws them through any
//! [`Driver`](draw::Driver): on-screen Cairo contexts, PDF, SVG and PNG
//! files, or a canvas script. Core images are served by the asynchronous,
//! multi-resolution [`ImageCache`](cache::ImageCache).

pub mod cache;
pub mod config;
pub mod draw;
pub mod model;
pub mod scene;
pub mod tracks;
pub mod units;

pub use cache::ImageCache;
pub use config::Config;
pub use scene::Scene;
pub use units::{Length, Unit};

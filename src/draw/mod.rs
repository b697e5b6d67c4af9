//! Backend-neutral drawing.
//!
//! - [`Driver`]: the primitive contract every output backend implements
//! - [`CairoDriver`]: raster, PDF and SVG output through Cairo
//! - [`ScriptDriver`]: a self-contained canvas script for web pages
//! - [`GraphicsContext`]: the convenience façade tracks draw through

pub mod cairo;
pub mod color;
pub mod context;
pub mod driver;
pub mod fill;
pub mod font;
pub mod geometry;
pub mod script;
pub mod text;

#[cfg(test)]
pub(crate) mod recording;

pub use self::cairo::CairoDriver;
pub use color::{BLACK, Color, SAND};
pub use context::{GraphicsContext, ImageLoader, TextAlign};
pub use driver::{Driver, DriverError, ImagePlacement, ImageSource, TextDirection};
pub use fill::{Fill, GradientAxis, LineStyle};
pub use font::FontDescriptor;
pub use geometry::{ArcStyle, Shape};
pub use script::ScriptDriver;

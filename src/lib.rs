pub mod blob;
pub mod camera;
pub mod correspondence;
pub mod detected_points;
pub mod error;
pub mod io;
pub mod optimization;
pub mod pipeline;
pub mod synthetic;
pub mod template;
pub mod types;
pub mod visualization;

pub use error::{PoseError, Result};

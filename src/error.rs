use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoseError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no contour approximates to {expected} vertices ({contours} contours inspected)")]
    NoMatch { expected: usize, contours: usize },

    #[error("degenerate geometry: {0}")]
    GeometryDegenerate(String),

    #[error("pose solver failed: {0}")]
    Solver(String),

    #[error("visualization error: {0}")]
    Visualization(String),
}

impl PoseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PoseError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoseError>;

use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::{PoseError, Result};

/// Serializes an object to a pretty-printed JSON file.
pub fn object_to_json<T: Serialize>(output_path: impl AsRef<Path>, object: &T) -> Result<()> {
    let output_path = output_path.as_ref();
    let j = serde_json::to_string_pretty(object)?;
    let mut file =
        std::fs::File::create(output_path).map_err(|e| PoseError::io(output_path, e))?;
    file.write_all(j.as_bytes())
        .map_err(|e| PoseError::io(output_path, e))?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let file_path = file_path.as_ref();
    let contents = read_text(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub(crate) fn read_text(file_path: &Path) -> Result<String> {
    std::fs::read_to_string(file_path).map_err(|e| PoseError::io(file_path, e))
}

/// Formats a 3-vector the way the CLI prints rotation and translation.
pub fn format_vec3(v: &nalgebra::Vector3<f64>) -> String {
    format!("[{:.6}, {:.6}, {:.6}]", v.x, v.y, v.z)
}

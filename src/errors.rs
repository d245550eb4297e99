//! Centralized error handling for CubeVista
//!
//! This module provides structured error types to replace the generic `Box<dyn Error>`
//! used throughout the codebase, enabling better error context and type safety.

use std::fmt;

/// Main error type for CubeVista operations
#[derive(Debug)]
pub enum CubeVistaError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Variable not found in NetCDF file
    VariableNotFound { var: String },

    /// A name lookup matched more than one variable
    AmbiguousVariable { name: String, matches: Vec<String> },

    /// Cell bounds cannot be derived for a coordinate axis
    UnsupportedGeometry { message: String },

    /// Unstructured data is attached to a mesh location other than faces
    UnsupportedLocation { location: String },

    /// Malformed mesh topology or a scalar field that fits neither faces nor nodes
    InvalidMesh { message: String },

    /// Plotting surface or GPU setup failure
    RenderError(String),

    /// Array shape or dimension error
    ArrayError(ndarray::ShapeError),

    /// Base-layer texture or screenshot encoding error
    ImageError(image::ImageError),

    /// Coastline GeoJSON parsing error
    JsonError(serde_json::Error),

    /// Generic error for backward compatibility
    Generic(String),
}

impl fmt::Display for CubeVistaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CubeVistaError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            CubeVistaError::IoError(e) => write!(f, "I/O error: {}", e),
            CubeVistaError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in file", var)
            }
            CubeVistaError::AmbiguousVariable { name, matches } => write!(
                f,
                "Name '{}' matches more than one variable: [{}]",
                name,
                matches.join(", ")
            ),
            CubeVistaError::UnsupportedGeometry { message } => {
                write!(f, "Unsupported grid geometry: {}", message)
            }
            CubeVistaError::UnsupportedLocation { location } => {
                write!(f, "Mesh data location must be 'face', not '{}'", location)
            }
            CubeVistaError::InvalidMesh { message } => write!(f, "Invalid mesh: {}", message),
            CubeVistaError::RenderError(msg) => write!(f, "Render error: {}", msg),
            CubeVistaError::ArrayError(e) => write!(f, "Array error: {}", e),
            CubeVistaError::ImageError(e) => write!(f, "Image error: {}", e),
            CubeVistaError::JsonError(e) => write!(f, "GeoJSON error: {}", e),
            CubeVistaError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CubeVistaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CubeVistaError::NetCDFError(e) => Some(e),
            CubeVistaError::IoError(e) => Some(e),
            CubeVistaError::ArrayError(e) => Some(e),
            CubeVistaError::ImageError(e) => Some(e),
            CubeVistaError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for CubeVistaError {
    fn from(error: netcdf::Error) -> Self {
        CubeVistaError::NetCDFError(error)
    }
}

impl From<std::io::Error> for CubeVistaError {
    fn from(error: std::io::Error) -> Self {
        CubeVistaError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for CubeVistaError {
    fn from(error: ndarray::ShapeError) -> Self {
        CubeVistaError::ArrayError(error)
    }
}

impl From<image::ImageError> for CubeVistaError {
    fn from(error: image::ImageError) -> Self {
        CubeVistaError::ImageError(error)
    }
}

impl From<serde_json::Error> for CubeVistaError {
    fn from(error: serde_json::Error) -> Self {
        CubeVistaError::JsonError(error)
    }
}

impl From<String> for CubeVistaError {
    fn from(error: String) -> Self {
        CubeVistaError::Generic(error)
    }
}

impl From<&str> for CubeVistaError {
    fn from(error: &str) -> Self {
        CubeVistaError::Generic(error.to_string())
    }
}

/// Result type alias for CubeVista operations
pub type Result<T> = std::result::Result<T, CubeVistaError>;

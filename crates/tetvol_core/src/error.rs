//! Renderer error types

use std::fmt;

use crate::backend::BackendError;
use crate::method::Method;
use crate::texture_shape::ShapeError;

/// Errors surfaced to callers of the renderer
///
/// Problems confined to a single channel (missing encoding, missing field,
/// unknown association, rejected transfer) are logged and skipped instead.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Texture shape planning failed
    Shape(ShapeError),
    /// A value was requested for an item size outside 1..=4
    UnsupportedItemSize(usize),
    /// A uniform was given the wrong number of values
    UniformLength { channel: String, expected: usize, actual: usize },
    /// Data does not fit the resource it is uploaded into
    DataTooLarge { channel: String, capacity: usize, actual: usize },
    /// An element count does not fit the 32-bit indices the shaders use
    CountTooLarge { what: &'static str, count: i64 },
    /// `init` has not been called yet
    NotInitialized,
    /// `init` was already called; extents are fixed for the renderer lifetime
    AlreadyInitialized,
    /// `upload` was called for a method that was never configured
    MethodNotConfigured(Method),
    /// The graphics backend failed
    Backend(BackendError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Shape(err) => write!(f, "{}", err),
            RenderError::UnsupportedItemSize(size) => write!(f, "Invalid item size {}", size),
            RenderError::UniformLength { channel, expected, actual } => write!(
                f,
                "Uniform '{}' expects {} values, got {}",
                channel, expected, actual
            ),
            RenderError::DataTooLarge { channel, capacity, actual } => write!(
                f,
                "Data for '{}' has {} values but the resource holds {}",
                channel, actual, capacity
            ),
            RenderError::CountTooLarge { what, count } => {
                write!(f, "{} count {} exceeds {}", what, count, u32::MAX)
            }
            RenderError::NotInitialized => write!(f, "Renderer not initialized, call init first"),
            RenderError::AlreadyInitialized => {
                write!(f, "Renderer already initialized, mesh extents are fixed")
            }
            RenderError::MethodNotConfigured(method) => {
                write!(f, "Method '{}' has not been configured", method)
            }
            RenderError::Backend(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Shape(err) => Some(err),
            RenderError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShapeError> for RenderError {
    fn from(err: ShapeError) -> Self {
        RenderError::Shape(err)
    }
}

impl From<BackendError> for RenderError {
    fn from(err: BackendError) -> Self {
        RenderError::Backend(err)
    }
}

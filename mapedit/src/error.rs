use thiserror::Error;

/// Why an inbound bridge message was dropped.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("message does not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("map resolution must be finite and positive, got {0}")]
    Resolution(f64),
    #[error("map has an empty dimension ({width}x{height})")]
    EmptyMap { width: u32, height: u32 },
    #[error("map raster has {actual} cells, expected {expected}")]
    RasterSize { expected: usize, actual: usize },
    #[error("unsupported message type `{0}`")]
    UnknownType(String),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing surface is not available")]
    SurfaceUnavailable,
}

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("failed to parse route: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("route io failed: {0}")]
    Io(#[from] std::io::Error),
}

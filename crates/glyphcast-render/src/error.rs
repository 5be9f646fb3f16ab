//! Error types for the render crate.

use thiserror::Error;

/// Errors that can occur during graphics operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No suitable graphics adapter was found.
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    /// Failed to request a graphics device.
    #[error("failed to request graphics device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Surface error that is not recoverable by skipping a frame.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// The frame was skipped; the caller should retry on the next tick.
    #[error("frame dropped: {reason}")]
    FrameDropped { reason: String },

    /// The device reported an error while recording or submitting a frame.
    #[error("gpu error: {0}")]
    Gpu(String),

    /// The atlas coverage is larger than the device allows.
    #[error("atlas {width}x{height} exceeds the maximum texture size {max}")]
    AtlasTooLarge { width: u32, height: u32, max: u32 },

    /// The texture format has no plain per-pixel layout to read back.
    #[error("unsupported readback format: {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    /// Invalid dimensions (zero width or height, or mismatched data).
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

impl RenderError {
    /// Create a dropped-frame error.
    pub fn frame_dropped(reason: impl Into<String>) -> Self {
        Self::FrameDropped {
            reason: reason.into(),
        }
    }

    /// Check if the error only means this frame was skipped.
    pub fn is_frame_dropped(&self) -> bool {
        matches!(self, Self::FrameDropped { .. })
    }
}

impl From<wgpu::Error> for RenderError {
    fn from(err: wgpu::Error) -> Self {
        Self::Gpu(err.to_string())
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dropped() {
        let err = RenderError::frame_dropped("surface outdated");
        assert!(err.is_frame_dropped());
        assert_eq!(err.to_string(), "frame dropped: surface outdated");

        let err = RenderError::Gpu("out of memory".into());
        assert!(!err.is_frame_dropped());
    }
}

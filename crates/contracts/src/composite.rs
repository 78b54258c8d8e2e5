//! RenderedComposite - Compositor output
//!
//! One finished, PNG-encoded inspection image keyed by its anchor index.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Composite image for a single anchor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedComposite {
    /// Anchor index into the primary video stream
    pub anchor_index: usize,

    /// Primary video timestamp of the anchor (seconds)
    pub anchor_timestamp: f64,

    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,

    /// Lossless PNG encoding of the image
    pub png: Bytes,
}

impl RenderedComposite {
    /// Deterministic file name for this anchor, e.g. `frame-0000042.png`
    pub fn file_name(&self, prefix: &str) -> String {
        format!("{}-{:07}.png", prefix, self.anchor_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_zero_padded() {
        let composite = RenderedComposite {
            anchor_index: 42,
            anchor_timestamp: 1.4,
            width: 3,
            height: 3,
            png: Bytes::new(),
        };
        assert_eq!(composite.file_name("frame"), "frame-0000042.png");
    }
}

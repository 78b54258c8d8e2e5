//! Per-anchor composition: plan, fetch, decode, draw, assemble, encode.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use contracts::{ContractError, FrameStore, LayoutConfig, RenderedComposite, StreamKind};
use image::{ImageFormat, RgbImage};
use sync_engine::AlignmentEngine;
use tracing::{debug, instrument};

use crate::frame::{decode_tile, FrameCompositor, TileSize};
use crate::trace::{SkiaTraceRenderer, TraceCompositor, TraceRenderer};

/// Lossless PNG encoding of a composite
pub fn encode_png(image: &RgbImage) -> Result<Bytes, ContractError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ContractError::render(format!("png encoding failed: {e}")))?;
    Ok(Bytes::from(buf.into_inner()))
}

/// Renders the composite of any anchor in the engine's range
///
/// Holds only shared immutable state, so one composer can be cloned
/// into every worker.
#[derive(Clone)]
pub struct AnchorComposer<R = SkiaTraceRenderer> {
    engine: Arc<AlignmentEngine>,
    primary: Arc<dyn FrameStore>,
    secondary: Arc<dyn FrameStore>,
    traces: TraceCompositor<R>,
    frames: FrameCompositor,
}

impl AnchorComposer<SkiaTraceRenderer> {
    pub fn new(
        engine: Arc<AlignmentEngine>,
        primary: Arc<dyn FrameStore>,
        secondary: Arc<dyn FrameStore>,
        layout: &LayoutConfig,
    ) -> Self {
        Self::with_renderer(engine, primary, secondary, layout, SkiaTraceRenderer::default())
    }
}

impl<R: TraceRenderer> AnchorComposer<R> {
    pub fn with_renderer(
        engine: Arc<AlignmentEngine>,
        primary: Arc<dyn FrameStore>,
        secondary: Arc<dyn FrameStore>,
        layout: &LayoutConfig,
        renderer: R,
    ) -> Self {
        Self {
            engine,
            primary,
            secondary,
            traces: TraceCompositor::with_renderer(renderer, layout.dpi),
            frames: FrameCompositor::new(TileSize::from(layout)),
        }
    }

    pub fn engine(&self) -> &AlignmentEngine {
        &self.engine
    }

    pub fn tile(&self) -> TileSize {
        self.frames.tile()
    }

    /// Build the composite for `anchor`
    ///
    /// The trace panel is drawn before any frame is decoded, so an empty
    /// window is reported without touching the frame stores.
    #[instrument(level = "debug", skip(self))]
    pub fn compose(&self, anchor: usize) -> Result<RenderedComposite, ContractError> {
        let plan = self.engine.plan(anchor)?;

        let trace = self.traces.render(
            &plan.window,
            self.engine.sensor(),
            self.engine.audio(),
            plan.primary_marks,
            plan.secondary_marks,
            self.frames.tile().trace_panel(),
        )?;

        let primary = self.decode_triple(
            StreamKind::PrimaryVideo,
            self.primary.as_ref(),
            plan.correspondence.primary,
        )?;
        let secondary = self.decode_triple(
            StreamKind::SecondaryVideo,
            self.secondary.as_ref(),
            plan.correspondence.secondary,
        )?;

        let canvas = self.frames.assemble(&primary, &secondary, &trace)?;
        let (width, height) = canvas.dimensions();
        let png = encode_png(&canvas)?;

        debug!(
            anchor,
            primary = ?plan.correspondence.primary,
            secondary = ?plan.correspondence.secondary,
            bytes = png.len(),
            "anchor composed"
        );

        Ok(RenderedComposite {
            anchor_index: plan.anchor_index,
            anchor_timestamp: plan.anchor_timestamp,
            width,
            height,
            png,
        })
    }

    fn decode_triple(
        &self,
        stream: StreamKind,
        store: &dyn FrameStore,
        indices: [usize; 3],
    ) -> Result<[RgbImage; 3], ContractError> {
        let [a, b, c] = indices;
        let decode = |i: usize| store.frame(i).and_then(|frame| decode_tile(stream, &frame));
        Ok([decode(a)?, decode(b)?, decode(c)?])
    }
}

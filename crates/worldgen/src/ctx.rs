//! Explicit generation context passed into every build call.
//!
//! All cross-cutting generation state lives here instead of in process
//! globals: the shared config and, for flow-accumulation worlds, the
//! precomputed drainage field.

use std::sync::Arc;

use crate::config::{HydrologyMode, WorldConfig};
use crate::height::compute_height;
use crate::hydrology::FlowField;

#[derive(Debug, Clone)]
pub struct GenContext {
    pub cfg: Arc<WorldConfig>,
    pub flow: Option<Arc<FlowField>>,
}

impl GenContext {
    /// Build a context for the given config. For flow-accumulation worlds
    /// this computes the whole-world drainage field once, up front.
    pub fn new(cfg: Arc<WorldConfig>) -> Self {
        let flow = match cfg.params.hydrology {
            HydrologyMode::Warped => None,
            HydrologyMode::FlowAccumulation => Some(Arc::new(FlowField::build(&cfg))),
        };
        Self { cfg, flow }
    }

    /// Final ground elevation for a column, with flow carving applied when
    /// the world uses flow-accumulation hydrology.
    #[inline]
    pub fn ground_height(&self, x: i32, z: i32) -> i32 {
        let h = compute_height(x, z, &self.cfg);
        match &self.flow {
            Some(field) => (h - field.carve_at(x, z)).max(2),
            None => h,
        }
    }
}

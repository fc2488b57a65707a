mod debug;
mod document;
mod error;
mod geometry;
mod path;
mod shape;
mod simplify;
mod transform;
mod types;

use debug::DebugLogger;
pub use document::{ElementView, drawable_descendants, is_drawable, parse_points};
pub use error::{EngineError, PathSyntaxError, RejectReason};
pub use geometry::{Geometry, Outcome, Rejection, Shape};
pub use path::{
    ArcParams, CurveKind, PathCommand, PathState, RawCommand, absolutize, absolutize_step,
    encode_path, line_vertices, parse_path, transform_commands, try_parse_path,
};
use rayon::prelude::*;
pub use shape::{Primitive, normalize};
pub use simplify::{
    Tolerances, area, check_area, drop_closing_points, ensure_closed, perimeter, reduce_points,
    simplify,
};
pub use transform::{
    Matrix, accumulate_ancestor_transform, element_transform, identity, multiply,
    parse_transform_list, transform_point,
};
pub use types::{LayerContext, Point, SourceId};

/// Turns drawing nodes into validated output geometry.
///
/// Each node is handled independently from immutable ancestor data, so an
/// engine can be shared across threads.
#[derive(Clone)]
pub struct GeometryEngine {
    tolerances: Tolerances,
    debug: Option<DebugLogger>,
}

pub struct GeometryEngineBuilder {
    tolerances: Tolerances,
    debug_path: Option<std::path::PathBuf>,
}

impl Default for GeometryEngine {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            debug: None,
        }
    }
}

impl GeometryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> GeometryEngineBuilder {
        GeometryEngineBuilder::new()
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Normalizes, simplifies and rounds one primitive already paired with
    /// its composed matrix.
    pub fn normalize(
        &self,
        id: SourceId,
        primitive: &Primitive,
        matrix: Matrix,
        context: LayerContext,
    ) -> Outcome {
        let kind = primitive.kind();
        let precision = self.tolerances.precision;
        let shape = normalize(primitive, matrix, context, self.tolerances.epsilon)
            .and_then(|shape| simplify(shape, context, &self.tolerances))
            .map(|shape| shape.rounded(precision))
            .and_then(|shape| shape.check_emitted().map(|()| shape));
        match shape {
            Ok(shape) => {
                if let Some(logger) = &self.debug {
                    logger.count_accepted(shape.kind());
                }
                Ok(Geometry { source: id, shape })
            }
            Err(reason) => Err(self.reject(id, kind, reason)),
        }
    }

    /// Processes one node: reads its primitive, composes its ancestor and
    /// local transforms and normalizes. `None` for non-drawable nodes.
    pub fn process_element<N: ElementView>(
        &self,
        node: &N,
        context: LayerContext,
    ) -> Option<Outcome> {
        let kind = document::drawable_kind(node.tag_name())?;
        let id = node.source_id();
        let primitive = match Primitive::from_element(node) {
            Ok(Some(primitive)) => primitive,
            Ok(None) => return None,
            Err(reason) => return Some(Err(self.reject(id, kind, reason))),
        };
        let matrix = element_transform(node);
        Some(self.normalize(id, &primitive, matrix, context))
    }

    /// Processes every drawable under `root` in parallel. Outcomes keep
    /// document order.
    pub fn process_subtree(
        &self,
        root: roxmltree::Node<'_, '_>,
        context: LayerContext,
    ) -> Vec<Outcome> {
        drawable_descendants(root)
            .par_iter()
            .filter_map(|node| self.process_element(node, context))
            .collect()
    }

    pub fn process_document(
        &self,
        doc: &roxmltree::Document<'_>,
        context: LayerContext,
    ) -> Vec<Outcome> {
        self.process_subtree(doc.root_element(), context)
    }

    /// Writes accumulated counters to the debug log, if one is configured.
    pub fn emit_summary(&self, context: &str) {
        if let Some(logger) = &self.debug {
            logger.emit_summary(context);
        }
    }

    fn reject(&self, id: SourceId, kind: &'static str, reason: RejectReason) -> Rejection {
        tracing::debug!(source = %id, kind, %reason, "shape rejected");
        let rejection = Rejection { id, kind, reason };
        if let Some(logger) = &self.debug {
            logger.log_rejection(&rejection);
        }
        rejection
    }
}

impl GeometryEngineBuilder {
    pub fn new() -> Self {
        Self {
            tolerances: Tolerances::default(),
            debug_path: None,
        }
    }

    pub fn merge_threshold(mut self, threshold: f64) -> Self {
        self.tolerances.merge_threshold = threshold;
        self
    }

    pub fn min_area_ratio(mut self, ratio: f64) -> Self {
        self.tolerances.min_area_ratio = ratio;
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.tolerances.epsilon = epsilon;
        self
    }

    pub fn precision(mut self, decimals: u32) -> Self {
        self.tolerances.precision = decimals;
        self
    }

    // Enable JSONL logging of rejections and accept/reject counters.
    pub fn debug_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<GeometryEngine, EngineError> {
        let t = self.tolerances;
        if !t.merge_threshold.is_finite() || t.merge_threshold < 0.0 {
            return Err(EngineError::InvalidConfiguration(
                "merge_threshold must be finite and >= 0".to_string(),
            ));
        }
        if !t.min_area_ratio.is_finite() || t.min_area_ratio < 0.0 {
            return Err(EngineError::InvalidConfiguration(
                "min_area_ratio must be finite and >= 0".to_string(),
            ));
        }
        if !t.epsilon.is_finite() || t.epsilon <= 0.0 {
            return Err(EngineError::InvalidConfiguration(
                "epsilon must be finite and > 0".to_string(),
            ));
        }
        if !(2..=3).contains(&t.precision) {
            return Err(EngineError::InvalidConfiguration(
                "precision must be 2 or 3 decimal places".to_string(),
            ));
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(GeometryEngine {
            tolerances: t,
            debug,
        })
    }
}

impl Default for GeometryEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

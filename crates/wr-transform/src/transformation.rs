//! Priority-ordered passes over a document.

use std::sync::Arc;

use wr_xdom::{Block, Xdom};

use crate::context::TransformationContext;
use crate::error::TransformationError;

/// Default priority of a transformation.
pub const DEFAULT_PRIORITY: u32 = 1000;

/// A pass that rewrites a document in place.
pub trait Transformation: Send + Sync {
    /// Unique name of the pass.
    fn name(&self) -> &str;

    /// Lower priorities run first.
    fn priority(&self) -> u32 {
        DEFAULT_PRIORITY
    }

    fn transform(
        &self,
        xdom: &mut Xdom,
        context: &mut TransformationContext,
    ) -> Result<(), TransformationError>;
}

/// Ordered set of transformations.
///
/// Transformations run by ascending priority; equal priorities keep their
/// registration order.
#[derive(Clone, Default)]
pub struct TransformationManager {
    transformations: Vec<Arc<dyn Transformation>>,
}

impl TransformationManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transformation.
    #[must_use]
    pub fn with_transformation<T: Transformation + 'static>(mut self, transformation: T) -> Self {
        self.register(Arc::new(transformation));
        self
    }

    pub fn register(&mut self, transformation: Arc<dyn Transformation>) {
        self.transformations.push(transformation);
    }

    /// Transformations in execution order.
    pub fn ordered(&self) -> Vec<Arc<dyn Transformation>> {
        let mut ordered = self.transformations.clone();
        ordered.sort_by_key(|t| t.priority());
        ordered
    }

    /// Run every transformation over `xdom`.
    ///
    /// A failing transformation leaves an error block at the end of the
    /// document and the remaining ones still run. Fatal errors are returned.
    pub fn apply_all(
        &self,
        xdom: &mut Xdom,
        context: &mut TransformationContext,
    ) -> Result<(), TransformationError> {
        for transformation in self.ordered() {
            tracing::debug!(
                name = transformation.name(),
                priority = transformation.priority(),
                "Applying transformation"
            );
            match transformation.transform(xdom, context) {
                Ok(()) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    tracing::warn!(name = transformation.name(), error = %err, "Transformation failed");
                    xdom.blocks.push(Block::error(
                        format!(
                            "Failed to execute the [{}] transformation",
                            transformation.name()
                        ),
                        err.to_string(),
                        false,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TransformationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.transformations.iter().map(|t| t.name()))
            .finish()
    }
}

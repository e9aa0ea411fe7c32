/// How the builder chooses the splitting plane of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Split at the midpoint of the node's centroid bounds, along the axis of
    /// their largest extent.
    #[default]
    SpatialMedian,

    /// Split where the binned surface-area heuristic estimates the cheapest
    /// traversal; falls back to the spatial median when no plane is usable.
    Sah,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BvhConfig {
    pub split: SplitStrategy,

    /// Number of bins evaluated per axis by the SAH.
    pub sah_bins: usize,

    /// Cost of visiting a node, relative to the cost of testing a primitive.
    pub traversal_cost: f32,
}

impl BvhConfig {
    pub fn with_split(mut self, split: SplitStrategy) -> Self {
        self.split = split;
        self
    }

    pub fn with_sah_bins(mut self, sah_bins: usize) -> Self {
        self.sah_bins = sah_bins;
        self
    }

    pub fn with_traversal_cost(mut self, traversal_cost: f32) -> Self {
        self.traversal_cost = traversal_cost;
        self
    }

    pub fn use_sah(&self) -> bool {
        self.split == SplitStrategy::Sah
    }
}

impl Default for BvhConfig {
    fn default() -> Self {
        Self {
            split: Default::default(),
            sah_bins: 64,
            traversal_cost: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneConfig {
    /// Configuration shared by all trees (each BLAS and the TLAS).
    pub bvh: BvhConfig,

    /// Maximum number of threads building BLAS trees at once.
    pub blas_threads: usize,
}

impl SceneConfig {
    pub fn with_bvh(mut self, bvh: BvhConfig) -> Self {
        self.bvh = bvh;
        self
    }

    pub fn with_blas_threads(mut self, blas_threads: usize) -> Self {
        self.blas_threads = blas_threads;
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            bvh: Default::default(),
            blas_threads: 1,
        }
    }
}

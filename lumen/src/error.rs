use thiserror::Error;

/// Failure while building a single BVH; no partial tree is ever returned.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("cannot build a BVH over zero primitives")]
    NoPrimitives,

    #[error("primitive #{primitive} has non-finite bounds")]
    NonFiniteBounds { primitive: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FlattenError {
    #[error("instance #{instance} refers to missing mesh #{mesh}")]
    MissingMesh { instance: usize, mesh: usize },

    #[error("expected {expected} instances, got {actual}")]
    InstanceCountMismatch { expected: usize, actual: usize },

    #[error("top-level tree cannot be updated before the scene is flattened")]
    NotFlattened,

    #[error("top-level leaf holds more than one instance")]
    LeafTooLarge,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Flatten(#[from] FlattenError),

    #[error("mesh #{mesh} has no triangles")]
    EmptyMesh { mesh: usize },

    #[error("mesh #{mesh} has a different number of {attribute} than vertices")]
    AttributeLengthMismatch {
        mesh: usize,
        attribute: &'static str,
    },

    #[error("instance #{instance} refers to mesh #{mesh}, which doesn't exist")]
    MeshOutOfRange { instance: usize, mesh: usize },

    #[error("instance #{instance} doesn't exist")]
    InstanceOutOfRange { instance: usize },
}

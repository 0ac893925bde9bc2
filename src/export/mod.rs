//! Model export and serialization module
//!
//! Persists the fitted model, scaler and encoder as checksummed binary
//! artifacts that share a training-run id.

mod serializer;

pub use serializer::{
    load_artifact, read_envelope, save_artifact, Artifact, ArtifactEnvelope, ArtifactHeader,
    ArtifactKind, ArtifactPaths, ArtifactSet,
};

//! Artifact serialization
//!
//! Every artifact is a bincode-encoded [`ArtifactEnvelope`]: magic bytes, a
//! format version, a header naming the artifact kind and the training run
//! that produced it, the bincode payload and an FNV-1a checksum of the payload.

use crate::error::{ChurnError, Result};
use crate::feature_engineering::FeatureEncoder;
use crate::preprocessing::FeatureScaler;
use crate::training::LogisticRegression;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// What an artifact file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Model,
    Scaler,
    Encoder,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Model => write!(f, "model"),
            ArtifactKind::Scaler => write!(f, "scaler"),
            ArtifactKind::Encoder => write!(f, "encoder"),
        }
    }
}

/// A value that can be persisted as an artifact
pub trait Artifact: Serialize + DeserializeOwned {
    const KIND: ArtifactKind;
}

impl Artifact for LogisticRegression {
    const KIND: ArtifactKind = ArtifactKind::Model;
}

impl Artifact for FeatureScaler {
    const KIND: ArtifactKind = ArtifactKind::Scaler;
}

impl Artifact for FeatureEncoder {
    const KIND: ArtifactKind = ArtifactKind::Encoder;
}

/// Metadata stored alongside every payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub kind: ArtifactKind,
    /// Id shared by all artifacts of one training run
    pub training_run_id: String,
    /// RFC 3339 creation time
    pub created_at: String,
    /// Predictor names in model column order
    pub feature_names: Vec<String>,
    pub target_name: String,
}

impl ArtifactHeader {
    pub fn new(
        kind: ArtifactKind,
        training_run_id: impl Into<String>,
        feature_names: Vec<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            training_run_id: training_run_id.into(),
            created_at: Utc::now().to_rfc3339(),
            feature_names,
            target_name: target_name.into(),
        }
    }
}

/// On-disk wrapper of an artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEnvelope {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    pub header: ArtifactHeader,
    /// bincode payload
    pub payload: Vec<u8>,
    /// Checksum for integrity verification
    pub checksum: u64,
}

impl ArtifactEnvelope {
    /// Magic bytes for churn artifacts
    pub const MAGIC: [u8; 4] = *b"CHRN";
    /// Current format version
    pub const VERSION: u32 = 1;

    pub fn new(header: ArtifactHeader, payload: Vec<u8>) -> Self {
        let checksum = compute_checksum(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            header,
            payload,
            checksum,
        }
    }

    /// Verify checksum
    pub fn verify_checksum(&self) -> bool {
        compute_checksum(&self.payload) == self.checksum
    }
}

/// FNV-1a hash
fn compute_checksum(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 14695981039346656037;
    const FNV_PRIME: u64 = 1099511628211;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Write `value` to `path` through a sibling temp file and an atomic rename.
/// The header kind is forced to match `T`.
pub fn save_artifact<T: Artifact>(value: &T, mut header: ArtifactHeader, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    header.kind = T::KIND;

    let payload = bincode::serialize(value)?;
    let envelope = ArtifactEnvelope::new(header, payload);

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| ChurnError::SerializationError(format!("Invalid artifact path: {}", path.display())))?;
    let tmp = dir.join(format!(".{}.{}.tmp", file_name.to_string_lossy(), Uuid::new_v4().simple()));

    let written = (|| -> Result<()> {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &envelope)?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| ChurnError::IoError(e.into_error()))?
            .sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written?;

    info!(kind = %T::KIND, path = %path.display(), run_id = %envelope.header.training_run_id, "Artifact saved");
    Ok(())
}

/// Read the envelope at `path` without decoding the payload
pub fn read_envelope(path: impl AsRef<Path>) -> Result<ArtifactEnvelope> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        ChurnError::SerializationError(format!("Cannot open artifact {}: {}", path.display(), e))
    })?;
    let envelope: ArtifactEnvelope = bincode::deserialize_from(BufReader::new(file))?;

    if envelope.magic != ArtifactEnvelope::MAGIC {
        return Err(ChurnError::SerializationError(format!(
            "{} is not a churn artifact",
            path.display()
        )));
    }
    if envelope.format_version != ArtifactEnvelope::VERSION {
        return Err(ChurnError::SerializationError(format!(
            "Unsupported artifact format version {} in {}",
            envelope.format_version,
            path.display()
        )));
    }
    if !envelope.verify_checksum() {
        return Err(ChurnError::SerializationError(format!(
            "Checksum mismatch in {}",
            path.display()
        )));
    }
    Ok(envelope)
}

/// Load and decode an artifact of type `T`
pub fn load_artifact<T: Artifact>(path: impl AsRef<Path>) -> Result<(T, ArtifactHeader)> {
    let path = path.as_ref();
    let envelope = read_envelope(path)?;
    if envelope.header.kind != T::KIND {
        return Err(ChurnError::ArtifactMismatch(format!(
            "{} holds a {} artifact, expected {}",
            path.display(),
            envelope.header.kind,
            T::KIND
        )));
    }
    let value: T = bincode::deserialize(&envelope.payload)?;
    debug!(kind = %T::KIND, path = %path.display(), "Artifact loaded");
    Ok((value, envelope.header))
}

/// Fitted model, scaler and (optionally) encoder of one training run
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub model: LogisticRegression,
    pub scaler: FeatureScaler,
    pub encoder: Option<FeatureEncoder>,
    pub training_run_id: String,
    pub feature_names: Vec<String>,
    pub target_name: String,
}

/// Destination paths of an [`ArtifactSet`]
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub encoder: PathBuf,
}

impl ArtifactSet {
    /// Persist every member under one header
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        let header = ArtifactHeader::new(
            ArtifactKind::Model,
            &self.training_run_id,
            self.feature_names.clone(),
            &self.target_name,
        );
        save_artifact(&self.model, header.clone(), &paths.model)?;
        save_artifact(&self.scaler, header.clone(), &paths.scaler)?;
        if let Some(encoder) = &self.encoder {
            save_artifact(encoder, header, &paths.encoder)?;
        }
        Ok(())
    }

    /// Load a set and check that every member comes from the same run.
    /// The encoder is loaded only when its file exists.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let (model, model_header) = load_artifact::<LogisticRegression>(&paths.model)?;
        let (scaler, scaler_header) = load_artifact::<FeatureScaler>(&paths.scaler)?;
        check_pair(&model_header, &scaler_header)?;

        let encoder = if paths.encoder.exists() {
            let (encoder, encoder_header) = load_artifact::<FeatureEncoder>(&paths.encoder)?;
            check_pair(&model_header, &encoder_header)?;
            Some(encoder)
        } else {
            None
        };

        if scaler.n_features() != model_header.feature_names.len() {
            return Err(ChurnError::ArtifactMismatch(format!(
                "scaler expects {} features, model was trained on {}",
                scaler.n_features(),
                model_header.feature_names.len()
            )));
        }

        Ok(Self {
            model,
            scaler,
            encoder,
            training_run_id: model_header.training_run_id,
            feature_names: model_header.feature_names,
            target_name: model_header.target_name,
        })
    }
}

fn check_pair(model: &ArtifactHeader, other: &ArtifactHeader) -> Result<()> {
    if model.training_run_id != other.training_run_id {
        return Err(ChurnError::ArtifactMismatch(format!(
            "model comes from run {} but {} comes from run {}",
            model.training_run_id, other.kind, other.training_run_id
        )));
    }
    Ok(())
}

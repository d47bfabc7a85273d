//! Precompiled binary artifact for Jam scripts.
//!
//! An artifact stores the validated AST plus metadata so a host can skip
//! the front end on later loads. The host's function set is not part of
//! the artifact, so loading one always re-runs linking against the
//! current function table.
//!
//! Layout: 4-byte magic `JAMC`, little-endian u32 format version, u64
//! payload length, 32-byte blake3 payload hash, u32 flags, then the
//! bincode payload.

use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jam_core::ast::Stmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"JAMC";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 4 + 4 + 8 + 32 + 4;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] Box<bincode::ErrorKind>),
    #[error("Invalid artifact header")]
    InvalidHeader,
    #[error("Artifact version mismatch: {0}")]
    VersionMismatch(u32),
    #[error("Artifact hash mismatch")]
    HashMismatch,
}

pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;

/// Descriptive metadata stored alongside the AST.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub script_name: Option<String>,
    pub created_at: u64,
    pub compiler_version: String,
}

impl ArtifactMetadata {
    pub fn new(script_name: Option<String>, compiler_version: impl Into<String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            script_name,
            created_at,
            compiler_version: compiler_version.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactPayload {
    metadata: ArtifactMetadata,
    ast: Vec<Stmt>,
}

/// A precompiled script: metadata plus the validated AST.
#[derive(Debug, Clone)]
pub struct Artifact {
    metadata: ArtifactMetadata,
    ast: Vec<Stmt>,
    flags: u32,
}

impl Artifact {
    pub fn new(metadata: ArtifactMetadata, ast: Vec<Stmt>) -> Self {
        Self {
            metadata,
            ast,
            flags: 0,
        }
    }

    pub fn metadata(&self) -> &ArtifactMetadata {
        &self.metadata
    }

    pub fn ast(&self) -> &[Stmt] {
        &self.ast
    }

    pub fn into_ast(self) -> Vec<Stmt> {
        self.ast
    }

    fn payload(&self) -> Result<Vec<u8>, Box<bincode::ErrorKind>> {
        let payload = ArtifactPayload {
            metadata: self.metadata.clone(),
            ast: self.ast.clone(),
        };
        bincode::serialize(&payload)
    }

    pub fn to_bytes(&self) -> ArtifactResult<Vec<u8>> {
        let payload = self.payload()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&payload);
        let digest = hasher.finalize();

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(digest.as_bytes());
        bytes.extend_from_slice(&self.flags.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> ArtifactResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ArtifactError::InvalidHeader);
        }

        if &bytes[..4] != MAGIC {
            return Err(ArtifactError::InvalidHeader);
        }

        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(ArtifactError::VersionMismatch(version));
        }

        let payload_len = u64::from_le_bytes(bytes[8..16].try_into().unwrap()) as usize;
        let hash = &bytes[16..48];
        let flags = u32::from_le_bytes(bytes[48..52].try_into().unwrap());

        if bytes.len() < HEADER_SIZE + payload_len {
            return Err(ArtifactError::InvalidHeader);
        }

        let payload = &bytes[HEADER_SIZE..HEADER_SIZE + payload_len];
        let mut hasher = blake3::Hasher::new();
        hasher.update(payload);
        if hasher.finalize().as_bytes() != hash {
            return Err(ArtifactError::HashMismatch);
        }

        let ArtifactPayload { metadata, ast } = bincode::deserialize(payload)?;

        Ok(Self {
            metadata,
            ast,
            flags,
        })
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> ArtifactResult<()> {
        let mut file = std::fs::File::create(path)?;
        let bytes = self.to_bytes()?;
        file.write_all(&bytes)?;
        Ok(())
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> ArtifactResult<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jam_core::ast::Expr;
    use jam_core::diag::SourceSpan;

    fn sample_ast() -> Vec<Stmt> {
        let span = SourceSpan::new(1, 1, 3);
        vec![Stmt::VarDecl {
            name: "x".to_string(),
            hint: None,
            init: Some(Expr::Number { value: 42.0, span }),
            span,
        }]
    }

    #[test]
    fn artifact_round_trip() {
        let metadata = ArtifactMetadata::new(Some("sample".into()), "test-compiler");
        let artifact = Artifact::new(metadata.clone(), sample_ast());

        let bytes = artifact.to_bytes().expect("serialize artifact");
        let stored_len = u64::from_le_bytes(bytes[8..16].try_into().unwrap()) as usize;
        assert_eq!(stored_len, bytes.len() - HEADER_SIZE);

        let decoded = Artifact::from_bytes(&bytes).expect("deserialize artifact");
        assert_eq!(decoded.metadata.script_name, metadata.script_name);
        assert_eq!(decoded.metadata.compiler_version, metadata.compiler_version);
        assert_eq!(decoded.ast(), sample_ast().as_slice());
    }

    #[test]
    fn detects_invalid_hash() {
        let metadata = ArtifactMetadata::new(Some("sample".into()), "test-compiler");
        let artifact = Artifact::new(metadata, sample_ast());
        let mut bytes = artifact.to_bytes().expect("serialize artifact");
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let err = Artifact::from_bytes(&bytes).expect_err("expected hash mismatch");
        assert!(matches!(err, ArtifactError::HashMismatch));
    }

    #[test]
    fn rejects_wrong_magic_and_version() {
        let metadata = ArtifactMetadata::new(None, "test-compiler");
        let artifact = Artifact::new(metadata, sample_ast());
        let mut bytes = artifact.to_bytes().expect("serialize artifact");

        let mut wrong_magic = bytes.clone();
        wrong_magic[0] = b'X';
        assert!(matches!(
            Artifact::from_bytes(&wrong_magic),
            Err(ArtifactError::InvalidHeader)
        ));

        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            Artifact::from_bytes(&bytes),
            Err(ArtifactError::VersionMismatch(99))
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(matches!(
            Artifact::from_bytes(&[0u8; 10]),
            Err(ArtifactError::InvalidHeader)
        ));
    }
}

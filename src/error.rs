//! Error taxonomy shared by every component of the crate.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Persisted artifact kinds, used to label codec errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// File holding a sequence of ciphertexts.
    Ciphers,
    /// Secret key file.
    SecretKey,
    /// Public key file.
    PublicKey,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Ciphers => write!(f, "ciphertext"),
            Artifact::SecretKey => write!(f, "secret key"),
            Artifact::PublicKey => write!(f, "public key"),
        }
    }
}

/// Errors produced by loading, evaluating, combining or decoding ciphertexts.
///
/// Every variant is terminal for the operation that raised it; none of them
/// describes a transient condition.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Wrong magic number or format version for the requested artifact.
    #[error("bad {artifact} file{}: {detail}", at(.path))]
    Format {
        artifact: Artifact,
        detail: String,
        path: Option<PathBuf>,
    },

    /// The stream ended before the declared structure was complete.
    #[error("truncated {artifact} data{}", at(.path))]
    Truncated {
        artifact: Artifact,
        path: Option<PathBuf>,
    },

    /// Out-of-range bit access.
    #[error("bit index {index} out of range for length {len}")]
    Index { index: usize, len: usize },

    /// A layer or edge references a layer it must not.
    #[error("corrupt cipher: {0}")]
    CorruptCipher(String),

    /// No plaintext residue lies within the noise tolerance.
    #[error("no residue within tolerance (best distance {best:?}, tolerance {tolerance})")]
    DecodeFailure { best: Option<u32>, tolerance: u32 },

    /// A loaded key violates one of its structural invariants.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Underlying sink or source failure other than a short read.
    #[error("i/o error: {0}")]
    Io(#[source] io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CipherError>;

fn at(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" at {}", p.display()),
        None => String::new(),
    }
}

impl CipherError {
    /// Maps a read failure while decoding `artifact`: a short read becomes
    /// [`CipherError::Truncated`], anything else stays an I/O error.
    pub(crate) fn from_read(artifact: Artifact, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CipherError::Truncated { artifact, path: None }
        } else {
            CipherError::Io(err)
        }
    }

    /// Attaches the offending path to format and truncation errors.
    pub(crate) fn with_path(self, p: &Path) -> Self {
        match self {
            CipherError::Format { artifact, detail, .. } => CipherError::Format {
                artifact,
                detail,
                path: Some(p.to_path_buf()),
            },
            CipherError::Truncated { artifact, .. } => CipherError::Truncated {
                artifact,
                path: Some(p.to_path_buf()),
            },
            other => other,
        }
    }
}

impl From<io::Error> for CipherError {
    fn from(err: io::Error) -> Self {
        CipherError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_becomes_truncated() {
        let err = CipherError::from_read(
            Artifact::Ciphers,
            io::Error::new(io::ErrorKind::UnexpectedEof, "eof"),
        );
        assert!(matches!(err, CipherError::Truncated { artifact: Artifact::Ciphers, path: None }));

        let err = CipherError::from_read(Artifact::PublicKey, io::Error::other("disk"));
        assert!(matches!(err, CipherError::Io(_)));
    }

    #[test]
    fn test_path_is_reported() {
        let err = CipherError::Format {
            artifact: Artifact::SecretKey,
            detail: "magic 0x00000000".into(),
            path: None,
        }
        .with_path(Path::new("keys/sk.bin"));
        assert_eq!(format!("{err}"), "bad secret key file at keys/sk.bin: magic 0x00000000");
    }

    #[test]
    fn test_path_ignored_for_other_errors() {
        let err = CipherError::CorruptCipher("edge 3".into()).with_path(Path::new("a.ct"));
        assert_eq!(format!("{err}"), "corrupt cipher: edge 3");
    }
}

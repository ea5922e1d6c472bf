use thiserror::Error;

/// Errors raised by the k-point CCSD(T) core.
///
/// Zero or near-zero energy denominators are not represented here; they propagate into the energy as
/// Inf/NaN.
#[derive(Debug, Error)]
pub enum KCCSDTError {
    #[error("tensor of rank {0} is not an n-particle k-point tensor (rank must be 4n - 1)")]
    InvalidRank(usize),

    #[error("{0}-particle tensors are not supported (at most 3)")]
    UnsupportedParticles(usize),

    #[error("invalid exchange slots ({idx1}, {idx2}) for a {nparticles}-particle tensor")]
    InvalidExchange { idx1: usize, idx2: usize, nparticles: usize },

    #[error("k-point index {index} out of range [0, {nkpts})")]
    KptOutOfRange { index: usize, nkpts: usize },

    #[error("momentum conservation can not be closed for k-point tuple {0:?}")]
    KConservUnresolved(Vec<usize>),

    #[error("k-point tuple {0:?} must hold 3 or 5 indices")]
    InvalidKptTuple(Vec<usize>),

    #[error("shape mismatch for {name}: expected {expected:?}, found {found:?}")]
    ShapeMismatch { name: &'static str, expected: Vec<usize>, found: Vec<usize> },

    #[error("materializing triples requires {required} MB, exceeding max_memory of {limit} MB")]
    MemoryExceeded { required: usize, limit: usize },

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

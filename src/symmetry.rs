//! Antisymmetry checks on materialized n-particle k-point tensors.
//!
//! An n-particle tensor stores `2n - 1` momentum axes followed by `2n` orbital axes; the momentum of
//! the last particle slot is implied by conservation. Exchanging particle slots `p` and `q` swaps
//! momentum axes `p, q` together with orbital axes `2n - 1 + p, 2n - 1 + q`.

use crate::prelude::*;

/// Exchange pairs checked on the triples tensors: the three occupied pairs and the first virtual pair.
pub const TRIPLES_EXCHANGES: [(usize, usize); 4] = [(0, 1), (0, 2), (1, 2), (3, 4)];

fn nparticles_of_rank(rank: usize) -> Result<usize> {
    if rank < 3 || (rank + 1) % 4 != 0 {
        return Err(KCCSDTError::InvalidRank(rank));
    }
    let nparticles = (rank + 1) / 4;
    if nparticles > 3 {
        return Err(KCCSDTError::UnsupportedParticles(nparticles));
    }
    Ok(nparticles)
}

/// Frobenius norm of `tensor + P(idx1, idx2) tensor`.
///
/// A single exchange is an odd permutation, so an antisymmetric tensor gives a vanishing residual.
pub fn antiperm_residual<T: KScalar>(tensor: &Tsr<T>, idx1: usize, idx2: usize) -> Result<f64> {
    let nparticles = nparticles_of_rank(tensor.ndim())?;
    let nkaxes = 2 * nparticles - 1;
    if idx1 == idx2 || idx1 >= nkaxes || idx2 >= nkaxes {
        return Err(KCCSDTError::InvalidExchange { idx1, idx2, nparticles });
    }

    let swapped = tensor.swapaxes(idx1, idx2).into_swapaxes(nkaxes + idx1, nkaxes + idx2);
    let norm_sqr: f64 = tensor.iter().zip(swapped.iter()).map(|(&x, &y)| (x + y).abs_sqr()).sum();
    Ok(norm_sqr.sqrt())
}

/// Whether `tensor` changes sign under the exchange of particle slots `idx1` and `idx2`.
///
/// Slots run over `[0, 2n - 1)` for an `n`-particle tensor. Slot `2n - 1` holds the implied momentum
/// of the last virtual label, which has no stored axis, so an exchange involving it is rejected with
/// [`KCCSDTError::InvalidExchange`] rather than accepted as a valid index.
///
/// # Usage
///
/// ```norun
/// assert!(check_antiperm_symmetry(&t3c, 0, 1, 1e-10)?);
/// ```
pub fn check_antiperm_symmetry<T: KScalar>(tensor: &Tsr<T>, idx1: usize, idx2: usize, tolerance: f64) -> Result<bool> {
    Ok(antiperm_residual(tensor, idx1, idx2)? < tolerance)
}

#[derive(Debug, Clone)]
pub struct SymmetryCheck {
    pub label: String,
    pub idx1: usize,
    pub idx2: usize,
    pub residual: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SymmetryReport {
    pub checks: Vec<SymmetryCheck>,
}

impl SymmetryReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }

    /// Run `pairs` on `tensor` and append the outcomes under `label`.
    pub fn check<T: KScalar>(
        &mut self,
        label: &str,
        tensor: &Tsr<T>,
        pairs: &[(usize, usize)],
        tolerance: f64,
    ) -> Result<()> {
        for &(idx1, idx2) in pairs {
            let residual = antiperm_residual(tensor, idx1, idx2)?;
            let passed = residual < tolerance;
            if passed {
                debug!("Antisymmetry of {label} under ({idx1}, {idx2}): residual {residual:.3e}");
            } else {
                warn!("Antisymmetry of {label} under ({idx1}, {idx2}) violated: residual {residual:.3e}");
            }
            self.checks.push(SymmetryCheck { label: label.to_string(), idx1, idx2, residual, passed });
        }
        Ok(())
    }

    /// Report on the connected and disconnected triples tensors.
    pub fn triples<T: KScalar>(t3c: &Tsr<T>, t3d: &Tsr<T>, tolerance: f64) -> Result<Self> {
        let mut report = Self::default();
        report.check("t3c", t3c, &TRIPLES_EXCHANGES, tolerance)?;
        report.check("t3d", t3d, &TRIPLES_EXCHANGES, tolerance)?;
        Ok(report)
    }
}

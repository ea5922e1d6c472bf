//! Momentum conservation among sampled k-points.
//!
//! Two conventions are used throughout the crate, both following the storage of amplitudes and
//! integrals with one implied momentum:
//!
//! - two-body: `kconserv(k1, k2, k3) = k4` with `k1 - k2 + k3 - k4 = G`, so that the implied `kb` of
//!   `t2[ki, kj, ka]` is `kconserv(ki, ka, kj)`;
//! - three-body: `kconserv3([ki, kj, kk, ka, kb]) = kc` with `ki + kj + kk - ka - kb - kc = G`.

use crate::prelude::*;

pub trait KConservAPI {
    fn nkpts(&self) -> usize;

    /// `k4` such that `k1 - k2 + k3 - k4` is a reciprocal lattice vector.
    fn kconserv(&self, k1: usize, k2: usize, k3: usize) -> Result<usize>;

    /// `kc` such that `ki + kj + kk - ka - kb - kc` is a reciprocal lattice vector.
    fn kconserv3(&self, kpts: [usize; 5]) -> Result<usize> {
        let [ki, kj, kk, ka, kb] = kpts;
        let kx = self.kconserv(ki, ka, kj)?;
        self.kconserv(kx, kb, kk)
    }

    /// Close a k-point tuple of length 3 (two-body) or 5 (three-body).
    fn resolve(&self, kpts: &[usize]) -> Result<usize> {
        match *kpts {
            [k1, k2, k3] => self.kconserv(k1, k2, k3),
            [ki, kj, kk, ka, kb] => self.kconserv3([ki, kj, kk, ka, kb]),
            _ => Err(KCCSDTError::InvalidKptTuple(kpts.to_vec())),
        }
    }
}

fn check_kpt_range(kpts: &[usize], nkpts: usize) -> Result<()> {
    match kpts.iter().find(|&&k| k >= nkpts) {
        Some(&index) => Err(KCCSDTError::KptOutOfRange { index, nkpts }),
        None => Ok(()),
    }
}

/* #region lattice k-points */

/// k-points given in fractional (scaled) coordinates of the reciprocal lattice.
#[derive(Debug, Clone)]
pub struct KptsConserv {
    pub kpts_scaled: Vec<[f64; 3]>,
    /// Tolerance for a coordinate difference to count as integer. Default is `1e-6`.
    pub tol: f64,
}

impl KptsConserv {
    pub fn new(kpts_scaled: Vec<[f64; 3]>) -> Self {
        Self { kpts_scaled, tol: 1.0e-6 }
    }

    /// Gamma-centred Monkhorst-Pack mesh; the last axis runs fastest.
    pub fn monkhorst_pack(mesh: [usize; 3]) -> Self {
        let [n1, n2, n3] = mesh;
        let kpts_scaled = (0..n1)
            .cartesian_product(0..n2)
            .cartesian_product(0..n3)
            .map(|((i, j), k)| [i as f64 / n1 as f64, j as f64 / n2 as f64, k as f64 / n3 as f64])
            .collect();
        Self::new(kpts_scaled)
    }

    fn is_lattice_vector(&self, v: [f64; 3]) -> bool {
        v.iter().all(|x| (x - x.round()).abs() < self.tol)
    }
}

impl KConservAPI for KptsConserv {
    fn nkpts(&self) -> usize {
        self.kpts_scaled.len()
    }

    fn kconserv(&self, k1: usize, k2: usize, k3: usize) -> Result<usize> {
        check_kpt_range(&[k1, k2, k3], self.nkpts())?;
        let (p1, p2, p3) = (self.kpts_scaled[k1], self.kpts_scaled[k2], self.kpts_scaled[k3]);
        let target = [p1[0] - p2[0] + p3[0], p1[1] - p2[1] + p3[1], p1[2] - p2[2] + p3[2]];
        self.kpts_scaled
            .iter()
            .position(|p4| self.is_lattice_vector([target[0] - p4[0], target[1] - p4[1], target[2] - p4[2]]))
            .ok_or_else(|| KCCSDTError::KConservUnresolved(vec![k1, k2, k3]))
    }
}

/* #endregion */

/* #region memoised table */

/// Dense `nk^3` lookup table of the two-body conservation map.
///
/// Building the table resolves every triple once, so a sampling set that is not closed under
/// momentum addition is rejected before any contraction starts.
#[derive(Debug, Clone)]
pub struct KConservTable {
    nkpts: usize,
    table: Vec<usize>,
}

impl KConservTable {
    pub fn new<K: KConservAPI + ?Sized>(kconserv: &K) -> Result<Self> {
        let nkpts = kconserv.nkpts();
        let table = (0..nkpts)
            .cartesian_product(0..nkpts)
            .cartesian_product(0..nkpts)
            .map(|((k1, k2), k3)| {
                let k4 = kconserv.kconserv(k1, k2, k3)?;
                check_kpt_range(&[k4], nkpts)?;
                Ok(k4)
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Self { nkpts, table })
    }

    #[inline]
    pub fn get(&self, k1: usize, k2: usize, k3: usize) -> usize {
        self.table[(k1 * self.nkpts + k2) * self.nkpts + k3]
    }

    #[inline]
    pub fn get3(&self, kpts: [usize; 5]) -> usize {
        let [ki, kj, kk, ka, kb] = kpts;
        self.get(self.get(ki, ka, kj), kb, kk)
    }
}

impl KConservAPI for KConservTable {
    fn nkpts(&self) -> usize {
        self.nkpts
    }

    fn kconserv(&self, k1: usize, k2: usize, k3: usize) -> Result<usize> {
        check_kpt_range(&[k1, k2, k3], self.nkpts)?;
        Ok(self.get(k1, k2, k3))
    }
}

/* #endregion */

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_monkhorst_pack_kconserv() {
        let kconserv = KptsConserv::monkhorst_pack([2, 3, 1]);
        assert_eq!(kconserv.nkpts(), 6);
        // index = i * 3 + j for the (i/2, j/3, 0) point
        let idx = |i: usize, j: usize| i * 3 + j;
        assert_eq!(kconserv.kconserv(idx(1, 1), idx(0, 2), idx(1, 2)).unwrap(), idx(0, 1));
        assert_eq!(kconserv.kconserv(idx(0, 0), idx(0, 0), idx(1, 2)).unwrap(), idx(1, 2));
        assert_eq!(kconserv.resolve(&[idx(1, 0), idx(0, 1), idx(0, 1)]).unwrap(), idx(1, 0));
    }

    #[test]
    fn test_kconserv3_totality() {
        let kconserv = KptsConserv::monkhorst_pack([2, 2, 1]);
        let table = KConservTable::new(&kconserv).unwrap();
        let nk = kconserv.nkpts();
        for kpts in (0..5).map(|_| 0..nk).multi_cartesian_product() {
            let kc = kconserv.resolve(&kpts).unwrap();
            assert!(kc < nk);
            let kpts: [usize; 5] = kpts.try_into().unwrap();
            assert_eq!(table.get3(kpts), kc);
            // closing the tuple again from the other side returns the first index
            let [ki, kj, kk, ka, kb] = kpts;
            assert_eq!(kconserv.kconserv3([ka, kb, kc, kj, kk]).unwrap(), ki);
        }
    }

    #[test]
    fn test_unclosed_kpts() {
        // a quarter-mesh fragment is not closed under addition
        let kconserv = KptsConserv::new(vec![[0.0, 0.0, 0.0], [0.25, 0.0, 0.0]]);
        assert!(kconserv.kconserv(0, 0, 1).is_ok());
        assert!(matches!(kconserv.kconserv(1, 0, 1), Err(KCCSDTError::KConservUnresolved(_))));
        assert!(KConservTable::new(&kconserv).is_err());
    }

    #[test]
    fn test_resolve_preconditions() {
        let table = KConservTable::new(&KptsConserv::monkhorst_pack([3, 1, 1])).unwrap();
        assert!(matches!(table.resolve(&[0, 1]), Err(KCCSDTError::InvalidKptTuple(_))));
        assert!(matches!(table.resolve(&[0, 1, 3]), Err(KCCSDTError::KptOutOfRange { index: 3, nkpts: 3 })));
        assert_eq!(table.resolve(&[2, 1, 2]).unwrap(), 0);
    }
}

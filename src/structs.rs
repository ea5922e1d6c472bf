use crate::prelude::*;

/* #region input store */

/// Antisymmetrized two-electron integral blocks in the k-point representation.
///
/// Each block carries three momentum axes; the fourth momentum is implied by conservation.
#[derive(Debug)]
pub struct KERIs<T: KScalar = f64> {
    /// `<ij||ab>`, indexed `[ki, kj, ka, i, j, a, b]`.
    pub oovv: Tsr<T>,
    /// `<ij||ka>`, indexed `[ki, kj, kk, i, j, k, a]`.
    pub ooov: Tsr<T>,
    /// `<ia||bc>`, indexed `[ki, ka, kb, i, a, b, c]`.
    pub ovvv: Tsr<T>,
}

/// Converged k-point CCSD quantities consumed by the (T) correction.
#[derive(Debug)]
pub struct KCCSDInfo<T: KScalar = f64> {
    /// `[k, i, a]`
    pub t1: Tsr<T>,
    /// `[ki, kj, ka, i, j, a, b]`
    pub t2: Tsr<T>,
    pub eris: KERIs<T>,
    /// `[k, i]`
    pub mo_energy_occ: Tsr<f64>,
    /// `[k, a]`
    pub mo_energy_vir: Tsr<f64>,
    /// `[k, i, a]`
    pub fov: Tsr<T>,
}

impl<T: KScalar> KERIs<T> {
    pub fn oovv_block(&self, kpts: [usize; 3]) -> TsrView<'_, T> {
        self.oovv.i(kpts)
    }

    pub fn ooov_block(&self, kpts: [usize; 3]) -> TsrView<'_, T> {
        self.ooov.i(kpts)
    }

    pub fn ovvv_block(&self, kpts: [usize; 3]) -> TsrView<'_, T> {
        self.ovvv.i(kpts)
    }
}

impl<T: KScalar> KCCSDInfo<T> {
    /// Build the store from a per-momentum Fock matrix `[k, p, q]`.
    ///
    /// Orbital energies are the real parts of the diagonal; `fov` is the occupied-virtual block.
    pub fn from_fock(t1: Tsr<T>, t2: Tsr<T>, eris: KERIs<T>, fock: &Tsr<T>) -> Result<Self> {
        let t1_shape = t1.shape().clone();
        if t1_shape.len() != 3 {
            return Err(KCCSDTError::ShapeMismatch { name: "t1", expected: vec![0, 0, 0], found: t1_shape });
        }
        let (nkpts, nocc, nvir) = (t1_shape[0], t1_shape[1], t1_shape[2]);
        let nmo = nocc + nvir;
        util::check_shape("fock", fock.shape(), &[nkpts, nmo, nmo])?;

        let mut mo_energy_occ = Vec::with_capacity(nkpts * nocc);
        let mut mo_energy_vir = Vec::with_capacity(nkpts * nvir);
        let mut fov = Vec::with_capacity(nkpts * nocc * nvir);
        for k in 0..nkpts {
            mo_energy_occ.extend((0..nocc).map(|i| fock[[k, i, i]].re()));
            mo_energy_vir.extend((nocc..nmo).map(|a| fock[[k, a, a]].re()));
            fov.extend((0..nocc).cartesian_product(nocc..nmo).map(|(i, a)| fock[[k, i, a]]));
        }

        let info = Self {
            t1,
            t2,
            eris,
            mo_energy_occ: util::asarray_c(mo_energy_occ, &[nkpts, nocc]),
            mo_energy_vir: util::asarray_c(mo_energy_vir, &[nkpts, nvir]),
            fov: util::asarray_c(fov, &[nkpts, nocc, nvir]),
        };
        info.check_shapes()?;
        Ok(info)
    }

    pub fn nkpts(&self) -> usize {
        self.t1.shape()[0]
    }

    pub fn nocc(&self) -> usize {
        self.t1.shape()[1]
    }

    pub fn nvir(&self) -> usize {
        self.t1.shape()[2]
    }

    pub fn check_shapes(&self) -> Result<()> {
        if self.t1.ndim() != 3 {
            let found = self.t1.shape().clone();
            return Err(KCCSDTError::ShapeMismatch { name: "t1", expected: vec![0, 0, 0], found });
        }
        let (nk, no, nv) = (self.nkpts(), self.nocc(), self.nvir());
        util::check_shape("t2", self.t2.shape(), &[nk, nk, nk, no, no, nv, nv])?;
        util::check_shape("oovv", self.eris.oovv.shape(), &[nk, nk, nk, no, no, nv, nv])?;
        util::check_shape("ooov", self.eris.ooov.shape(), &[nk, nk, nk, no, no, no, nv])?;
        util::check_shape("ovvv", self.eris.ovvv.shape(), &[nk, nk, nk, no, nv, nv, nv])?;
        util::check_shape("mo_energy_occ", self.mo_energy_occ.shape(), &[nk, no])?;
        util::check_shape("mo_energy_vir", self.mo_energy_vir.shape(), &[nk, nv])?;
        util::check_shape("fov", self.fov.shape(), &[nk, no, nv])?;
        Ok(())
    }

    pub fn t1_block(&self, k: usize) -> TsrView<'_, T> {
        self.t1.i(k)
    }

    pub fn t2_block(&self, kpts: [usize; 3]) -> TsrView<'_, T> {
        self.t2.i(kpts)
    }

    pub fn fov_block(&self, k: usize) -> TsrView<'_, T> {
        self.fov.i(k)
    }
}

/* #endregion */

/* #region KCCSD(T) */

#[derive(Debug, Clone)]
pub struct KCCSDTConfig {
    /// Keep the full connected/disconnected triples tensors. Default is `false`.
    ///
    /// Both tensors hold `nk^5 * nocc^3 * nvir^3` elements; only meant for small validation cases.
    pub materialize: bool,

    /// Run the antisymmetry checks on the materialized tensors. Default is `false`.
    pub check_symmetry: bool,

    /// Tolerance of the antisymmetry checks. Default is `1e-10`.
    pub symmetry_tol: f64,

    /// Upper bound (MB) for the materialized tensors. Default is 2000.
    pub max_memory: usize,
}

impl Default for KCCSDTConfig {
    fn default() -> Self {
        Self { materialize: false, check_symmetry: false, symmetry_tol: 1.0e-10, max_memory: 2000 }
    }
}

/// Kernel-side copies of the inputs, transposed so that every contraction of the triples kernel runs
/// over a contiguous trailing axis. All integral and Fock copies are complex-conjugated.
pub struct KCCSDTIntermediates<T: KScalar = f64> {
    /// `t1[k, i, a]` as `[k, a, i]`
    pub t1_t: Tsr<T>,
    /// `t2[k1, k2, k3, i, j, a, b]` as `[k1, k2, k3, a, b, i, j]`
    pub t2_vvoo: Tsr<T>,
    /// `t2[k1, k2, k3, i, j, a, b]` as `[k1, k2, k3, a, i, j, b]`
    pub t2_voov: Tsr<T>,
    /// `conj(<ia||bc>)` as `[ki, ka, kb, b, c, i, a]`
    pub eri_vvov_c: Tsr<T>,
    /// `conj(<ij||ka>)` as `[ki, kj, kk, a, i, j, k]`
    pub eri_vooo_c: Tsr<T>,
    /// `conj(<ij||ab>)` as `[ki, kj, ka, a, b, i, j]`
    pub eri_vvoo_c: Tsr<T>,
    /// `conj(f_ia)` as `[k, a, i]`
    pub fov_c_t: Tsr<T>,
    /// `e_i + e_j + e_k` for every `(ki, kj, kk)`, flattened row-major over `[ki, kj, kk, i, j, k]`.
    pub d_ooo: Vec<f64>,
    /// Virtual orbital energies, flattened row-major over `[k, a]`.
    pub e_vir: Vec<f64>,
    pub kconserv: KConservTable,
}

#[derive(Debug)]
pub struct KCCSDTResults<T: KScalar = f64> {
    pub e_corr_pt: T,
    /// Connected triples, `[ki, kj, kk, ka, kb, i, j, k, a, b, c]`, when materialized.
    pub t3c: Option<Tsr<T>>,
    /// Disconnected triples, same layout as `t3c`.
    pub t3d: Option<Tsr<T>>,
    pub symmetry_report: Option<SymmetryReport>,
}

/* #endregion */

#[cfg(test)]
mod test {
    use super::*;
    use crate::synthetic::{build_system, sine_generator};

    #[test]
    fn test_from_fock_and_blocks() {
        let kconserv = KptsConserv::monkhorst_pack([2, 1, 1]);
        let info = build_system(&kconserv, 2, 3, sine_generator).unwrap();
        let (nk, no, nv) = (info.nkpts(), info.nocc(), info.nvir());
        let nmo = no + nv;

        let mut fock = vec![0.0; nk * nmo * nmo];
        for k in 0..nk {
            let f_k = &mut fock[k * nmo * nmo..(k + 1) * nmo * nmo];
            for i in 0..no {
                f_k[i * nmo + i] = info.mo_energy_occ[[k, i]];
                for a in 0..nv {
                    f_k[i * nmo + no + a] = info.fov[[k, i, a]];
                    f_k[(no + a) * nmo + i] = info.fov[[k, i, a]];
                }
            }
            for a in 0..nv {
                f_k[(no + a) * nmo + no + a] = info.mo_energy_vir[[k, a]];
            }
        }
        let fock = util::asarray_c(fock, &[nk, nmo, nmo]);

        let eris = KERIs { oovv: info.eris.oovv.clone(), ooov: info.eris.ooov.clone(), ovvv: info.eris.ovvv.clone() };
        let rebuilt = KCCSDInfo::from_fock(info.t1.clone(), info.t2.clone(), eris, &fock).unwrap();
        assert_eq!(rebuilt.mo_energy_occ.raw(), info.mo_energy_occ.raw());
        assert_eq!(rebuilt.mo_energy_vir.raw(), info.mo_energy_vir.raw());
        assert_eq!(rebuilt.fov.raw(), info.fov.raw());

        let t2_blk = rebuilt.t2_block([1, 0, 1]);
        assert_eq!(t2_blk.shape(), &vec![no, no, nv, nv]);
        assert_eq!(t2_blk[[1, 0, 2, 1]], info.t2[[1, 0, 1, 1, 0, 2, 1]]);
        assert_eq!(rebuilt.t1_block(1)[[1, 2]], info.t1[[1, 1, 2]]);
        assert_eq!(rebuilt.fov_block(0)[[0, 1]], info.fov[[0, 0, 1]]);
        assert_eq!(rebuilt.eris.oovv_block([0, 1, 1])[[0, 1, 2, 0]], info.eris.oovv[[0, 1, 1, 0, 1, 2, 0]]);
        assert_eq!(rebuilt.eris.ooov_block([1, 1, 0])[[1, 0, 1, 2]], info.eris.ooov[[1, 1, 0, 1, 0, 1, 2]]);
        assert_eq!(rebuilt.eris.ovvv_block([0, 0, 1])[[1, 2, 0, 1]], info.eris.ovvv[[0, 0, 1, 1, 2, 0, 1]]);
    }

    #[test]
    fn test_shape_checks() {
        let kconserv = KptsConserv::monkhorst_pack([1, 1, 1]);
        let mut info = build_system(&kconserv, 2, 2, sine_generator).unwrap();
        info.fov = util::asarray_c(vec![0.0; 6], &[1, 2, 3]);
        let err = info.check_shapes().unwrap_err();
        assert!(matches!(err, KCCSDTError::ShapeMismatch { name: "fov", .. }));

        let fock = util::asarray_c(vec![0.0; 9], &[1, 3, 3]);
        let eris = KERIs { oovv: info.eris.oovv.clone(), ooov: info.eris.ooov.clone(), ovvv: info.eris.ovvv.clone() };
        let err = KCCSDInfo::from_fock(info.t1.clone(), info.t2.clone(), eris, &fock).unwrap_err();
        assert!(matches!(err, KCCSDTError::ShapeMismatch { name: "fock", .. }));
    }

    #[test]
    fn test_debug_formatting() {
        let (kconserv, info) = crate::synthetic::random_system::<Complex<f64>>([1, 1, 1], 1, 1, 3).unwrap();
        assert!(format!("{:?}", info.eris).starts_with("KERIs"));
        assert!(format!("{info:?}").starts_with("KCCSDInfo"));

        let config = KCCSDTConfig { materialize: true, ..Default::default() };
        let results = crate::kccsdt::get_kccsd_pt_energy(&info, &kconserv, &config).unwrap();
        assert!(format!("{results:?}").contains("t3c"));
    }
}

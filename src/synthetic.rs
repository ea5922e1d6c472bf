//! Synthetic k-point CCSD systems for testing and benchmarking the triples kernel.
//!
//! Every block produced here carries the exchange antisymmetry of the physical quantity, with the
//! momentum labels moved along with the orbital labels, so the triples tensors built from them are
//! antisymmetric as well.

use crate::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// `[ki, kj, ka, i, j, a, b]`
    T2,
    /// `[ki, kj, ka, i, j, a, b]`
    Oovv,
    /// `[ki, ka, kb, i, a, b, c]`
    Ovvv,
    /// `[ki, kj, kk, i, j, k, a]`
    Ooov,
    /// `[k, i, a]`
    T1,
    /// `[k, i, a]`
    Fov,
}

impl Block {
    /// Fixed numeric tag of the block, usable to seed deterministic generators.
    pub fn tag(&self) -> f64 {
        match self {
            Block::T2 => 1.0,
            Block::Oovv => 2.0,
            Block::Ovvv => 3.0,
            Block::Ooov => 4.0,
            Block::T1 => 5.0,
            Block::Fov => 6.0,
        }
    }
}

/// Raw (not yet antisymmetrized) block over its full index space, row-major.
fn generate<T, F>(block: Block, shape: &[usize], generator: &mut F) -> Tsr<T>
where
    T: KScalar,
    F: FnMut(Block, &[usize]) -> T,
{
    let data = shape.iter().map(|&n| 0..n).multi_cartesian_product().map(|idx| generator(block, &idx)).collect_vec();
    util::asarray_c(data, shape)
}

/// Build a [`KCCSDInfo`] from an element generator `generator(block, index)`.
///
/// The raw elements are antisymmetrized as
///
/// - `t2`, `oovv`: `g[ki,kj,ka,i,j,a,b] - g[kj,ki,ka,j,i,a,b] - g[ki,kj,kb,i,j,b,a] + g[kj,ki,kb,j,i,b,a]`
/// - `ovvv`: `h[ki,ka,kb,i,a,b,c] - h[ki,ka,kc,i,a,c,b]`
/// - `ooov`: `q[ki,kj,kk,i,j,k,a] - q[kj,ki,kk,j,i,k,a]`
///
/// with the implied momenta taken from `kconserv`. Orbital energies are the ladders
/// `e_i(k) = -1 + 0.1 i + 0.05 k` and `e_a(k) = 0.5 + 0.15 a + 0.03 k`.
pub fn build_system<T, K, F>(kconserv: &K, nocc: usize, nvir: usize, mut generator: F) -> Result<KCCSDInfo<T>>
where
    T: KScalar,
    K: KConservAPI + ?Sized,
    F: FnMut(Block, &[usize]) -> T,
{
    let table = KConservTable::new(kconserv)?;
    let nk = table.nkpts();
    let (no, nv) = (nocc, nvir);

    let antisym_oovv = |g: &Tsr<T>| {
        let data = (0..nk)
            .cartesian_product(0..nk)
            .cartesian_product(0..nk)
            .flat_map(|((ki, kj), ka)| {
                let kb = table.get(ki, ka, kj);
                (0..no).cartesian_product(0..no).cartesian_product(0..nv).cartesian_product(0..nv).map(
                    move |(((i, j), a), b)| {
                        g[[ki, kj, ka, i, j, a, b]] - g[[kj, ki, ka, j, i, a, b]] - g[[ki, kj, kb, i, j, b, a]]
                            + g[[kj, ki, kb, j, i, b, a]]
                    },
                )
            })
            .collect_vec();
        util::asarray_c(data, &[nk, nk, nk, no, no, nv, nv])
    };

    let shape_oovv = [nk, nk, nk, no, no, nv, nv];
    let t2 = antisym_oovv(&generate(Block::T2, &shape_oovv, &mut generator));
    let oovv = antisym_oovv(&generate(Block::Oovv, &shape_oovv, &mut generator));

    let h = generate(Block::Ovvv, &[nk, nk, nk, no, nv, nv, nv], &mut generator);
    let ovvv = (0..nk)
        .cartesian_product(0..nk)
        .cartesian_product(0..nk)
        .flat_map(|((ki, ka), kb)| {
            let kc = table.get(ki, kb, ka);
            let h = &h;
            (0..no).cartesian_product(0..nv).cartesian_product(0..nv).cartesian_product(0..nv).map(
                move |(((i, a), b), c)| h[[ki, ka, kb, i, a, b, c]] - h[[ki, ka, kc, i, a, c, b]],
            )
        })
        .collect_vec();
    let ovvv = util::asarray_c(ovvv, &[nk, nk, nk, no, nv, nv, nv]);

    let shape_ooov = [nk, nk, nk, no, no, no, nv];
    let q = generate(Block::Ooov, &shape_ooov, &mut generator);
    let ooov = shape_ooov
        .iter()
        .map(|&n| 0..n)
        .multi_cartesian_product()
        .map(|x| q[[x[0], x[1], x[2], x[3], x[4], x[5], x[6]]] - q[[x[1], x[0], x[2], x[4], x[3], x[5], x[6]]])
        .collect_vec();
    let ooov = util::asarray_c(ooov, &shape_ooov);

    let t1 = generate(Block::T1, &[nk, no, nv], &mut generator);
    let fov = generate(Block::Fov, &[nk, no, nv], &mut generator);

    let mo_energy_occ = (0..nk).cartesian_product(0..no).map(|(k, i)| -1.0 + 0.1 * i as f64 + 0.05 * k as f64);
    let mo_energy_vir = (0..nk).cartesian_product(0..nv).map(|(k, a)| 0.5 + 0.15 * a as f64 + 0.03 * k as f64);
    let mo_energy_occ = util::asarray_c(mo_energy_occ.collect_vec(), &[nk, no]);
    let mo_energy_vir = util::asarray_c(mo_energy_vir.collect_vec(), &[nk, nv]);

    let info = KCCSDInfo { t1, t2, eris: KERIs { oovv, ooov, ovvv }, mo_energy_occ, mo_energy_vir, fov };
    info.check_shapes()?;
    debug!("Synthetic system with nkpts {nk}, nocc {no}, nvir {nv}");
    Ok(info)
}

/// Smooth deterministic elements, `0.1 sin(tag + sum_n 0.731 (n + 1) idx[n])` (`fov` scaled by 0.1).
///
/// Used for regression fixtures whose reference energies are known.
pub fn sine_generator(block: Block, idx: &[usize]) -> f64 {
    let phase = idx.iter().enumerate().fold(block.tag(), |acc, (n, &x)| acc + x as f64 * (n + 1) as f64 * 0.731);
    let val = 0.1 * phase.sin();
    if block == Block::Fov { 0.1 * val } else { val }
}

/// Random system on a Gamma-centred `mesh`, elements uniform in `[-0.5, 0.5)` (`fov` scaled by 0.1).
///
/// Returns the k-point set alongside the store, since the kernel needs both.
pub fn random_system<T: KScalar>(
    mesh: [usize; 3],
    nocc: usize,
    nvir: usize,
    seed: u64,
) -> Result<(KptsConserv, KCCSDInfo<T>)> {
    let kconserv = KptsConserv::monkhorst_pack(mesh);
    let mut rng = StdRng::seed_from_u64(seed);
    let info = build_system(&kconserv, nocc, nvir, |block, _| {
        let scale = if block == Block::Fov { 0.1 } else { 1.0 };
        let re: f64 = rng.gen_range(-0.5..0.5) * scale;
        let im: f64 = rng.gen_range(-0.5..0.5) * scale;
        T::from_parts(re, im)
    })?;
    Ok((kconserv, info))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_block_antisymmetry() {
        let (kconserv, info) = random_system::<Complex<f64>>([2, 1, 1], 2, 3, 11).unwrap();
        let table = KConservTable::new(&kconserv).unwrap();
        let (nk, no, nv) = (info.nkpts(), info.nocc(), info.nvir());
        let t2 = &info.t2;
        let ovvv = &info.eris.ovvv;
        let ooov = &info.eris.ooov;
        for ((ki, kj), ka) in (0..nk).cartesian_product(0..nk).cartesian_product(0..nk) {
            let kb = table.get(ki, ka, kj);
            for (((i, j), a), b) in (0..no).cartesian_product(0..no).cartesian_product(0..nv).cartesian_product(0..nv) {
                let x = t2[[ki, kj, ka, i, j, a, b]];
                assert!((x + t2[[kj, ki, ka, j, i, a, b]]).norm() < 1e-14);
                assert!((x + t2[[ki, kj, kb, i, j, b, a]]).norm() < 1e-14);
            }
            // (kj, ka) doubles as a pair of virtual momenta for ovvv
            let (kv1, kv2) = (kj, ka);
            let kv3 = table.get(ki, kv2, kv1);
            for (((i, a), b), c) in (0..no).cartesian_product(0..nv).cartesian_product(0..nv).cartesian_product(0..nv) {
                assert!((ovvv[[ki, kv1, kv2, i, a, b, c]] + ovvv[[ki, kv1, kv3, i, a, c, b]]).norm() < 1e-14);
            }
            for (((i, j), k), a) in (0..no).cartesian_product(0..no).cartesian_product(0..no).cartesian_product(0..nv) {
                assert!((ooov[[ki, kj, ka, i, j, k, a]] + ooov[[kj, ki, ka, j, i, k, a]]).norm() < 1e-14);
            }
        }
    }

    #[test]
    fn test_seeded_reproducible() {
        let (_, a) = random_system::<f64>([1, 2, 1], 2, 2, 5).unwrap();
        let (_, b) = random_system::<f64>([1, 2, 1], 2, 2, 5).unwrap();
        let (_, c) = random_system::<f64>([1, 2, 1], 2, 2, 6).unwrap();
        assert_eq!(a.t2.raw(), b.t2.raw());
        assert_eq!(a.fov.raw(), b.fov.raw());
        assert_ne!(a.t2.raw(), c.t2.raw());
        assert!(a.fov.raw().iter().all(|x| x.abs() <= 0.05));
    }

    #[test]
    fn test_energy_ladders() {
        let info = build_system(&KptsConserv::monkhorst_pack([2, 1, 1]), 2, 2, |_, _| 0.0).unwrap();
        assert_eq!(info.mo_energy_occ[[1, 1]], -1.0 + 0.1 + 0.05);
        assert_eq!(info.mo_energy_vir[[1, 0]], 0.5 + 0.03);
        assert!(info.t2.raw().iter().all(|&x| x == 0.0));
    }
}

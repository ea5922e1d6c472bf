//! k-point CCSD(T) energy.
//!
//! For every momentum 5-tuple `(ki, kj, kk, ka, kb)` (with `kc` closed by conservation) and virtual
//! triple `(a, b, c)`, the connected and disconnected triples over `(i, j, k)` are
//!
//! ```text
//! W_ijk^abc = P(i/jk) P(a/bc) [ - sum_e t_jk^ae conj<ie||bc> - sum_m t_im^bc conj<jk||ma> ]
//! V_ijk^abc = P(i/jk) P(a/bc) [ t_i^a conj<jk||bc> + conj(f_ia) t_jk^bc ]       (only if ki == ka)
//! ```
//!
//! with `P(i/jk) = 1 - P(ij) - P(ik)`, and the energy is
//! `E = 1/36 sum conj(W) (W + V) / (e_i + e_j + e_k - e_a - e_b - e_c)`.
//!
//! Each of the 9 permutation slots evaluates the same base contraction on relabelled momenta and
//! virtual indices; the occupied relabelling is applied by scattering the base block through a
//! precomputed transposed index map.

use crate::prelude::*;
use std::time::Instant;

pub struct TransposedIndices {
    pub tr_012: Vec<usize>,
    pub tr_102: Vec<usize>,
    pub tr_210: Vec<usize>,
}

pub fn prepare_transposed_indices(nocc: usize) -> TransposedIndices {
    let device = DeviceTsr::default();
    let base = rt::arange((nocc * nocc * nocc, &device)).into_shape([nocc, nocc, nocc]);
    let tr_012 = base.transpose([0, 1, 2]).reshape(-1).to_vec();
    let tr_102 = base.transpose([1, 0, 2]).reshape(-1).to_vec();
    let tr_210 = base.transpose([2, 1, 0]).reshape(-1).to_vec();

    TransposedIndices { tr_012, tr_102, tr_210 }
}

/// Identity and the two transpositions involving the first slot, with their parities.
const PERM_SLOTS: [([usize; 3], f64); 3] = [([0, 1, 2], 1.0), ([1, 0, 2], -1.0), ([2, 1, 0], -1.0)];

/// Row-major copy of `tsr` with permuted axes, optionally conjugated.
fn transposed_copy<T: KScalar>(tsr: &Tsr<T>, axes: &[usize], conj: bool) -> Tsr<T> {
    let view = tsr.transpose(axes.to_vec());
    let data = view.iter().map(|&x| if conj { x.conj() } else { x }).collect_vec();
    util::asarray_c(data, view.shape())
}

/// Contiguous trailing block of a row-major tensor with the leading indices fixed.
#[inline]
fn sub<'a, T: KScalar>(tsr: &'a Tsr<T>, index: &[usize]) -> &'a [T] {
    let shape = tsr.shape();
    let size: usize = shape[index.len()..].iter().product();
    let offset = izip!(index, shape).fold(0, |acc, (&i, &n)| acc * n + i) * size;
    &tsr.raw()[offset..offset + size]
}

#[inline]
fn dot<T: KScalar>(x: &[T], y: &[T]) -> T {
    izip!(x, y).fold(T::from_real(0.0), |acc, (&x, &y)| acc + x * y)
}

/// `[ki, kj, kk, ka, kb]` from its row-major position in `[0, nk)^5`.
fn unravel_kpts(mut idx: usize, nkpts: usize) -> [usize; 5] {
    let mut kpts = [0; 5];
    for k in kpts.iter_mut().rev() {
        *k = idx % nkpts;
        idx /= nkpts;
    }
    kpts
}

pub fn prepare_intermediates<T: KScalar, K: KConservAPI + ?Sized>(
    info: &KCCSDInfo<T>,
    kconserv: &K,
) -> Result<KCCSDTIntermediates<T>> {
    let nkpts = info.nkpts();
    let nocc = info.nocc();
    if kconserv.nkpts() != nkpts {
        return Err(KCCSDTError::ShapeMismatch {
            name: "kconserv",
            expected: vec![nkpts],
            found: vec![kconserv.nkpts()],
        });
    }
    let kconserv = KConservTable::new(kconserv)?;

    let t1_t = transposed_copy(&info.t1, &[0, 2, 1], false);
    let t2_vvoo = transposed_copy(&info.t2, &[0, 1, 2, 5, 6, 3, 4], false);
    let t2_voov = transposed_copy(&info.t2, &[0, 1, 2, 5, 3, 4, 6], false);
    let eri_vvov_c = transposed_copy(&info.eris.ovvv, &[0, 1, 2, 5, 6, 3, 4], true);
    let eri_vooo_c = transposed_copy(&info.eris.ooov, &[0, 1, 2, 6, 3, 4, 5], true);
    let eri_vvoo_c = transposed_copy(&info.eris.oovv, &[0, 1, 2, 5, 6, 3, 4], true);
    let fov_c_t = transposed_copy(&info.fov, &[0, 2, 1], true);

    // d_ooo[ki, kj, kk, i, j, k] = eo[ki, i] + eo[kj, j] + eo[kk, k]
    let eo = info.mo_energy_occ.iter().copied().collect_vec();
    let d_ooo = (0..3)
        .map(|_| 0..nkpts)
        .multi_cartesian_product()
        .flat_map(|ks| {
            let eo = &eo;
            (0..3).map(|_| 0..nocc).multi_cartesian_product().map(move |orbs| {
                izip!(&ks, &orbs).map(|(&k, &i)| eo[k * nocc + i]).sum::<f64>()
            })
        })
        .collect_vec();
    let e_vir = info.mo_energy_vir.iter().copied().collect_vec();

    Ok(KCCSDTIntermediates {
        t1_t,
        t2_vvoo,
        t2_voov,
        eri_vvov_c,
        eri_vooo_c,
        eri_vvoo_c,
        fov_c_t,
        d_ooo,
        e_vir,
        kconserv,
    })
}

/// Per-worker buffers of the contraction, each of length `nocc^3`.
pub struct T3Scratch<T> {
    wc: Vec<T>,
    vd: Vec<T>,
    wbuf: Vec<T>,
    vbuf: Vec<T>,
}

impl<T: KScalar> T3Scratch<T> {
    pub fn new(nocc: usize) -> Self {
        let zeros = vec![T::from_real(0.0); nocc * nocc * nocc];
        Self { wc: zeros.clone(), vd: zeros.clone(), wbuf: zeros.clone(), vbuf: zeros }
    }
}

/// Base contraction for one relabelled assignment `(P, Q, R | A, B, C)`.
///
/// `wbuf[p, q, r]` receives the connected part; `vbuf[p, q, r]` the disconnected part, which is only
/// written (and `true` returned) when `kP == kA`.
fn get_w<T: KScalar>(
    kocc: [usize; 3],
    kvir: [usize; 3],
    vir: [usize; 3],
    wbuf: &mut [T],
    vbuf: &mut [T],
    intermediates: &KCCSDTIntermediates<T>,
) -> bool {
    let KCCSDTIntermediates { t1_t, t2_vvoo, t2_voov, eri_vvov_c, eri_vooo_c, eri_vvoo_c, fov_c_t, .. } =
        intermediates;
    let kconserv = &intermediates.kconserv;
    let nocc = t1_t.shape()[2];
    let nvir = t1_t.shape()[1];
    let noo = nocc * nocc;

    let [kp, kq, kr] = kocc;
    let [ka, kb, kc] = kvir;
    let [a, b, c] = vir;

    // - sum_e t2[kq, kr, ka; q, r, a, e] conj(ovvv[kp, ke, kb; p, e, b, c])
    let ke = kconserv.get(kq, ka, kr);
    let eri_pe = sub(eri_vvov_c, &[kp, ke, kb, b, c]);
    let t2_qre = sub(t2_voov, &[kq, kr, ka, a]);
    // - sum_m t2[kp, km, kb; p, m, b, c] conj(ooov[kq, kr, km; q, r, m, a])
    let km = kconserv.get(kb, kp, kc);
    let t2_pm = sub(t2_vvoo, &[kp, km, kb, b, c]);
    let eri_qrm = sub(eri_vooo_c, &[kq, kr, km, a]);

    for (p, w_p) in wbuf.chunks_exact_mut(noo).enumerate() {
        let eri_e = &eri_pe[p * nvir..(p + 1) * nvir];
        let t2_m = &t2_pm[p * nocc..(p + 1) * nocc];
        izip!(w_p, t2_qre.chunks_exact(nvir), eri_qrm.chunks_exact(nocc)).for_each(|(w, t2_e, eri_m)| {
            *w = -(dot(t2_e, eri_e) + dot(t2_m, eri_m));
        });
    }

    if kp != ka {
        return false;
    }

    // t1[kp; p, a] conj(oovv[kq, kr, kb; q, r, b, c]) + conj(fov[kp; p, a]) t2[kq, kr, kb; q, r, b, c]
    let t1_p = sub(t1_t, &[kp, a]);
    let fov_p = sub(fov_c_t, &[kp, a]);
    let eri_qr = sub(eri_vvoo_c, &[kq, kr, kb, b, c]);
    let t2_qr = sub(t2_vvoo, &[kq, kr, kb, b, c]);
    izip!(vbuf.chunks_exact_mut(noo), t1_p, fov_p).for_each(|(v_p, &t1, &fov)| {
        izip!(v_p, eri_qr, t2_qr).for_each(|(v, &eri, &t2)| *v = t1 * eri + fov * t2);
    });
    true
}

/// Energy contribution of one momentum 5-tuple and first virtual index `a`, summed over `(b, c)`.
///
/// When `sink` is given, the triples are also written into the 5-tuple's chunks of the full tensors,
/// laid out `[i, j, k, a, b, c]`.
fn ccsd_t_energy_contribution<T: KScalar>(
    kpts: [usize; 5],
    a: usize,
    intermediates: &KCCSDTIntermediates<T>,
    tr_indices: &TransposedIndices,
    scratch: &mut T3Scratch<T>,
    mut sink: Option<(&mut [T], &mut [T])>,
) -> T {
    let nkpts = intermediates.kconserv.nkpts();
    let nocc = intermediates.t1_t.shape()[2];
    let nvir = intermediates.t1_t.shape()[1];
    let nvvv = nvir * nvir * nvir;
    let d_ooo = &intermediates.d_ooo;
    let ev = &intermediates.e_vir;

    let [ki, kj, kk, ka, kb] = kpts;
    let kc = intermediates.kconserv.get3(kpts);
    let kocc = [ki, kj, kk];
    let kvir = [ka, kb, kc];
    let tr_occ = [&tr_indices.tr_012, &tr_indices.tr_102, &tr_indices.tr_210];

    let nooo = nocc * nocc * nocc;
    let d_offset = ((ki * nkpts + kj) * nkpts + kk) * nooo;
    let d_ijk = &d_ooo[d_offset..d_offset + nooo];

    let T3Scratch { wc, vd, wbuf, vbuf } = scratch;
    let mut e_sum = T::from_real(0.0);
    for (b, c) in (0..nvir).cartesian_product(0..nvir) {
        let vir = [a, b, c];
        wc.fill(T::from_real(0.0));
        vd.fill(T::from_real(0.0));

        for (&(perm_o, sign_o), tr) in PERM_SLOTS.iter().zip(tr_occ) {
            let kocc_p = perm_o.map(|x| kocc[x]);
            for &(perm_v, sign_v) in PERM_SLOTS.iter() {
                let kvir_p = perm_v.map(|x| kvir[x]);
                let vir_p = perm_v.map(|x| vir[x]);
                let sign = sign_o * sign_v;
                let gated = get_w(kocc_p, kvir_p, vir_p, wbuf, vbuf, intermediates);
                wc.iter_mut().zip(tr.iter()).for_each(|(w, &tr_idx)| {
                    *w += unsafe { *wbuf.get_unchecked(tr_idx) } * sign;
                });
                if gated {
                    vd.iter_mut().zip(tr.iter()).for_each(|(v, &tr_idx)| {
                        *v += unsafe { *vbuf.get_unchecked(tr_idx) } * sign;
                    });
                }
            }
        }

        let d_abc = -(ev[ka * nvir + a] + ev[kb * nvir + b] + ev[kc * nvir + c]);
        e_sum += izip!(wc.iter(), vd.iter(), d_ijk)
            .fold(T::from_real(0.0), |acc, (&w, &v, &d)| acc + w.conj() * (w + v) / (d + d_abc));

        if let Some((t3c, t3d)) = sink.as_mut() {
            let abc = (a * nvir + b) * nvir + c;
            for (n, (&w, &v)) in wc.iter().zip(vd.iter()).enumerate() {
                t3c[n * nvvv + abc] = w;
                t3d[n * nvvv + abc] = v;
            }
        }
    }
    e_sum
}

/// Memory (MB, rounded up) of the connected and disconnected triples; `None` if it overflows `usize`.
fn materialized_size_mb<T>(nkpts: usize, nocc: usize, nvir: usize) -> Option<usize> {
    let chunk = nocc.checked_pow(3)?.checked_mul(nvir.checked_pow(3)?)?;
    let len = nkpts.checked_pow(5)?.checked_mul(chunk)?;
    let bytes = len.checked_mul(2 * std::mem::size_of::<T>())?;
    Some(bytes.div_ceil(1024 * 1024))
}

/// Perturbative triples correction of k-point CCSD.
///
/// Streams over `(ki, kj, kk, ka, kb, a)` by default; with `config.materialize` the full connected and
/// disconnected triples are kept (and optionally checked for antisymmetry).
pub fn get_kccsd_pt_energy<T: KScalar, K: KConservAPI + ?Sized>(
    info: &KCCSDInfo<T>,
    kconserv: &K,
    config: &KCCSDTConfig,
) -> Result<KCCSDTResults<T>> {
    let time_outer = Instant::now();
    info.check_shapes()?;

    let nkpts = info.nkpts();
    let nocc = info.nocc();
    let nvir = info.nvir();
    if nocc == 0 || nvir == 0 {
        warn!("Empty occupied or virtual space; KCCSD(T) energy is zero");
        let e_corr_pt = T::from_real(0.0);
        return Ok(KCCSDTResults { e_corr_pt, t3c: None, t3d: None, symmetry_report: None });
    }
    if config.materialize {
        let required = materialized_size_mb::<T>(nkpts, nocc, nvir).unwrap_or(usize::MAX);
        if required > config.max_memory {
            return Err(KCCSDTError::MemoryExceeded { required, limit: config.max_memory });
        }
        debug!("Materializing triples, {required} MB");
    }

    // prepare intermediates
    let timer = Instant::now();
    let intermediates = prepare_intermediates(info, kconserv)?;
    let tr_indices = prepare_transposed_indices(nocc);
    let nkpts5 = nkpts.pow(5);
    let chunk = nocc.pow(3) * nvir.pow(3);
    info!("Time elapsed (KCCSD(T) preparation): {:?}", timer.elapsed());
    debug!("nkpts {nkpts}, nocc {nocc}, nvir {nvir}, {} momentum tuples", nkpts5);

    let timer = Instant::now();
    let (e_sum, t3c, t3d) = if config.materialize {
        let mut t3c = vec![T::from_real(0.0); nkpts5 * chunk];
        let mut t3d = vec![T::from_real(0.0); nkpts5 * chunk];
        let e_sum = t3c
            .par_chunks_mut(chunk)
            .zip(t3d.par_chunks_mut(chunk))
            .enumerate()
            .map_init(
                || T3Scratch::new(nocc),
                |scratch, (idx, (t3c_k, t3d_k))| {
                    let kpts = unravel_kpts(idx, nkpts);
                    let mut e_sum = T::from_real(0.0);
                    for a in 0..nvir {
                        let sink = Some((&mut *t3c_k, &mut *t3d_k));
                        e_sum += ccsd_t_energy_contribution(kpts, a, &intermediates, &tr_indices, scratch, sink);
                    }
                    e_sum
                },
            )
            .sum::<T>();
        let shape = [vec![nkpts; 5], vec![nocc; 3], vec![nvir; 3]].concat();
        (e_sum, Some(util::asarray_c(t3c, &shape)), Some(util::asarray_c(t3d, &shape)))
    } else {
        debug!("Streaming {} contraction tasks", nkpts5 * nvir);
        let e_sum = (0..nkpts5 * nvir)
            .into_par_iter()
            .map_init(
                || T3Scratch::new(nocc),
                |scratch, task| {
                    let kpts = unravel_kpts(task / nvir, nkpts);
                    ccsd_t_energy_contribution(kpts, task % nvir, &intermediates, &tr_indices, scratch, None)
                },
            )
            .sum::<T>();
        (e_sum, None, None)
    };
    info!("Time elapsed (KCCSD(T) contraction): {:?}", timer.elapsed());

    let e_corr_pt = e_sum / 36.0;
    if e_corr_pt.im().abs() > 1.0e-8 {
        warn!("KCCSD(T) energy carries an imaginary part of {:.3e}", e_corr_pt.im());
    }

    let symmetry_report = match (&t3c, &t3d) {
        (Some(t3c), Some(t3d)) if config.check_symmetry => {
            let report = SymmetryReport::triples(t3c, t3d, config.symmetry_tol)?;
            info!("Antisymmetry of triples: {}", if report.all_passed() { "passed" } else { "FAILED" });
            Some(report)
        },
        _ => {
            if config.check_symmetry {
                warn!("Antisymmetry checks need materialized triples; skipped");
            }
            None
        },
    };

    info!("Time elapsed (KCCSD(T) total time): {:?}", time_outer.elapsed());
    info!("KCCSD(T) Perturb Energy: {}", e_corr_pt);
    Ok(KCCSDTResults { e_corr_pt, t3c, t3d, symmetry_report })
}

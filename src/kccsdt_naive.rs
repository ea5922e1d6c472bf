//! Element-by-element k-point CCSD(T), serial and always materialized.
//!
//! Every momentum is closed through the caller's oracle directly (no memoised table) and every
//! amplitude is read from the store by index, so this is a slow but independent check of
//! [`kccsdt::get_kccsd_pt_energy`].

use crate::prelude::*;

/// Orbital label with its momentum.
type Label = (usize, usize);

/// `- sum_e t2[kq,kr,ka; q,r,a,e] conj(<pe||bc>) - sum_m t2[kp,km,kb; p,m,b,c] conj(<qr||ma>)`
fn connected_base<T: KScalar, K: KConservAPI + ?Sized>(
    info: &KCCSDInfo<T>,
    kconserv: &K,
    occ: [Label; 3],
    vir: [Label; 3],
) -> Result<T> {
    let [(kp, p), (kq, q), (kr, r)] = occ;
    let [(ka, a), (kb, b), (kc, c)] = vir;
    let t2 = &info.t2;
    let ovvv = &info.eris.ovvv;
    let ooov = &info.eris.ooov;

    let mut val = T::from_real(0.0);
    let ke = kconserv.resolve(&[kq, ka, kr])?;
    for e in 0..info.nvir() {
        val += -(t2[[kq, kr, ka, q, r, a, e]] * ovvv[[kp, ke, kb, p, e, b, c]].conj());
    }
    let km = kconserv.resolve(&[kb, kp, kc])?;
    for m in 0..info.nocc() {
        val += -(t2[[kp, km, kb, p, m, b, c]] * ooov[[kq, kr, km, q, r, m, a]].conj());
    }
    Ok(val)
}

/// `t1[kp; p,a] conj(<qr||bc>) + conj(f[kp; p,a]) t2[kq,kr,kb; q,r,b,c]` if `kp == ka`, else zero.
fn disconnected_base<T: KScalar>(info: &KCCSDInfo<T>, occ: [Label; 3], vir: [Label; 3]) -> T {
    let [(kp, p), (kq, q), (kr, r)] = occ;
    let [(ka, a), (kb, b), (_, c)] = vir;
    if kp != ka {
        return T::from_real(0.0);
    }
    info.t1[[kp, p, a]] * info.eris.oovv[[kq, kr, kb, q, r, b, c]].conj()
        + info.fov[[kp, p, a]].conj() * info.t2[[kq, kr, kb, q, r, b, c]]
}

pub fn get_kccsd_pt_energy_naive<T: KScalar, K: KConservAPI + ?Sized>(
    info: &KCCSDInfo<T>,
    kconserv: &K,
) -> Result<KCCSDTResults<T>> {
    let time_outer = std::time::Instant::now();
    info.check_shapes()?;
    let nkpts = info.nkpts();
    let nocc = info.nocc();
    let nvir = info.nvir();
    if kconserv.nkpts() != nkpts {
        return Err(KCCSDTError::ShapeMismatch {
            name: "kconserv",
            expected: vec![nkpts],
            found: vec![kconserv.nkpts()],
        });
    }

    let slots: [([usize; 3], f64); 3] = [([0, 1, 2], 1.0), ([1, 0, 2], -1.0), ([2, 1, 0], -1.0)];
    let eo = |k: usize, i: usize| info.mo_energy_occ[[k, i]];
    let ev = |k: usize, a: usize| info.mo_energy_vir[[k, a]];

    let mut t3c = vec![];
    let mut t3d = vec![];
    let mut e_sum = T::from_real(0.0);
    for kpts in (0..5).map(|_| 0..nkpts).multi_cartesian_product() {
        let kc = kconserv.resolve(&kpts)?;
        let [ki, kj, kk, ka, kb] = [kpts[0], kpts[1], kpts[2], kpts[3], kpts[4]];
        for ijk in (0..3).map(|_| 0..nocc).multi_cartesian_product() {
            for abc in (0..3).map(|_| 0..nvir).multi_cartesian_product() {
                let occ = [(ki, ijk[0]), (kj, ijk[1]), (kk, ijk[2])];
                let vir = [(ka, abc[0]), (kb, abc[1]), (kc, abc[2])];

                let mut wc = T::from_real(0.0);
                let mut vd = T::from_real(0.0);
                for (perm_o, sign_o) in slots {
                    for (perm_v, sign_v) in slots {
                        let occ_p = perm_o.map(|x| occ[x]);
                        let vir_p = perm_v.map(|x| vir[x]);
                        wc += connected_base(info, kconserv, occ_p, vir_p)? * (sign_o * sign_v);
                        vd += disconnected_base(info, occ_p, vir_p) * (sign_o * sign_v);
                    }
                }

                let d = eo(ki, ijk[0]) + eo(kj, ijk[1]) + eo(kk, ijk[2])
                    - ev(ka, abc[0])
                    - ev(kb, abc[1])
                    - ev(kc, abc[2]);
                e_sum += wc.conj() * (wc + vd) / d;
                t3c.push(wc);
                t3d.push(vd);
            }
        }
    }

    let e_corr_pt = e_sum / 36.0;
    info!("Time elapsed (naive KCCSD(T)): {:?}", time_outer.elapsed());
    info!("KCCSD(T) Perturb Energy (naive): {}", e_corr_pt);

    let shape = [vec![nkpts; 5], vec![nocc; 3], vec![nvir; 3]].concat();
    Ok(KCCSDTResults {
        e_corr_pt,
        t3c: Some(util::asarray_c(t3c, &shape)),
        t3d: Some(util::asarray_c(t3d, &shape)),
        symmetry_report: None,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::synthetic::{build_system, random_system, sine_generator};

    fn max_diff<T: KScalar>(x: &Tsr<T>, y: &Tsr<T>) -> f64 {
        x.iter().zip(y.iter()).map(|(&x, &y)| (x - y).abs()).fold(0.0, f64::max)
    }

    #[test]
    fn test_naive_fixture() {
        let kconserv = KptsConserv::monkhorst_pack([1, 1, 1]);
        let info = build_system(&kconserv, 3, 3, sine_generator).unwrap();
        let results = get_kccsd_pt_energy_naive(&info, &kconserv).unwrap();
        assert!((results.e_corr_pt - -6.178157297219625e-06).abs() < 1e-12);
    }

    #[test]
    fn test_naive_matches_fast_real() {
        let (kconserv, info) = random_system::<f64>([2, 1, 1], 2, 3, 17).unwrap();
        let config = KCCSDTConfig { materialize: true, ..Default::default() };
        let naive = get_kccsd_pt_energy_naive(&info, &kconserv).unwrap();
        let fast = kccsdt::get_kccsd_pt_energy(&info, &kconserv, &config).unwrap();
        assert!((naive.e_corr_pt - fast.e_corr_pt).abs() < 1e-10 * naive.e_corr_pt.abs().max(1.0));
        assert!(max_diff(naive.t3c.as_ref().unwrap(), fast.t3c.as_ref().unwrap()) < 1e-12);
        assert!(max_diff(naive.t3d.as_ref().unwrap(), fast.t3d.as_ref().unwrap()) < 1e-12);
    }

    #[test]
    fn test_naive_matches_fast_complex() {
        let (kconserv, info) = random_system::<Complex<f64>>([3, 1, 1], 3, 2, 29).unwrap();
        let config = KCCSDTConfig { materialize: true, check_symmetry: true, ..Default::default() };
        let naive = get_kccsd_pt_energy_naive(&info, &kconserv).unwrap();
        let fast = kccsdt::get_kccsd_pt_energy(&info, &kconserv, &config).unwrap();
        assert!((naive.e_corr_pt - fast.e_corr_pt).norm() < 1e-10 * naive.e_corr_pt.norm().max(1.0));
        assert!(max_diff(naive.t3c.as_ref().unwrap(), fast.t3c.as_ref().unwrap()) < 1e-12);
        assert!(max_diff(naive.t3d.as_ref().unwrap(), fast.t3d.as_ref().unwrap()) < 1e-12);

        let report = SymmetryReport::triples(naive.t3c.as_ref().unwrap(), naive.t3d.as_ref().unwrap(), 1e-10).unwrap();
        assert!(report.all_passed());
        assert!(fast.symmetry_report.unwrap().all_passed());
    }
}

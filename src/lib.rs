#![allow(clippy::deref_addrof)]

pub mod prelude;

pub mod error;
pub mod kccsdt;
pub mod kccsdt_naive;
pub mod kconserv;
pub mod structs;
pub mod symmetry;
pub mod synthetic;
pub mod util;

#[test]
fn playground_kccsdt() {
    use crate::prelude::*;

    let (kconserv, info) = synthetic::random_system::<f64>([2, 2, 1], 3, 4, 42).unwrap();
    let config = KCCSDTConfig::default();

    let kccsdt_results = kccsdt::get_kccsd_pt_energy(&info, &kconserv, &config).unwrap();
    println!("KCCSD(T) Perturb Energy: {}", kccsdt_results.e_corr_pt);
}

#[test]
fn playground_kccsdt_complex_symmetry() {
    use crate::prelude::*;

    let (kconserv, info) = synthetic::random_system::<Complex<f64>>([2, 1, 1], 3, 3, 2024).unwrap();
    let config = KCCSDTConfig { materialize: true, check_symmetry: true, ..Default::default() };

    let kccsdt_results = kccsdt::get_kccsd_pt_energy(&info, &kconserv, &config).unwrap();
    println!("KCCSD(T) Perturb Energy: {}", kccsdt_results.e_corr_pt);
    let report = kccsdt_results.symmetry_report.unwrap();
    for check in &report.checks {
        println!("{:>4} ({}, {}): {:.3e}", check.label, check.idx1, check.idx2, check.residual);
    }
    assert!(report.all_passed());
}

#[test]
fn playground_kccsdt_naive() {
    use crate::prelude::*;

    let (kconserv, info) = synthetic::random_system::<f64>([2, 1, 1], 2, 3, 42).unwrap();
    let naive_results = kccsdt_naive::get_kccsd_pt_energy_naive(&info, &kconserv).unwrap();
    let kccsdt_results = kccsdt::get_kccsd_pt_energy(&info, &kconserv, &KCCSDTConfig::default()).unwrap();
    println!("KCCSD(T) Perturb Energy (naive): {}", naive_results.e_corr_pt);
    println!("KCCSD(T) Perturb Energy        : {}", kccsdt_results.e_corr_pt);
    let e_ref = naive_results.e_corr_pt;
    assert!((e_ref - kccsdt_results.e_corr_pt).abs() < 1e-10 * e_ref.abs().max(1.0));
}

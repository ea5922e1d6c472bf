use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use num_complex::Complex;
use showcase_workshop_rstsr_kccsdt::prelude::*;
use showcase_workshop_rstsr_kccsdt::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct CliParser {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CliArgs {
    #[clap(long = "t1", help = "Path to the npy file of t1 [k, i, a]")]
    t1_file: String,

    #[clap(long = "t2", help = "Path to the npy file of t2 [ki, kj, ka, i, j, a, b]")]
    t2_file: String,

    #[clap(long = "oovv", help = "Path to the npy file of <ij||ab> [ki, kj, ka, i, j, a, b]")]
    oovv_file: String,

    #[clap(long = "ooov", help = "Path to the npy file of <ij||ka> [ki, kj, kk, i, j, k, a]")]
    ooov_file: String,

    #[clap(long = "ovvv", help = "Path to the npy file of <ia||bc> [ki, ka, kb, i, a, b, c]")]
    ovvv_file: String,

    #[clap(long = "fock", help = "Path to the npy file of the Fock matrix [k, p, q]")]
    fock_file: String,

    #[clap(long, value_delimiter = ',', required = true, help = "Gamma-centred k-mesh, e.g. 2,2,1")]
    kmesh: Vec<usize>,

    #[clap(long, help = "Read complex-valued amplitudes and integrals")]
    complex: bool,
}

#[derive(Args, Debug)]
struct CliConfig {
    #[clap(long, help = "Keep the full triples tensors (implied by --check-symmetry)")]
    materialize: bool,

    #[clap(long = "check-symmetry", help = "Check antisymmetry of the materialized triples")]
    check_symmetry: bool,

    #[clap(long = "max-memory", default_value_t = 2000, help = "Memory limit (MB) of the materialized triples")]
    max_memory: usize,
}

impl From<&CliConfig> for KCCSDTConfig {
    fn from(cli: &CliConfig) -> Self {
        KCCSDTConfig {
            materialize: cli.materialize || cli.check_symmetry,
            check_symmetry: cli.check_symmetry,
            max_memory: cli.max_memory,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(name = "kccsdt", about = "Run KCCSD(T) on amplitudes and integrals stored as npy files")]
    Kccsdt {
        #[clap(flatten)]
        args: CliArgs,
        #[clap(flatten)]
        config: CliConfig,
    },

    #[clap(name = "kccsdt-naive", about = "Run the serial element-wise KCCSD(T) reference")]
    KccsdtNaive(CliArgs),

    #[clap(name = "synthetic", about = "Run KCCSD(T) on a random antisymmetrized system")]
    Synthetic {
        #[clap(long, value_delimiter = ',', required = true, help = "Gamma-centred k-mesh, e.g. 2,2,1")]
        kmesh: Vec<usize>,

        #[clap(long, default_value_t = 2)]
        nocc: usize,

        #[clap(long, default_value_t = 3)]
        nvir: usize,

        #[clap(long, default_value_t = 0)]
        seed: u64,

        #[clap(long, help = "Generate complex-valued amplitudes and integrals")]
        complex: bool,

        #[clap(long = "max-memory", default_value_t = 2000)]
        max_memory: usize,
    },
}

fn parse_kmesh(kmesh: &[usize]) -> Result<[usize; 3]> {
    kmesh.try_into().map_err(|_| eyre!("k-mesh must have 3 entries, found {kmesh:?}"))
}

fn load_info<T: KScalar + npyz::Deserialize>(args: &CliArgs) -> Result<KCCSDInfo<T>> {
    let t1 = util::tensor_from_npy(&args.t1_file)?;
    let t2 = util::tensor_from_npy(&args.t2_file)?;
    let eris = KERIs {
        oovv: util::tensor_from_npy(&args.oovv_file)?,
        ooov: util::tensor_from_npy(&args.ooov_file)?,
        ovvv: util::tensor_from_npy(&args.ovvv_file)?,
    };
    let fock = util::tensor_from_npy(&args.fock_file)?;
    KCCSDInfo::from_fock(t1, t2, eris, &fock).wrap_err("Inconsistent KCCSD input")
}

fn run_kccsdt<T: KScalar + npyz::Deserialize>(args: &CliArgs, config: &KCCSDTConfig) -> Result<()> {
    let kconserv = KptsConserv::monkhorst_pack(parse_kmesh(&args.kmesh)?);
    let info = load_info::<T>(args)?;
    let results = kccsdt::get_kccsd_pt_energy(&info, &kconserv, config)?;
    println!("KCCSD(T) Perturb Energy: {}", results.e_corr_pt);
    if let Some(report) = results.symmetry_report {
        println!("Antisymmetry of triples: {}", if report.all_passed() { "passed" } else { "FAILED" });
    }
    Ok(())
}

fn run_kccsdt_naive<T: KScalar + npyz::Deserialize>(args: &CliArgs) -> Result<()> {
    let kconserv = KptsConserv::monkhorst_pack(parse_kmesh(&args.kmesh)?);
    let info = load_info::<T>(args)?;
    let results = kccsdt_naive::get_kccsd_pt_energy_naive(&info, &kconserv)?;
    println!("KCCSD(T) Perturb Energy (naive): {}", results.e_corr_pt);
    Ok(())
}

fn run_synthetic<T: KScalar>(mesh: [usize; 3], nocc: usize, nvir: usize, seed: u64, max_memory: usize) -> Result<()> {
    let (kconserv, info) = synthetic::random_system::<T>(mesh, nocc, nvir, seed)?;
    let config = KCCSDTConfig { materialize: true, check_symmetry: true, max_memory, ..Default::default() };
    let results = kccsdt::get_kccsd_pt_energy(&info, &kconserv, &config)?;
    println!("KCCSD(T) Perturb Energy: {}", results.e_corr_pt);
    if let Some(report) = results.symmetry_report {
        for check in &report.checks {
            let status = if check.passed { "ok" } else { "FAILED" };
            println!("{:>4} ({}, {}): residual {:.3e} {status}", check.label, check.idx1, check.idx2, check.residual);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = CliParser::parse();
    let time = std::time::Instant::now();

    match args.command {
        Command::Kccsdt { args, config } => {
            let config = KCCSDTConfig::from(&config);
            match args.complex {
                false => run_kccsdt::<f64>(&args, &config)?,
                true => run_kccsdt::<Complex<f64>>(&args, &config)?,
            }
        },
        Command::KccsdtNaive(args) => match args.complex {
            false => run_kccsdt_naive::<f64>(&args)?,
            true => run_kccsdt_naive::<Complex<f64>>(&args)?,
        },
        Command::Synthetic { kmesh, nocc, nvir, seed, complex, max_memory } => {
            let mesh = parse_kmesh(&kmesh)?;
            match complex {
                false => run_synthetic::<f64>(mesh, nocc, nvir, seed, max_memory)?,
                true => run_synthetic::<Complex<f64>>(mesh, nocc, nvir, seed, max_memory)?,
            }
        },
    }

    info!("Elapsed time: {:.2?}", time.elapsed());
    Ok(())
}

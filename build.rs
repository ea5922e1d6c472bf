#![allow(unused)]

use std::path::PathBuf;

/// Directories where an OpenBLAS shared library may live.
///
/// Entries of `REST_EXT_DIR`, `OPENBLAS_DIR` and the dynamic loader paths come first, followed by the
/// usual system prefixes; each is tried bare and with the common library subdirectories.
fn openblas_search_paths() -> Vec<PathBuf> {
    let env_candidates = ["REST_EXT_DIR", "OPENBLAS_DIR", "LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH"];
    let sys_candidates = ["/usr", "/usr/local", "/opt"];
    let lib_dirs = ["", "lib", "lib64", "lib/x86_64-linux-gnu"];
    let sep = if cfg!(windows) { ';' } else { ':' };

    let roots = env_candidates
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .flat_map(|paths| paths.split(sep).map(str::to_string).collect::<Vec<_>>())
        .filter(|path| !path.is_empty())
        .chain(sys_candidates.iter().map(|path| path.to_string()))
        .map(PathBuf::from)
        .collect::<Vec<_>>();

    roots
        .iter()
        .flat_map(|root| lib_dirs.iter().map(move |lib| root.join(lib)))
        .filter(|path| path.is_dir())
        .filter_map(|path| std::fs::canonicalize(path).ok())
        .collect()
}

fn link_openblas() {
    for var in ["REST_EXT_DIR", "OPENBLAS_DIR"] {
        println!("cargo:rerun-if-env-changed={var}");
    }
    for path in openblas_search_paths() {
        println!("cargo:rustc-link-search=native={}", path.display());
    }
    println!("cargo:rustc-link-lib=openblas");
    println!("cargo:rustc-link-lib=gomp");
}

fn main() {
    #[cfg(feature = "use_openblas")]
    link_openblas();
}

#![allow(unused)]

/* #region for API callers */

pub use crate::error::KCCSDTError;
pub use crate::kconserv::{KConservAPI, KConservTable, KptsConserv};
pub use crate::structs::{KCCSDInfo, KCCSDTConfig, KCCSDTIntermediates, KCCSDTResults, KERIs};
pub use crate::symmetry::{SymmetryCheck, SymmetryReport};
pub use crate::util::KScalar;

// RSTSR backend selection
#[cfg(not(feature = "use_openblas"))]
pub type DeviceTsr = DeviceFaer;
#[cfg(feature = "use_openblas")]
pub type DeviceTsr = DeviceOpenBLAS;

pub type Tsr<T = f64, D = IxD> = Tensor<T, DeviceTsr, D>;
pub type TsrView<'a, T = f64, D = IxD> = TensorView<'a, T, DeviceTsr, D>;

/* #endregion */

/* #region for developers */

pub(crate) use itertools::{Itertools, izip};
pub(crate) use num_complex::Complex;
pub(crate) use rayon::prelude::*;
pub(crate) use rstsr::prelude::*;
pub(crate) use tracing::{debug, info, warn};

pub(crate) use crate::*;

pub(crate) type Result<T, E = KCCSDTError> = std::result::Result<T, E>;

/* #endregion */

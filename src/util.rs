use crate::prelude::*;
use num_complex::ComplexFloat;
use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{AddAssign, Div, Mul};

/// Scalar type of amplitudes and integrals: `f64` for a real reference, `Complex<f64>` for a complex
/// one. Orbital energies and denominators are always `f64`.
pub trait KScalar:
    ComplexFloat<Real = f64>
    + AddAssign
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + Sum
    + Send
    + Sync
    + Debug
    + Display
    + 'static
{
    fn from_parts(re: f64, im: f64) -> Self;

    fn from_real(re: f64) -> Self {
        Self::from_parts(re, 0.0)
    }

    /// |x|^2, without the square root of `abs`.
    fn abs_sqr(self) -> f64;
}

impl KScalar for f64 {
    fn from_parts(re: f64, _im: f64) -> Self {
        re
    }

    fn abs_sqr(self) -> f64 {
        self * self
    }
}

impl KScalar for Complex<f64> {
    fn from_parts(re: f64, im: f64) -> Self {
        Complex::new(re, im)
    }

    fn abs_sqr(self) -> f64 {
        self.norm_sqr()
    }
}

/// Row-major tensor from a flat vector.
pub fn asarray_c<T: KScalar>(data: Vec<T>, shape: &[usize]) -> Tsr<T> {
    let device = DeviceTsr::default();
    rt::asarray((data, shape.to_vec().c(), &device))
}

/// Shape check used by the input stores.
pub fn check_shape(name: &'static str, found: &[usize], expected: &[usize]) -> Result<()> {
    if found != expected {
        return Err(KCCSDTError::ShapeMismatch { name, expected: expected.to_vec(), found: found.to_vec() });
    }
    Ok(())
}

/// Read a `.npy` file into a row-major tensor.
///
/// Both C-ordered and Fortran-ordered files are accepted; the latter are transposed into row-major
/// storage on load.
///
/// # Usage
///
/// ```norun
/// let t2: Tsr<f64> = tensor_from_npy("t2.npy")?;
/// ```
pub fn tensor_from_npy<T>(fname: &str) -> Result<Tsr<T>>
where
    T: KScalar + npyz::Deserialize,
{
    let device = DeviceTsr::default();
    let io_err = |source| KCCSDTError::Io { path: fname.to_string(), source };

    let bytes = std::fs::read(fname).map_err(io_err)?;
    let npy = npyz::NpyFile::new(&bytes[..]).map_err(io_err)?;
    let shape = npy.shape().iter().map(|&x| x as usize).collect::<Vec<usize>>();
    let order = npy.order();
    let data = npy.into_vec::<T>().map_err(io_err)?;
    debug!("Loaded {fname} with shape {shape:?} ({order:?} order)");

    let tensor = match order {
        npyz::Order::C => rt::asarray((data, shape.c(), &device)),
        npyz::Order::Fortran => rt::asarray((data, shape.f(), &device)).into_contig(RowMajor),
    };
    Ok(tensor)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kscalar_complex() {
        let z = <Complex<f64> as KScalar>::from_parts(3.0, -4.0);
        assert_eq!(z.abs_sqr(), 25.0);
        assert_eq!(z.conj(), Complex::new(3.0, 4.0));
        assert_eq!(<f64 as KScalar>::from_parts(1.5, 2.0), 1.5);
    }

    #[test]
    fn test_asarray_c_row_major() {
        let tsr = asarray_c((0..6).map(|x| x as f64).collect(), &[2, 3]);
        assert_eq!(tsr.shape(), &vec![2, 3]);
        assert_eq!(tsr[[1, 0]], 3.0);
        assert_eq!(tsr[[0, 2]], 2.0);
    }
}

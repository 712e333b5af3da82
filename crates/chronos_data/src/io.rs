//! NumPy I/O for forecasting arrays.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array2, Array3, Dimension};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::error::{DataError, Result};

/// Read a 3D array (`(N, L, F)` windows) from a `.npy` file.
///
/// `float64` files are converted to `f32`.
pub fn read_npy3<P: AsRef<Path>>(path: P) -> Result<Array3<f32>> {
    read_f32(path.as_ref())
}

/// Read a 2D array (a `(T, F)` series) from a `.npy` file.
///
/// `float64` files are converted to `f32`.
pub fn read_npy2<P: AsRef<Path>>(path: P) -> Result<Array2<f32>> {
    read_f32(path.as_ref())
}

/// Write a 3D array to a `.npy` file.
pub fn write_npy3<P: AsRef<Path>>(path: P, array: &Array3<f32>) -> Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    array
        .write_npy(writer)
        .map_err(|e| DataError::FormatError(format!("Failed to write npy file: {}", e)))
}

fn read_f32<D>(path: &Path) -> Result<ndarray::Array<f32, D>>
where
    D: Dimension,
{
    let reader = BufReader::new(File::open(path)?);
    match ndarray::Array::<f32, D>::read_npy(reader) {
        Ok(arr) => Ok(arr),
        Err(e) => {
            let reader = BufReader::new(File::open(path)?);
            let arr = ndarray::Array::<f64, D>::read_npy(reader)
                .map_err(|_| DataError::FormatError(format!("Failed to read npy file: {}", e)))?;
            Ok(arr.mapv(|v| v as f32))
        }
    }
}

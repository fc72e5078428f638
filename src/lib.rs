pub mod chromosomes;
pub mod config;
pub mod errors;
pub mod interval_index;
pub mod io;
pub mod matrix;
pub mod merge;
pub mod multiplets;
pub mod overlaps;
pub mod pipeline;
pub mod repeats;
pub mod rumulet_structs;
pub mod sorts;
pub mod stats;
pub mod stream;

#[cfg(feature = "python")]
pub mod numpy_bindings;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn rumulet(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use pyo3::wrap_pyfunction;

    m.add_function(wrap_pyfunction!(numpy_bindings::union_regions_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(numpy_bindings::overlapping_regions_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(numpy_bindings::fdr_bh_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(numpy_bindings::poisson_upper_tail_numpy, m)?)?;
    Ok(())
}

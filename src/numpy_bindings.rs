use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::interval_index::overlap_flags;
use crate::merge::union_regions;
use crate::rumulet_structs::Region;
use crate::stats::{fdr_bh, poisson_upper_tail};

fn to_regions(chrs: &[i64], starts: &[i64], ends: &[i64]) -> PyResult<Vec<Region>> {
    if chrs.len() != starts.len() || chrs.len() != ends.len() {
        return Err(PyValueError::new_err(format!(
            "chrs, starts and ends differ in length ({}, {}, {})",
            chrs.len(),
            starts.len(),
            ends.len()
        )));
    }
    Ok(chrs
        .iter()
        .zip(starts)
        .zip(ends)
        .map(|((&chr, &start), &end)| Region::new(chr, start, end))
        .collect())
}

#[pyfunction]
pub fn union_regions_numpy(
    chrs: PyReadonlyArray1<i64>,
    starts: PyReadonlyArray1<i64>,
    ends: PyReadonlyArray1<i64>,
    py: Python,
) -> PyResult<(Py<PyArray1<i64>>, Py<PyArray1<i64>>, Py<PyArray1<i64>>)> {
    let regions = to_regions(chrs.as_slice()?, starts.as_slice()?, ends.as_slice()?)?;
    let merged = union_regions(&[regions.as_slice()]);

    let out_chrs: Vec<i64> = merged.iter().map(|r| r.chr).collect();
    let out_starts: Vec<i64> = merged.iter().map(|r| r.start).collect();
    let out_ends: Vec<i64> = merged.iter().map(|r| r.end).collect();
    Ok((
        out_chrs.into_pyarray(py).to_owned().into(),
        out_starts.into_pyarray(py).to_owned().into(),
        out_ends.into_pyarray(py).to_owned().into(),
    ))
}

#[pyfunction]
pub fn overlapping_regions_numpy(
    chrs: PyReadonlyArray1<i64>,
    starts: PyReadonlyArray1<i64>,
    ends: PyReadonlyArray1<i64>,
    chrs2: PyReadonlyArray1<i64>,
    starts2: PyReadonlyArray1<i64>,
    ends2: PyReadonlyArray1<i64>,
    py: Python,
) -> PyResult<Py<PyArray1<bool>>> {
    let regions = to_regions(chrs.as_slice()?, starts.as_slice()?, ends.as_slice()?)?;
    let set = to_regions(chrs2.as_slice()?, starts2.as_slice()?, ends2.as_slice()?)?;
    let flags = overlap_flags(&regions, &set);
    Ok(flags.into_pyarray(py).to_owned().into())
}

#[pyfunction]
pub fn fdr_bh_numpy(p_values: PyReadonlyArray1<f64>, py: Python) -> PyResult<Py<PyArray1<f64>>> {
    let corrected = fdr_bh(p_values.as_slice()?);
    Ok(corrected.into_pyarray(py).to_owned().into())
}

#[pyfunction]
pub fn poisson_upper_tail_numpy(
    counts: PyReadonlyArray1<u64>,
    lambda: f64,
    py: Python,
) -> PyResult<Py<PyArray1<f64>>> {
    let tails = counts
        .as_slice()?
        .iter()
        .map(|&k| poisson_upper_tail(k, lambda))
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(tails.into_pyarray(py).to_owned().into())
}

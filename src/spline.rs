//! Tensor-product B-spline tables.
//!
//! A [`SplineTable`] stores, per axis, a spline order and a non-decreasing
//! knot vector, plus a row-major array of coefficients (last axis fastest).
//! Cross-section tables are fitted in log space, so callers evaluate at
//! `log10` coordinates and exponentiate the result themselves.
//!
//! Evaluation is split in two steps: [`SplineTable::search_centers`] locates
//! the knot interval ("center") containing the point on every axis and
//! [`SplineTable::evaluate_at_centers`] sums the local basis functions there.
//! Samplers that already validated a point reuse its centers directly.

use crate::error::{Result, XsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Leading bytes of every encoded table.
pub const SPLINE_MAGIC: [u8; 4] = *b"XSPL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplineTable {
    orders: Vec<usize>,
    knots: Vec<Vec<f64>>,
    coefficients: Vec<f64>,
    extents: Vec<[f64; 2]>,
    /// Free-form metadata, e.g. `TARGETMASS`, `INTERACTION`, `Q2MIN`.
    #[serde(default)]
    aux: BTreeMap<String, String>,
}

impl SplineTable {
    /// Build a table from per-axis orders and knots and row-major coefficients.
    ///
    /// Extents default to the full support of the knots,
    /// `[t[k], t[n - k - 1]]` for order `k` and `n` knots.
    pub fn new(orders: Vec<usize>, knots: Vec<Vec<f64>>, coefficients: Vec<f64>) -> Result<Self> {
        if orders.is_empty() || orders.len() != knots.len() {
            return Err(XsError::Configuration(format!(
                "spline needs one order per knot vector, got {} orders and {} knot vectors",
                orders.len(),
                knots.len()
            )));
        }

        let mut extents = Vec::with_capacity(orders.len());
        let mut expected_coefficients = 1usize;
        for (axis, (&order, t)) in orders.iter().zip(knots.iter()).enumerate() {
            if t.iter().any(|v| !v.is_finite()) || t.windows(2).any(|w| w[1] < w[0]) {
                return Err(XsError::Configuration(format!(
                    "knots on axis {} must be finite and non-decreasing",
                    axis
                )));
            }
            // order is untrusted when decoding, keep the arithmetic checked
            let needed = order.checked_add(1).and_then(|n| n.checked_mul(2));
            if order >= t.len() || needed.map_or(true, |n| t.len() < n) {
                return Err(XsError::Configuration(format!(
                    "axis {} has {} knots, too few for order {}",
                    axis,
                    t.len(),
                    order
                )));
            }
            let lower = t[order];
            let upper = t[t.len() - order - 1];
            if !(upper > lower) {
                return Err(XsError::Configuration(format!(
                    "axis {} has an empty domain [{}, {}]",
                    axis, lower, upper
                )));
            }
            extents.push([lower, upper]);
            expected_coefficients = expected_coefficients
                .checked_mul(t.len() - order - 1)
                .ok_or_else(|| XsError::Configuration("spline coefficient count overflows".to_string()))?;
        }

        if coefficients.len() != expected_coefficients {
            return Err(XsError::Configuration(format!(
                "spline expects {} coefficients, got {}",
                expected_coefficients,
                coefficients.len()
            )));
        }

        Ok(Self {
            orders,
            knots,
            coefficients,
            extents,
            aux: BTreeMap::new(),
        })
    }

    /// Piecewise-linear table interpolating `values` on a rectilinear grid.
    ///
    /// `values` is row-major over `axes` (last axis fastest). Each axis needs at
    /// least two strictly increasing points.
    pub fn linear_from_grid(axes: Vec<Vec<f64>>, values: Vec<f64>) -> Result<Self> {
        let mut knots = Vec::with_capacity(axes.len());
        for (axis, grid) in axes.iter().enumerate() {
            if grid.len() < 2 || grid.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(XsError::Configuration(format!(
                    "grid on axis {} needs at least two strictly increasing points",
                    axis
                )));
            }
            let mut t = Vec::with_capacity(grid.len() + 2);
            t.push(grid[0]);
            t.extend_from_slice(grid);
            t.push(grid[grid.len() - 1]);
            knots.push(t);
        }
        Self::new(vec![1; axes.len()], knots, values)
    }

    /// Restrict the declared extents. They must lie inside the knot support.
    pub fn with_extents(mut self, extents: Vec<[f64; 2]>) -> Result<Self> {
        if extents.len() != self.ndim() {
            return Err(XsError::DimensionMismatch {
                expected: self.ndim(),
                got: extents.len(),
            });
        }
        for (axis, [lo, hi]) in extents.iter().copied().enumerate() {
            let (t_lo, t_hi) = self.support(axis);
            if !(lo < hi) || lo < t_lo || hi > t_hi {
                return Err(XsError::Configuration(format!(
                    "extent [{}, {}] on axis {} outside knot support [{}, {}]",
                    lo, hi, axis, t_lo, t_hi
                )));
            }
        }
        self.extents = extents;
        Ok(self)
    }

    /// Attach a metadata key.
    pub fn with_key(mut self, key: &str, value: impl ToString) -> Self {
        self.aux.insert(key.to_string(), value.to_string());
        self
    }

    /// Read a metadata key, `None` if absent or unparsable.
    pub fn read_key<T: FromStr>(&self, key: &str) -> Option<T> {
        self.aux.get(key).and_then(|v| v.parse().ok())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.aux.keys().map(String::as_str)
    }

    pub fn ndim(&self) -> usize {
        self.orders.len()
    }

    pub fn order(&self, axis: usize) -> usize {
        self.orders[axis]
    }

    pub fn knots(&self, axis: usize) -> &[f64] {
        &self.knots[axis]
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn lower_extent(&self, axis: usize) -> f64 {
        self.extents[axis][0]
    }

    pub fn upper_extent(&self, axis: usize) -> f64 {
        self.extents[axis][1]
    }

    /// Whether `value` lies inside the declared extent of `axis`.
    #[inline]
    pub fn within_extent(&self, axis: usize, value: f64) -> bool {
        value >= self.extents[axis][0] && value <= self.extents[axis][1]
    }

    fn support(&self, axis: usize) -> (f64, f64) {
        let t = &self.knots[axis];
        let k = self.orders[axis];
        (t[k], t[t.len() - k - 1])
    }

    /// Locate the knot interval containing `point` on every axis.
    ///
    /// Returns `None` if the point has the wrong dimensionality or any
    /// coordinate is outside the knot support (NaN included).
    pub fn search_centers(&self, point: &[f64]) -> Option<Vec<usize>> {
        if point.len() != self.ndim() {
            return None;
        }
        let mut centers = Vec::with_capacity(point.len());
        for (axis, &x) in point.iter().enumerate() {
            let t = &self.knots[axis];
            let k = self.orders[axis];
            let (lo, hi) = self.support(axis);
            if !(x >= lo && x <= hi) {
                return None;
            }
            // last interval [t[c], t[c+1]) with c in [k, n-k-2] and t[c] <= x
            let max_center = t.len() - k - 2;
            let count = t[k + 1..=max_center].partition_point(|&v| v <= x);
            centers.push(k + count);
        }
        Some(centers)
    }

    /// Evaluate at a point whose centers were found by [`Self::search_centers`].
    pub fn evaluate_at_centers(&self, point: &[f64], centers: &[usize]) -> f64 {
        let ndim = self.ndim();
        let bases: Vec<Vec<f64>> = (0..ndim)
            .map(|d| basis_functions(&self.knots[d], self.orders[d], centers[d], point[d]))
            .collect();

        let mut strides = vec![1usize; ndim];
        for d in (0..ndim.saturating_sub(1)).rev() {
            let n_coeff = self.knots[d + 1].len() - self.orders[d + 1] - 1;
            strides[d] = strides[d + 1] * n_coeff;
        }

        let mut total = 0.0;
        let mut idx = vec![0usize; ndim];
        loop {
            let mut weight = 1.0;
            let mut offset = 0;
            for d in 0..ndim {
                weight *= bases[d][idx[d]];
                offset += (centers[d] - self.orders[d] + idx[d]) * strides[d];
            }
            total += weight * self.coefficients[offset];

            // odometer over the local (order + 1)^ndim block
            let mut d = ndim;
            loop {
                if d == 0 {
                    return total;
                }
                d -= 1;
                idx[d] += 1;
                if idx[d] <= self.orders[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
    }

    /// Evaluate the table, failing if the point leaves the declared extents.
    pub fn evaluate(&self, point: &[f64]) -> Result<f64> {
        if point.len() != self.ndim() {
            return Err(XsError::DimensionMismatch {
                expected: self.ndim(),
                got: point.len(),
            });
        }
        for (axis, &x) in point.iter().enumerate() {
            if !self.within_extent(axis, x) {
                return Err(XsError::OutOfDomain {
                    axis,
                    value: x,
                    lower: self.lower_extent(axis),
                    upper: self.upper_extent(axis),
                });
            }
        }
        let centers = self.search_centers(point).ok_or_else(|| XsError::OutOfDomain {
            axis: 0,
            value: point[0],
            lower: self.lower_extent(0),
            upper: self.upper_extent(0),
        })?;
        Ok(self.evaluate_at_centers(point, &centers))
    }

    /// Binary encoding: magic bytes followed by the bincode body.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = SPLINE_MAGIC.to_vec();
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    /// Decode and re-validate a table written by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SPLINE_MAGIC.len() || bytes[..SPLINE_MAGIC.len()] != SPLINE_MAGIC {
            return Err(XsError::Configuration(
                "buffer is not an encoded spline table".to_string(),
            ));
        }
        let decoded: SplineTable = bincode::deserialize(&bytes[SPLINE_MAGIC.len()..])?;
        let extents = decoded.extents.clone();
        let aux = decoded.aux.clone();
        let mut table = Self::new(decoded.orders, decoded.knots, decoded.coefficients)?
            .with_extents(extents)?;
        table.aux = aux;
        Ok(table)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), bytes = bytes.len(), "loading spline table");
        Self::from_bytes(&bytes)
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Non-zero B-spline basis values on knot interval `span` (Cox-de Boor).
///
/// Entry `r` belongs to basis function `span - order + r`.
fn basis_functions(knots: &[f64], order: usize, span: usize, x: f64) -> Vec<f64> {
    let mut n = vec![0.0; order + 1];
    let mut left = vec![0.0; order + 1];
    let mut right = vec![0.0; order + 1];
    n[0] = 1.0;
    for j in 1..=order {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { n[r] / denom } else { 0.0 };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

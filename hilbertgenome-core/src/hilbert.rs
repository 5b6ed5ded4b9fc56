//! Conversion between distances along a Hilbert curve and grid coordinates.
//!
//! An order-`n` curve visits every cell of an `n x n` grid exactly once, and
//! cells with close distances are close in the grid. `n` must be a power of
//! two.
use crate::error::{HilbertError, Result};

/// Check that `n` is a valid curve dimension and return the number of cells.
pub fn check_dimension(n: u64) -> Result<u64> {
    if n < 2 || !n.is_power_of_two() {
        return Err(HilbertError::InvalidDimension(n));
    }
    n.checked_mul(n).ok_or(HilbertError::InvalidDimension(n))
}

/// Rotate or reflect a quadrant of size `s`.
///
/// `rx` and `ry` select the quadrant and must be 0 or 1, and `x` and `y` must
/// lie inside the quadrant, i.e. be smaller than `s`. The transformed pair is
/// returned; nothing is modified in place.
///
/// # Panics
///
/// Panics if `x` or `y` is not smaller than `s`.
#[inline]
pub fn rotate(s: u64, x: u64, y: u64, rx: u64, ry: u64) -> (u64, u64) {
    assert!(
        x < s && y < s,
        "({}, {}) lies outside a quadrant of size {}",
        x,
        y,
        s
    );
    if ry == 0 {
        let (x, y) = if rx == 1 {
            (s - 1 - x, s - 1 - y)
        } else {
            (x, y)
        };
        (y, x)
    } else {
        (x, y)
    }
}

/// Convert a distance `d` along the curve to `(x, y)` coordinates.
///
/// # Arguments
///
/// * `n` - The dimension of the grid, a power of two.
/// * `d` - The distance along the curve, in `[0, n * n)`.
pub fn distance_to_coord(n: u64, d: u64) -> Result<(u64, u64)> {
    let cells = check_dimension(n)?;
    if d >= cells {
        return Err(HilbertError::DistanceOutOfRange { n, d });
    }
    Ok(d2xy(n, d))
}

/// Convert `(x, y)` coordinates to their distance along the curve.
pub fn coord_to_distance(n: u64, x: u64, y: u64) -> Result<u64> {
    check_dimension(n)?;
    if x >= n || y >= n {
        return Err(HilbertError::CoordOutOfRange { n, x, y });
    }
    Ok(xy2d(n, x, y))
}

// Unchecked version; callers must validate `n` and `d`.
#[inline]
pub(crate) fn d2xy(n: u64, d: u64) -> (u64, u64) {
    let mut x = 0;
    let mut y = 0;
    let mut t = d;
    let mut s = 1;
    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        (x, y) = rotate(s, x, y, rx, ry);
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    (x, y)
}

#[inline]
fn xy2d(n: u64, mut x: u64, mut y: u64) -> u64 {
    let mut d = 0;
    let mut s = n / 2;
    while s > 0 {
        let rx = u64::from((x & s) > 0);
        let ry = u64::from((y & s) > 0);
        d += s * s * ((3 * rx) ^ ry);
        // Only the bits below `s` matter from here on.
        x &= s - 1;
        y &= s - 1;
        (x, y) = rotate(s, x, y, rx, ry);
        s /= 2;
    }
    d
}

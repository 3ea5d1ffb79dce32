// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Numeric sanitiser (spec §4.A): JSON has no representation for NaN or
//! infinities, so every emitted value is mapped through this function first.

/// Returns `Some(v)` if `v` is finite, otherwise `None` (emitted as JSON
/// `null`).
pub fn sanitize(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_values_pass_through() {
        assert_eq!(sanitize(2.0), Some(2.0));
        assert_eq!(sanitize(-1.5), Some(-1.5));
        assert_eq!(sanitize(0.0), Some(0.0));
    }

    #[test]
    fn non_finite_values_become_none() {
        assert_eq!(sanitize(f64::NAN), None);
        assert_eq!(sanitize(f64::INFINITY), None);
        assert_eq!(sanitize(f64::NEG_INFINITY), None);
    }
}

//! Degree-2 polynomial feature expansion.
//!
//! Produces every monomial of total degree <= 2 over the input vector, with
//! no bias column: the inputs themselves first, then x_i * x_j for i <= j in
//! row-major order. The term layout is fixed at fit time and frozen into the
//! trained artifact.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialExpansion {
    n_inputs: usize,
}

impl PolynomialExpansion {
    pub fn fit(n_inputs: usize) -> Self {
        Self { n_inputs }
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    /// Number of output terms: n linear + n(n+1)/2 quadratic.
    pub fn n_terms(&self) -> usize {
        self.n_inputs + self.n_inputs * (self.n_inputs + 1) / 2
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>, CoreError> {
        if x.len() != self.n_inputs {
            return Err(CoreError::invalid_input(
                "features",
                format!("expected {} values, got {}", self.n_inputs, x.len()),
            ));
        }

        let mut out = Vec::with_capacity(self.n_terms());
        out.extend_from_slice(x);
        for i in 0..self.n_inputs {
            for j in i..self.n_inputs {
                out.push(x[i] * x[j]);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn term_count_matches_closed_form() {
        let poly = PolynomialExpansion::fit(12);
        assert_eq!(poly.n_terms(), 90);
        let expanded = poly.transform(&[1.0; 12]).expect("transform");
        assert_eq!(expanded.len(), 90);
    }

    #[test]
    fn layout_is_linear_terms_then_ordered_products() {
        let poly = PolynomialExpansion::fit(3);
        let expanded = poly.transform(&[2.0, 3.0, 5.0]).expect("transform");
        assert_eq!(
            expanded,
            vec![2.0, 3.0, 5.0, 4.0, 6.0, 10.0, 9.0, 15.0, 25.0]
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let poly = PolynomialExpansion::fit(3);
        let err = poly.transform(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }
}

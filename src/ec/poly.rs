use crate::ec::galois::GaloisField;

/// Immutable polynomial over a Galois field. Coefficients are stored highest
/// power first; leading zeros are stripped except for the zero polynomial.
#[derive(Clone)]
pub struct GfPoly {
    field: &'static GaloisField,
    coefficients: Vec<i32>,
}

impl GfPoly {
    /// Build from highest-power-first coefficients, stripping leading zeros
    pub fn new(field: &'static GaloisField, coefficients: Vec<i32>) -> Self {
        debug_assert!(!coefficients.is_empty());
        let first_nonzero = coefficients.iter().position(|&c| c != 0);
        let coefficients = match first_nonzero {
            Some(0) => coefficients,
            Some(i) => coefficients[i..].to_vec(),
            None => vec![0],
        };
        Self {
            field,
            coefficients,
        }
    }

    /// Coefficients, highest power first
    pub fn coefficients(&self) -> &[i32] {
        &self.coefficients
    }

    /// Degree of the polynomial
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Whether this is the constant zero polynomial
    pub fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    /// Coefficient of the x^degree term
    pub fn coefficient(&self, degree: usize) -> i32 {
        self.coefficients[self.coefficients.len() - 1 - degree]
    }

    /// Evaluate at `a` using Horner's scheme
    pub fn evaluate_at(&self, a: i32) -> i32 {
        if a == 0 {
            return self.coefficient(0);
        }
        if a == 1 {
            // Just the sum of the coefficients
            return self.coefficients.iter().fold(0, |acc, &c| acc ^ c);
        }
        let mut result = self.coefficients[0];
        for &coefficient in &self.coefficients[1..] {
            result = self.field.multiply(a, result) ^ coefficient;
        }
        result
    }

    /// Sum (identical to difference) of two polynomials
    pub fn add_or_subtract(&self, other: &GfPoly) -> GfPoly {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }

        let (smaller, larger) = if self.coefficients.len() <= other.coefficients.len() {
            (&self.coefficients, &other.coefficients)
        } else {
            (&other.coefficients, &self.coefficients)
        };
        let length_diff = larger.len() - smaller.len();
        let mut sum = larger[..length_diff].to_vec();
        for (i, &coefficient) in smaller.iter().enumerate() {
            sum.push(coefficient ^ larger[length_diff + i]);
        }
        GfPoly::new(self.field, sum)
    }

    /// Product of two polynomials (convolution of coefficients)
    pub fn multiply(&self, other: &GfPoly) -> GfPoly {
        if self.is_zero() || other.is_zero() {
            return self.field.zero();
        }
        let a = &self.coefficients;
        let b = &other.coefficients;
        let mut product = vec![0i32; a.len() + b.len() - 1];
        for (i, &a_coeff) in a.iter().enumerate() {
            for (j, &b_coeff) in b.iter().enumerate() {
                product[i + j] ^= self.field.multiply(a_coeff, b_coeff);
            }
        }
        GfPoly::new(self.field, product)
    }

    /// Product with a field element
    pub fn multiply_scalar(&self, scalar: i32) -> GfPoly {
        if scalar == 0 {
            return self.field.zero();
        }
        if scalar == 1 {
            return self.clone();
        }
        let product = self
            .coefficients
            .iter()
            .map(|&c| self.field.multiply(c, scalar))
            .collect();
        GfPoly::new(self.field, product)
    }

    /// Product with coefficient * x^degree
    pub fn multiply_by_monomial(&self, degree: usize, coefficient: i32) -> GfPoly {
        if coefficient == 0 {
            return self.field.zero();
        }
        let mut product = vec![0i32; self.coefficients.len() + degree];
        for (i, &c) in self.coefficients.iter().enumerate() {
            product[i] = self.field.multiply(c, coefficient);
        }
        GfPoly::new(self.field, product)
    }

    /// Polynomial division, returning (quotient, remainder). The divisor must
    /// not be the zero polynomial.
    pub fn divide(&self, other: &GfPoly) -> (GfPoly, GfPoly) {
        debug_assert!(!other.is_zero());
        let mut quotient = self.field.zero();
        let mut remainder = self.clone();

        let denominator_leading_term = other.coefficient(other.degree());
        let inverse_denominator = self
            .field
            .inverse(denominator_leading_term)
            .expect("nonzero leading term");

        while remainder.degree() >= other.degree() && !remainder.is_zero() {
            let degree_difference = remainder.degree() - other.degree();
            let scale = self
                .field
                .multiply(remainder.coefficient(remainder.degree()), inverse_denominator);
            let term = other.multiply_by_monomial(degree_difference, scale);
            let iteration_quotient = self.field.build_monomial(degree_difference, scale);
            quotient = quotient.add_or_subtract(&iteration_quotient);
            remainder = remainder.add_or_subtract(&term);
        }

        (quotient, remainder)
    }
}

impl std::fmt::Debug for GfPoly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GfPoly{:?}", self.coefficients)
    }
}

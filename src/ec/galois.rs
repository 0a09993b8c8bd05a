use std::sync::OnceLock;

use crate::ec::poly::GfPoly;
use crate::error::Error;

/// Finite field GF(2^m) described by a primitive irreducible polynomial.
///
/// Addition is XOR; multiplication goes through precomputed log/exp tables of
/// the generator alpha = 2. The generator base shifts which powers of alpha
/// the Reed-Solomon code uses as roots (0 for QR codes, 1 for most others).
pub struct GaloisField {
    exp_table: Vec<i32>,
    log_table: Vec<i32>,
    size: usize,
    primitive: u32,
    generator_base: i32,
}

impl GaloisField {
    fn new(primitive: u32, size: usize, generator_base: i32) -> Self {
        let mut exp_table = vec![0i32; size];
        let mut log_table = vec![0i32; size];
        let mut x: i32 = 1;
        for entry in exp_table.iter_mut() {
            *entry = x;
            x *= 2;
            if x as usize >= size {
                x ^= primitive as i32;
                x &= size as i32 - 1;
            }
        }
        for i in 0..size - 1 {
            log_table[exp_table[i] as usize] = i as i32;
        }
        // log_table[0] stays meaningless; log(0) is undefined
        Self {
            exp_table,
            log_table,
            size,
            primitive,
            generator_base,
        }
    }

    /// Number of field elements, 2^m
    pub fn size(&self) -> usize {
        self.size
    }

    /// The primitive polynomial, coefficient bits with the constant term lowest
    pub fn primitive(&self) -> u32 {
        self.primitive
    }

    /// First power of alpha used as a Reed-Solomon root
    pub fn generator_base(&self) -> i32 {
        self.generator_base
    }

    /// alpha^a
    pub fn exp(&self, a: usize) -> i32 {
        self.exp_table[a]
    }

    /// Discrete logarithm; `a` must be nonzero
    pub fn log(&self, a: i32) -> Result<i32, Error> {
        if a == 0 {
            return Err(Error::IllegalArgument("log(0) is undefined"));
        }
        Ok(self.log_table[a as usize])
    }

    /// Multiplicative inverse; `a` must be nonzero
    pub fn inverse(&self, a: i32) -> Result<i32, Error> {
        if a == 0 {
            return Err(Error::IllegalArgument("0 has no inverse"));
        }
        Ok(self.exp_table[self.size - 1 - self.log_table[a as usize] as usize])
    }

    /// Product of two field elements
    pub fn multiply(&self, a: i32, b: i32) -> i32 {
        if a == 0 || b == 0 {
            return 0;
        }
        let log_sum = (self.log_table[a as usize] + self.log_table[b as usize]) as usize;
        self.exp_table[log_sum % (self.size - 1)]
    }

    /// The constant zero polynomial over this field
    pub fn zero(&'static self) -> GfPoly {
        GfPoly::new(self, vec![0])
    }

    /// The constant one polynomial over this field
    pub fn one(&'static self) -> GfPoly {
        GfPoly::new(self, vec![1])
    }

    /// coefficient * x^degree
    pub fn build_monomial(&'static self, degree: usize, coefficient: i32) -> GfPoly {
        if coefficient == 0 {
            return self.zero();
        }
        let mut coefficients = vec![0i32; degree + 1];
        coefficients[0] = coefficient;
        GfPoly::new(self, coefficients)
    }
}

macro_rules! field_instance {
    ($(#[$attr:meta])* $fn_name:ident, $primitive:expr, $size:expr, $base:expr) => {
        $(#[$attr])*
        pub fn $fn_name() -> &'static GaloisField {
            static FIELD: OnceLock<GaloisField> = OnceLock::new();
            FIELD.get_or_init(|| GaloisField::new($primitive, $size, $base))
        }
    };
}

field_instance!(
    /// QR code field: x^8 + x^4 + x^3 + x^2 + 1, generator base 0
    qr_code_field_256, 0x011D, 256, 0
);
field_instance!(
    /// Data Matrix field: x^8 + x^5 + x^3 + x^2 + 1, generator base 1
    data_matrix_field_256, 0x012D, 256, 1
);
field_instance!(
    /// Aztec 12-bit data field: x^12 + x^6 + x^5 + x^3 + 1
    aztec_data_12, 0x1069, 4096, 1
);
field_instance!(
    /// Aztec 10-bit data field: x^10 + x^3 + 1
    aztec_data_10, 0x409, 1024, 1
);
field_instance!(
    /// Aztec 6-bit data field: x^6 + x + 1
    aztec_data_6, 0x43, 64, 1
);
field_instance!(
    /// Aztec parameter field: x^4 + x + 1
    aztec_param, 0x13, 16, 1
);

/// Aztec 8-bit data shares the Data Matrix field
pub fn aztec_data_8() -> &'static GaloisField {
    data_matrix_field_256()
}

/// Maxicode shares the 6-bit Aztec field
pub fn maxicode_field_64() -> &'static GaloisField {
    aztec_data_6()
}

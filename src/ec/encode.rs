use crate::ec::galois::GaloisField;
use crate::ec::poly::GfPoly;
use crate::error::Error;

/// Reed-Solomon encoder. Generator polynomials are grown on demand and
/// cached, so one encoder instance amortizes work across blocks.
pub struct ReedSolomonEncoder {
    field: &'static GaloisField,
    cached_generators: Vec<GfPoly>,
}

impl ReedSolomonEncoder {
    /// Encoder over the given field
    pub fn new(field: &'static GaloisField) -> Self {
        Self {
            field,
            cached_generators: vec![field.one()],
        }
    }

    /// g_0 = 1, g_k = g_{k-1} * (x - alpha^(k - 1 + base))
    fn build_generator(&mut self, degree: usize) -> &GfPoly {
        if degree >= self.cached_generators.len() {
            for d in self.cached_generators.len()..=degree {
                let last = &self.cached_generators[d - 1];
                let root_exp = d - 1 + self.field.generator_base() as usize;
                let next = last.multiply(&GfPoly::new(
                    self.field,
                    vec![1, self.field.exp(root_exp % (self.field.size() - 1))],
                ));
                self.cached_generators.push(next);
            }
        }
        &self.cached_generators[degree]
    }

    /// Replace the trailing `ec_count` entries of `to_encode` with the error
    /// correction codewords for the leading data entries.
    pub fn encode(&mut self, to_encode: &mut [i32], ec_count: usize) -> Result<(), Error> {
        if ec_count == 0 {
            return Err(Error::IllegalArgument("no error correction bytes"));
        }
        if to_encode.len() <= ec_count {
            return Err(Error::IllegalArgument("no data bytes provided"));
        }
        let data_len = to_encode.len() - ec_count;
        let generator = self.build_generator(ec_count).clone();

        let info = GfPoly::new(self.field, to_encode[..data_len].to_vec());
        let shifted = info.multiply_by_monomial(ec_count, 1);
        let (_, remainder) = shifted.divide(&generator);

        let coefficients = remainder.coefficients();
        let num_zero = ec_count - coefficients.len();
        for slot in to_encode[data_len..data_len + num_zero].iter_mut() {
            *slot = 0;
        }
        to_encode[data_len + num_zero..].copy_from_slice(coefficients);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::galois::qr_code_field_256;

    #[test]
    fn test_reference_vector() {
        // JISX0510:2004 Appendix I: 16 data codewords, 10 EC codewords
        let data = [
            0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11,
            0xEC, 0x11,
        ];
        let mut codewords = [0i32; 26];
        for (i, &b) in data.iter().enumerate() {
            codewords[i] = b;
        }
        let mut encoder = ReedSolomonEncoder::new(qr_code_field_256());
        encoder.encode(&mut codewords, 10).unwrap();
        let expected = [0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55];
        assert_eq!(&codewords[16..], &expected.map(|b| b as i32));
    }

    #[test]
    fn test_rejects_degenerate_sizes() {
        let mut encoder = ReedSolomonEncoder::new(qr_code_field_256());
        let mut buf = [0i32; 5];
        assert!(encoder.encode(&mut buf, 0).is_err());
        assert!(encoder.encode(&mut buf, 5).is_err());
    }

    #[test]
    fn test_generator_cache_reuse() {
        let mut encoder = ReedSolomonEncoder::new(qr_code_field_256());
        let mut a = [1i32, 2, 3, 0, 0, 0, 0];
        let mut b = [1i32, 2, 3, 0, 0, 0, 0];
        encoder.encode(&mut a, 4).unwrap();
        encoder.encode(&mut b, 4).unwrap();
        assert_eq!(a, b);
    }
}

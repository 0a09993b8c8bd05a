use crate::detector::transform::PerspectiveTransform;
use crate::error::Error;
use crate::models::BitMatrix;

/// Samples an image grid through a perspective transform. The sampler is an
/// explicit dependency of the detector so tests and platforms can substitute
/// their own; [`DefaultGridSampler`] is the standard choice.
pub trait GridSampler {
    /// Sample `dim_x` by `dim_y` module centers out of `image`
    fn sample_grid(
        &self,
        image: &BitMatrix,
        dim_x: usize,
        dim_y: usize,
        transform: &PerspectiveTransform,
    ) -> Result<BitMatrix, Error>;
}

/// Nearest-pixel sampler with a one-pixel edge nudge
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGridSampler;

impl GridSampler for DefaultGridSampler {
    fn sample_grid(
        &self,
        image: &BitMatrix,
        dim_x: usize,
        dim_y: usize,
        transform: &PerspectiveTransform,
    ) -> Result<BitMatrix, Error> {
        if dim_x == 0 || dim_y == 0 {
            return Err(Error::NotFound);
        }
        let mut bits = BitMatrix::new(dim_x, dim_y);
        let mut points = vec![0f32; 2 * dim_x];
        for y in 0..dim_y {
            let value = y as f32 + 0.5;
            for x in 0..dim_x {
                points[2 * x] = x as f32 + 0.5;
                points[2 * x + 1] = value;
            }
            transform.transform_points(&mut points);
            check_and_nudge_points(image, &mut points)?;

            for x in 0..dim_x {
                let px = points[2 * x] as isize;
                let py = points[2 * x + 1] as isize;
                if px < 0
                    || py < 0
                    || px as usize >= image.width()
                    || py as usize >= image.height()
                {
                    // A transform wild enough to land mid-row outside the
                    // image means the detection was bogus
                    return Err(Error::NotFound);
                }
                if image.get(px as usize, py as usize) {
                    bits.set(x, y);
                }
            }
        }
        Ok(bits)
    }
}

/// Move endpoints that fall just off the image back on; anything further off
/// than one pixel is a failed detection.
fn check_and_nudge_points(image: &BitMatrix, points: &mut [f32]) -> Result<(), Error> {
    let width = image.width() as isize;
    let height = image.height() as isize;

    // Nudge from the start of the row until points are in bounds
    let mut nudged = true;
    let max_offset = points.len().saturating_sub(1);
    let mut offset = 0;
    while offset < max_offset && nudged {
        let x = points[offset] as isize;
        let y = points[offset + 1] as isize;
        if x < -1 || x > width || y < -1 || y > height {
            return Err(Error::NotFound);
        }
        nudged = false;
        if x == -1 {
            points[offset] = 0.0;
            nudged = true;
        } else if x == width {
            points[offset] = width as f32 - 1.0;
            nudged = true;
        }
        if y == -1 {
            points[offset + 1] = 0.0;
            nudged = true;
        } else if y == height {
            points[offset + 1] = height as f32 - 1.0;
            nudged = true;
        }
        offset += 2;
    }

    // And the same from the end
    nudged = true;
    let mut offset = points.len() as isize - 2;
    while offset >= 0 && nudged {
        let i = offset as usize;
        let x = points[i] as isize;
        let y = points[i + 1] as isize;
        if x < -1 || x > width || y < -1 || y > height {
            return Err(Error::NotFound);
        }
        nudged = false;
        if x == -1 {
            points[i] = 0.0;
            nudged = true;
        } else if x == width {
            points[i] = width as f32 - 1.0;
            nudged = true;
        }
        if y == -1 {
            points[i + 1] = 0.0;
            nudged = true;
        } else if y == height {
            points[i + 1] = height as f32 - 1.0;
            nudged = true;
        }
        offset -= 2;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_sampling_is_bit_exact() {
        let mut image = BitMatrix::square(21);
        for y in 0..21 {
            for x in 0..21 {
                if (x * 31 + y * 17) % 3 == 0 {
                    image.set(x, y);
                }
            }
        }
        let transform = PerspectiveTransform::quadrilateral_to_quadrilateral(
            0.0, 0.0, 21.0, 0.0, 21.0, 21.0, 0.0, 21.0, 0.0, 0.0, 21.0, 0.0, 21.0, 21.0, 0.0,
            21.0,
        );
        let sampled = DefaultGridSampler
            .sample_grid(&image, 21, 21, &transform)
            .unwrap();
        assert_eq!(sampled, image);
    }

    #[test]
    fn test_wild_transform_is_not_found() {
        let image = BitMatrix::square(21);
        // Maps the grid far outside the image
        let transform = PerspectiveTransform::quadrilateral_to_quadrilateral(
            0.0, 0.0, 21.0, 0.0, 21.0, 21.0, 0.0, 21.0, 100.0, 100.0, 200.0, 100.0, 200.0, 200.0,
            100.0, 200.0,
        );
        let result = DefaultGridSampler.sample_grid(&image, 21, 21, &transform);
        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[test]
    fn test_edge_points_are_nudged() {
        let mut image = BitMatrix::square(8);
        image.set(0, 0);
        // Identity over the full image: edge samples at 8.0 would be out of
        // bounds without the nudge
        let transform = PerspectiveTransform::quadrilateral_to_quadrilateral(
            0.0, 0.0, 8.0, 0.0, 8.0, 8.0, 0.0, 8.0, 0.0, 0.0, 8.0, 0.0, 8.0, 8.0, 0.0, 8.0,
        );
        let sampled = DefaultGridSampler.sample_grid(&image, 8, 8, &transform);
        assert!(sampled.is_ok());
    }
}

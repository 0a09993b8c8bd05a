//! Greyscale image access for the binarizers
//!
//! A [`LuminanceSource`] hands out 8-bit luminance data (0 = black,
//! 255 = white) either one row at a time into a caller-provided buffer, or as
//! a whole row-major matrix. Cropping and 90-degree rotation produce new
//! immutable views over the same pixels.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::Error;

/// Abstract provider of greyscale rows for binarization
pub trait LuminanceSource {
    /// Image width in pixels
    fn width(&self) -> usize;

    /// Image height in pixels
    fn height(&self) -> usize;

    /// Fill `buf` with the `width` luminance values of row `y`, reusing the
    /// buffer's allocation when it is large enough.
    fn row(&self, y: usize, buf: &mut Vec<u8>);

    /// The whole image, row-major
    fn matrix(&self) -> Cow<'_, [u8]>;

    /// Whether this source can produce cropped views
    fn is_crop_supported(&self) -> bool {
        false
    }

    /// Whether this source can produce rotated views
    fn is_rotate_supported(&self) -> bool {
        false
    }
}

/// Owned 8-bit greyscale image. Crops are views sharing the pixel buffer;
/// rotation materializes a new buffer.
#[derive(Debug, Clone)]
pub struct Luma8Source {
    data: Arc<[u8]>,
    data_width: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
}

impl Luma8Source {
    /// Wrap a row-major greyscale buffer
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Result<Self, Error> {
        if data.len() < width * height {
            return Err(Error::IllegalArgument("buffer smaller than width * height"));
        }
        Ok(Self {
            data: data.into(),
            data_width: width,
            left: 0,
            top: 0,
            width,
            height,
        })
    }

    /// A view restricted to the given rectangle
    pub fn crop(&self, left: usize, top: usize, width: usize, height: usize) -> Result<Self, Error> {
        if left + width > self.width || top + height > self.height {
            return Err(Error::IllegalArgument("crop rectangle does not fit in image"));
        }
        Ok(Self {
            data: Arc::clone(&self.data),
            data_width: self.data_width,
            left: self.left + left,
            top: self.top + top,
            width,
            height,
        })
    }

    /// A new source rotated 90 degrees counterclockwise
    pub fn rotate_ccw(&self) -> Self {
        let new_width = self.height;
        let new_height = self.width;
        let mut rotated = vec![0u8; new_width * new_height];
        for y in 0..new_height {
            for x in 0..new_width {
                // Output (x, y) takes input (width - 1 - y, x)
                let src_x = self.left + (self.width - 1 - y);
                let src_y = self.top + x;
                rotated[y * new_width + x] = self.data[src_y * self.data_width + src_x];
            }
        }
        Self {
            data: rotated.into(),
            data_width: new_width,
            left: 0,
            top: 0,
            width: new_width,
            height: new_height,
        }
    }
}

impl LuminanceSource for Luma8Source {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn row(&self, y: usize, buf: &mut Vec<u8>) {
        let offset = (self.top + y) * self.data_width + self.left;
        buf.clear();
        buf.extend_from_slice(&self.data[offset..offset + self.width]);
    }

    fn matrix(&self) -> Cow<'_, [u8]> {
        if self.left == 0 && self.top == 0 && self.width == self.data_width {
            return Cow::Borrowed(&self.data[..self.width * self.height]);
        }
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            let offset = (self.top + y) * self.data_width + self.left;
            out.extend_from_slice(&self.data[offset..offset + self.width]);
        }
        Cow::Owned(out)
    }

    fn is_crop_supported(&self) -> bool {
        true
    }

    fn is_rotate_supported(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_and_matrix() {
        let data = vec![10, 20, 30, 40, 50, 60];
        let source = Luma8Source::new(data, 3, 2).unwrap();
        let mut buf = Vec::new();
        source.row(1, &mut buf);
        assert_eq!(buf, vec![40, 50, 60]);
        assert_eq!(source.matrix().as_ref(), &[10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_crop_view() {
        let data = (0..16).collect::<Vec<u8>>();
        let source = Luma8Source::new(data, 4, 4).unwrap();
        let cropped = source.crop(1, 1, 2, 2).unwrap();
        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.matrix().as_ref(), &[5, 6, 9, 10]);
        assert!(source.crop(3, 3, 2, 2).is_err());
    }

    #[test]
    fn test_rotate_ccw() {
        // 2x3 image:
        //   1 2
        //   3 4
        //   5 6
        let source = Luma8Source::new(vec![1, 2, 3, 4, 5, 6], 2, 3).unwrap();
        let rotated = source.rotate_ccw();
        assert_eq!(rotated.width(), 3);
        assert_eq!(rotated.height(), 2);
        // CCW: the right column becomes the top row
        assert_eq!(rotated.matrix().as_ref(), &[2, 4, 6, 1, 3, 5]);
    }

    #[test]
    fn test_undersized_buffer_rejected() {
        assert!(Luma8Source::new(vec![0; 5], 3, 2).is_err());
    }
}

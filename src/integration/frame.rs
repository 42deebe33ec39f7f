//! Pixel buffers flowing through the pipeline.

use image::{ImageBuffer, Rgb, RgbImage, imageops};
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::tracker::Size;

/// Interleaved channel order of a 3-channel, 8-bit frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// A single 8-bit, 3-channel video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position of the frame in its stream, starting at 0
    pub index: u64,
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(
        index: u64,
        width: u32,
        height: u32,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            index,
            width,
            height,
            order,
            data,
        })
    }

    /// A frame filled with one color, given in RGB.
    pub fn filled(index: u64, size: Size, order: ChannelOrder, rgb: [u8; 3]) -> Result<Self, FrameError> {
        let pixel = order.pixel_from_rgb(rgb);
        let data = pixel.repeat(size.width as usize * size.height as usize);
        Self::new(index, size.width, size.height, order, data)
    }

    pub fn from_rgb_image(index: u64, image: RgbImage) -> Result<Self, FrameError> {
        let (width, height) = image.dimensions();
        Self::new(index, width, height, ChannelOrder::Rgb, image.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at (x, y) in the frame's own channel order.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Reinterpret the buffer as an image without touching channel order.
    pub(crate) fn to_buffer(&self) -> Result<ImageBuffer<Rgb<u8>, Vec<u8>>, FrameError> {
        ImageBuffer::from_raw(self.width, self.height, self.data.clone()).ok_or(FrameError::BufferSize {
            expected: self.width as usize * self.height as usize * 3,
            actual: self.data.len(),
        })
    }

    /// Convert to an RGB image, swapping channels if needed.
    pub fn to_rgb_image(&self) -> Result<RgbImage, FrameError> {
        self.clone().with_order(ChannelOrder::Rgb).to_buffer()
    }

    /// Convert the buffer to another channel order.
    pub fn with_order(mut self, order: ChannelOrder) -> Self {
        if self.order != order {
            for px in self.data.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            self.order = order;
        }
        self
    }

    /// Resize to `size` with bilinear filtering. Channel order is kept.
    pub fn resize(&self, size: Size) -> Result<Self, FrameError> {
        if size.is_empty() {
            return Err(FrameError::Empty);
        }
        if size == self.size() {
            return Ok(self.clone());
        }
        let resized = imageops::resize(&self.to_buffer()?, size.width, size.height, imageops::FilterType::Triangle);
        Self::new(self.index, size.width, size.height, self.order, resized.into_raw())
    }

    /// Produce the detector input: resized to `size` and converted to `order`.
    ///
    /// Deterministic; `self` is left untouched.
    pub fn preprocess(&self, size: Size, order: ChannelOrder) -> Result<Self, FrameError> {
        Ok(self.resize(size)?.with_order(order))
    }
}

impl ChannelOrder {
    /// Lay out an RGB triple in this order.
    pub fn pixel_from_rgb(self, rgb: [u8; 3]) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => rgb,
            ChannelOrder::Bgr => [rgb[2], rgb[1], rgb[0]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_bad_buffers() {
        assert_eq!(
            Frame::new(0, 2, 2, ChannelOrder::Rgb, vec![0; 11]),
            Err(FrameError::BufferSize {
                expected: 12,
                actual: 11
            })
        );
        assert_eq!(Frame::new(0, 0, 2, ChannelOrder::Rgb, vec![]), Err(FrameError::Empty));
    }

    #[test]
    fn test_preprocess_resizes_and_swaps() {
        let frame = Frame::filled(3, Size::new(64, 48), ChannelOrder::Bgr, [200, 100, 10]).unwrap();
        assert_eq!(frame.pixel(0, 0), Some([10, 100, 200]));

        let input = frame.preprocess(Size::new(30, 30), ChannelOrder::Rgb).unwrap();
        assert_eq!(input.size(), Size::new(30, 30));
        assert_eq!(input.order(), ChannelOrder::Rgb);
        assert_eq!(input.index, 3);
        assert_eq!(input.pixel(15, 15), Some([200, 100, 10]));

        // source is untouched
        assert_eq!(frame.size(), Size::new(64, 48));
        assert_eq!(frame.order(), ChannelOrder::Bgr);
    }

    #[test]
    fn test_preprocess_same_size_same_order() {
        let frame = Frame::filled(0, Size::new(8, 8), ChannelOrder::Rgb, [1, 2, 3]).unwrap();
        assert_eq!(frame.preprocess(Size::new(8, 8), ChannelOrder::Rgb).unwrap(), frame);
    }

    #[test]
    fn test_to_rgb_image() {
        let frame = Frame::filled(0, Size::new(4, 2), ChannelOrder::Bgr, [9, 8, 7]).unwrap();
        let image = frame.to_rgb_image().unwrap();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(3, 1).0, [9, 8, 7]);
    }
}

//! Draw track boxes onto frames.

use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;

use crate::error::FrameError;
use crate::integration::Frame;
use crate::tracker::Rect;

pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const RED: [u8; 3] = [255, 0, 0];

/// Outline each box with a 2px border. `color` is RGB regardless of the
/// frame's channel order. Boxes are clipped to the frame; empty ones are
/// skipped.
pub fn draw_boxes(frame: Frame, boxes: &[Rect], color: [u8; 3]) -> Result<Frame, FrameError> {
    let size = frame.size();
    let pixel = Rgb(frame.order().pixel_from_rgb(color));
    let mut canvas = frame.to_buffer()?;

    for bbox in boxes {
        let clipped = bbox.clip_to_frame(size);
        let [x1, y1, x2, y2] = clipped.to_tlbr();
        let (x1, y1) = (x1.round() as i32, y1.round() as i32);
        let (x2, y2) = (x2.round() as i32, y2.round() as i32);

        for inset in 0..2 {
            let width = x2 - x1 - 2 * inset;
            let height = y2 - y1 - 2 * inset;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = imageproc::rect::Rect::at(x1 + inset, y1 + inset).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(&mut canvas, rect, pixel);
        }
    }

    Frame::new(frame.index, size.width, size.height, frame.order(), canvas.into_raw())
}

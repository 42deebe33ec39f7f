//! Trait for object detection inference backends.

use crate::integration::Frame;
use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the pipeline.
///
/// # Example
///
/// ```ignore
/// use iou_track::{DetectionSource, Detection, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, image: &Frame) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures. Surfaces as a device error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on a preprocessed image and return detections.
    ///
    /// # Arguments
    /// * `image` - Frame already resized to the detector input size and in
    ///   the detector's channel order
    ///
    /// # Returns
    /// Detections in the coordinate space of `image`, in any order, possibly
    /// empty.
    fn detect(&mut self, image: &Frame) -> Result<Vec<Detection>, Self::Error>;
}

impl<T: DetectionSource + ?Sized> DetectionSource for Box<T> {
    type Error = T::Error;

    fn detect(&mut self, image: &Frame) -> Result<Vec<Detection>, Self::Error> {
        (**self).detect(image)
    }
}

/// Helper trait for converting model-specific outputs to `Detection`.
///
/// Implement this for your model's output format to enable easy conversion.
pub trait IntoDetections {
    /// Convert the output into a vector of detections.
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

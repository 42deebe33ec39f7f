//! Burn inference backend for object detection.
//!
//! This module provides a `BurnDetector` that implements `DetectionSource`
//! for running object detection models built with the Burn framework.
//!
//! # Example
//!
//! ```ignore
//! use iou_track::integration::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
//! use burn::backend::NdArray;
//!
//! // Implement BurnModel for your detection model
//! struct MySsdModel { /* ... */ }
//!
//! impl BurnModel<NdArray> for MySsdModel {
//!     fn forward(
//!         &self,
//!         input: burn::tensor::Tensor<NdArray, 4>,
//!     ) -> Result<Vec<RawDetection>, BurnDetectorError> {
//!         // Run inference
//!     }
//! }
//!
//! let model = MySsdModel::load("model.bin");
//! let detector = BurnDetector::new(model, Default::default())
//!     .with_labels(vec!["background".into(), "person".into()]);
//! ```

use burn::prelude::*;
use burn::tensor::Tensor;
use thiserror::Error;

use super::{DetectionBuilder, DetectionSource, Frame};
use crate::tracker::Detection;

/// Error type for Burn detection failures.
#[derive(Debug, Clone, Error)]
pub enum BurnDetectorError {
    /// Input image does not match the model's input dimensions.
    #[error("invalid input dimensions: expected {expected:?}, got {got:?}")]
    InvalidInputDimensions {
        expected: (u32, u32, u32),
        got: (u32, u32, u32),
    },
    /// Model inference failed.
    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Raw detection output from the model.
#[derive(Debug, Clone)]
pub struct RawDetection {
    /// Bounding box: [x1, y1, x2, y2] or [cx, cy, w, h] depending on model
    pub bbox: [f32; 4],
    /// Confidence score
    pub score: f32,
    /// Class ID (optional, for multi-class detection)
    pub class_id: Option<usize>,
}

/// Trait for Burn-based detection models.
///
/// Implement this trait for your specific model architecture.
pub trait BurnModel<B: Backend>: Send + Sync {
    /// Run forward pass on the input tensor.
    ///
    /// # Arguments
    /// * `input` - Input tensor of shape [batch, channels, height, width]
    ///
    /// # Returns
    /// Vector of raw detections in input pixel coordinates.
    fn forward(&self, input: Tensor<B, 4>) -> Result<Vec<RawDetection>, BurnDetectorError>;

    /// Get the expected input size (channels, height, width).
    fn input_size(&self) -> (u32, u32, u32) {
        (3, 300, 300)
    }

    /// Whether bbox output is in XYWH format (vs TLBR).
    fn bbox_is_xywh(&self) -> bool {
        false
    }
}

/// Burn-based object detector implementing `DetectionSource`.
pub struct BurnDetector<B: Backend, M: BurnModel<B>> {
    model: M,
    device: B::Device,
    conf_threshold: f32,
    labels: Vec<String>,
}

impl<B: Backend, M: BurnModel<B>> BurnDetector<B, M> {
    /// Create a new Burn detector with the given model and device.
    pub fn new(model: M, device: B::Device) -> Self {
        Self {
            model,
            device,
            conf_threshold: 0.25,
            labels: Vec::new(),
        }
    }

    /// Set the confidence threshold for filtering detections.
    pub fn with_conf_threshold(mut self, threshold: f32) -> Self {
        self.conf_threshold = threshold;
        self
    }

    /// Class names indexed by the model's class ids.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Convert an interleaved HWC frame into a normalized NCHW tensor.
    fn preprocess(&self, image: &Frame) -> Result<Tensor<B, 4>, BurnDetectorError> {
        let (channels, target_h, target_w) = self.model.input_size();
        if channels != 3 || image.height() != target_h || image.width() != target_w {
            return Err(BurnDetectorError::InvalidInputDimensions {
                expected: (channels, target_h, target_w),
                got: (3, image.height(), image.width()),
            });
        }

        let plane = image.width() as usize * image.height() as usize;
        let mut data = vec![0.0f32; plane * 3];
        for (i, px) in image.data().chunks_exact(3).enumerate() {
            for (c, &value) in px.iter().enumerate() {
                data[c * plane + i] = value as f32 / 255.0;
            }
        }

        Ok(Tensor::<B, 1>::from_floats(data.as_slice(), &self.device).reshape([
            1,
            3,
            target_h as usize,
            target_w as usize,
        ]))
    }

    /// Convert raw model outputs to Detection objects.
    fn postprocess(&self, raw_detections: Vec<RawDetection>) -> Vec<Detection> {
        raw_detections
            .into_iter()
            .filter(|d| d.score >= self.conf_threshold)
            .map(|d| {
                let mut builder = DetectionBuilder::new().score(d.score);
                builder = if self.model.bbox_is_xywh() {
                    builder.xywh(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                } else {
                    builder.tlbr(d.bbox[0], d.bbox[1], d.bbox[2], d.bbox[3])
                };
                if let Some(label) = d.class_id.and_then(|id| self.labels.get(id)) {
                    builder = builder.label(label.clone());
                }
                builder.build()
            })
            .collect()
    }
}

impl<B: Backend, M: BurnModel<B>> DetectionSource for BurnDetector<B, M> {
    type Error = BurnDetectorError;

    fn detect(&mut self, image: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let tensor = self.preprocess(image)?;
        let raw_detections = self.model.forward(tensor)?;
        Ok(self.postprocess(raw_detections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::ChannelOrder;
    use crate::tracker::{Rect, Size};
    use burn::backend::NdArray;

    struct CenterModel;

    impl BurnModel<NdArray> for CenterModel {
        fn forward(&self, input: Tensor<NdArray, 4>) -> Result<Vec<RawDetection>, BurnDetectorError> {
            assert_eq!(input.dims(), [1, 3, 4, 4]);
            Ok(vec![
                RawDetection {
                    bbox: [1.0, 1.0, 3.0, 3.0],
                    score: 0.9,
                    class_id: Some(1),
                },
                RawDetection {
                    bbox: [0.0, 0.0, 1.0, 1.0],
                    score: 0.1,
                    class_id: None,
                },
            ])
        }

        fn input_size(&self) -> (u32, u32, u32) {
            (3, 4, 4)
        }
    }

    #[test]
    fn test_burn_detector() {
        let mut detector = BurnDetector::<NdArray, _>::new(CenterModel, Default::default())
            .with_labels(vec!["background".into(), "person".into()]);
        let image = Frame::filled(0, Size::new(4, 4), ChannelOrder::Rgb, [255, 0, 0]).unwrap();

        let detections = detector.detect(&image).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, Rect::from_tlbr(1.0, 1.0, 3.0, 3.0));
        assert_eq!(detections[0].class_label.as_deref(), Some("person"));
    }

    #[test]
    fn test_burn_detector_rejects_wrong_size() {
        let mut detector = BurnDetector::<NdArray, _>::new(CenterModel, Default::default());
        let image = Frame::filled(0, Size::new(8, 4), ChannelOrder::Rgb, [0, 0, 0]).unwrap();
        assert!(matches!(
            detector.detect(&image),
            Err(BurnDetectorError::InvalidInputDimensions { .. })
        ));
    }
}

//! In-process inference on the exported ONNX model.
//!
//! The exported classifier takes a `1x3xSxS` RGB tensor scaled to `[0, 1]`
//! and outputs softmax probabilities in class-folder order, so confidences
//! come back at full precision.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;
use tract_onnx::prelude::*;

use skin_core::{Error, Prediction, Result, NUM_CLASSES};

use crate::predictor::Classifier;

/// Classes kept per prediction
pub const TOP_K: usize = 5;

/// Classifier running `best.onnx` with tract
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    image_size: u32,
}

impl OnnxClassifier {
    /// Loads and optimizes the model for a fixed `image_size` square input
    pub fn load(path: &Path, image_size: u32) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("ONNX model not found at {}", path.display())));
        }
        if image_size == 0 {
            return Err(Error::InvalidArgument("image_size must be > 0".to_string()));
        }

        let size = image_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| Error::Prediction(format!("Failed to load {}: {}", path.display(), e)))?;

        tracing::info!("Loaded {} ({}x{} input)", path.display(), size, size);
        Ok(Self { model, image_size })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&mut self, image: &Path) -> Result<Prediction> {
        let rgb = image::open(image)?.to_rgb8();
        let input = preprocess(&rgb, self.image_size)?;

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| Error::Prediction(format!("Inference on {} failed: {}", image.display(), e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| Error::Prediction("Model produced no outputs".to_string()))?;
        let probs: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Prediction(format!("Output is not f32: {}", e)))?
            .iter()
            .copied()
            .collect();

        if probs.len() != NUM_CLASSES {
            return Err(Error::Prediction(format!(
                "Model returned {} scores, expected {}",
                probs.len(),
                NUM_CLASSES
            )));
        }
        Ok(Prediction::new(image.to_path_buf(), top_k_from_probs(&probs, TOP_K)))
    }
}

/// Resizes the shorter side to `size`, then crops the centre `size x size` square
pub fn resize_center_crop(image: &RgbImage, size: u32) -> Result<RgbImage> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::Image("Empty image".to_string()));
    }

    let short = w.min(h) as u64;
    let new_w = ((w as u64 * size as u64) / short).max(size as u64) as u32;
    let new_h = ((h as u64 * size as u64) / short).max(size as u64) as u32;
    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let x = ((new_w - size) as f64 / 2.0).round() as u32;
    let y = ((new_h - size) as f64 / 2.0).round() as u32;
    Ok(imageops::crop_imm(&resized, x, y, size, size).to_image())
}

/// NCHW float tensor in `[0, 1]`
pub fn preprocess(image: &RgbImage, size: u32) -> Result<Tensor> {
    let cropped = resize_center_crop(image, size)?;
    let s = size as usize;
    let array = tract_ndarray::Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
        cropped.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    });
    Ok(array.into())
}

/// The `k` highest scores with their class indices, highest first
pub fn top_k_from_probs(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_top_k_keeps_full_precision() {
        let top = top_k_from_probs(&[0.0157, 0.9743, 0.005, 0.003, 0.002], 3);
        assert_eq!(top, vec![(1, 0.9743), (0, 0.0157), (2, 0.005)]);
    }

    #[test]
    fn test_resize_center_crop_wide_image() {
        // left half red, right half blue; the crop keeps the centre seam
        let img = RgbImage::from_fn(400, 100, |x, _| {
            if x < 200 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 255])
            }
        });
        let out = resize_center_crop(&img, 50).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
        assert_eq!(out.get_pixel(0, 25).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(49, 25).0, [0, 0, 255]);
    }

    #[test]
    fn test_preprocess_layout_and_scale() {
        let img = RgbImage::from_pixel(8, 8, Rgb([255, 0, 51]));
        let tensor = preprocess(&img, 4).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 4, 4]);

        let view = tensor.to_array_view::<f32>().unwrap();
        assert_eq!(view[[0, 0, 1, 1]], 1.0);
        assert_eq!(view[[0, 1, 2, 3]], 0.0);
        assert!((view[[0, 2, 0, 0]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model() {
        let err = OnnxClassifier::load(Path::new("does/not/exist.onnx"), 224).err();
        assert!(matches!(err, Some(Error::NotFound(_))));
    }
}

use clap::ValueEnum;
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use ndarray::Array4;

use crate::error::ClassifierError;

// ImageNet statistics
const TORCH_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const TORCH_STD: [f32; 3] = [0.229, 0.224, 0.225];
const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Pixel normalization applied before the forward pass. Must match the
/// preprocessing the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Normalization {
    /// Pixels stay in 0..=255 (EfficientNet rescales inside the graph).
    Raw,
    /// Scale to -1..=1 (MobileNet, Inception).
    Tf,
    /// Scale to 0..=1, then ImageNet mean/std per channel.
    Torch,
    /// RGB to BGR, then ImageNet mean subtraction per channel.
    Caffe,
}

impl Normalization {
    fn channel(self, pixel: &Rgb<u8>, c: usize) -> f32 {
        match self {
            Normalization::Raw => pixel[c] as f32,
            Normalization::Tf => pixel[c] as f32 / 127.5 - 1.0,
            Normalization::Torch => (pixel[c] as f32 / 255.0 - TORCH_MEAN[c]) / TORCH_STD[c],
            Normalization::Caffe => pixel[2 - c] as f32 - CAFFE_MEAN_BGR[c],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TensorLayout {
    Nhwc,
    Nchw,
}

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    pub width: u32,
    pub height: u32,
    pub normalization: Normalization,
    pub layout: TensorLayout,
}

impl Preprocessor {
    pub fn input_shape(&self) -> [usize; 4] {
        let (w, h) = (self.width as usize, self.height as usize);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        }
    }

    pub fn prepare(&self, image_bytes: &[u8]) -> Result<Array4<f32>, ClassifierError> {
        let img = image::load_from_memory(image_bytes)?.to_rgb8();
        let resized = image::imageops::resize(&img, self.width, self.height, FilterType::CatmullRom);
        Ok(self.to_tensor(&resized))
    }

    fn to_tensor(&self, img: &RgbImage) -> Array4<f32> {
        let [n, d1, d2, d3] = self.input_shape();
        let norm = self.normalization;
        match self.layout {
            TensorLayout::Nhwc => Array4::from_shape_fn((n, d1, d2, d3), |(_, y, x, c)| {
                norm.channel(img.get_pixel(x as u32, y as u32), c)
            }),
            TensorLayout::Nchw => Array4::from_shape_fn((n, d1, d2, d3), |(_, c, y, x)| {
                norm.channel(img.get_pixel(x as u32, y as u32), c)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat};
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn assert_close(actual: f32, expected: f32, tolerance: f32) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{actual} not within {tolerance} of {expected}"
        );
    }

    fn preprocessor(normalization: Normalization, layout: TensorLayout) -> Preprocessor {
        Preprocessor {
            width: 8,
            height: 6,
            normalization,
            layout,
        }
    }

    #[test]
    fn resizes_to_model_input_nhwc() {
        let tensor = preprocessor(Normalization::Raw, TensorLayout::Nhwc)
            .prepare(&png(32, 20, [10, 20, 30]))
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 6, 8, 3]);
        assert_close(tensor[[0, 3, 4, 0]], 10.0, 1.0);
        assert_close(tensor[[0, 3, 4, 1]], 20.0, 1.0);
        assert_close(tensor[[0, 3, 4, 2]], 30.0, 1.0);
    }

    #[test]
    fn nchw_puts_channels_first() {
        let tensor = preprocessor(Normalization::Raw, TensorLayout::Nchw)
            .prepare(&png(4, 4, [1, 2, 3]))
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 6, 8]);
        assert_close(tensor[[0, 0, 5, 7]], 1.0, 1.0);
        assert_close(tensor[[0, 2, 0, 0]], 3.0, 1.0);
    }

    #[test]
    fn tf_scales_to_unit_range() {
        let tensor = preprocessor(Normalization::Tf, TensorLayout::Nhwc)
            .prepare(&png(8, 6, [0, 255, 0]))
            .unwrap();
        assert_close(tensor[[0, 0, 0, 0]], -1.0, 0.01);
        assert_close(tensor[[0, 0, 0, 1]], 1.0, 0.01);
    }

    #[test]
    fn torch_uses_imagenet_statistics() {
        let pixel = Rgb([255, 0, 0]);
        let value = Normalization::Torch.channel(&pixel, 0);
        assert!((value - (1.0 - 0.485) / 0.229).abs() < 1e-5);
    }

    #[test]
    fn caffe_swaps_to_bgr_and_subtracts_mean() {
        let pixel = Rgb([200, 100, 50]);
        assert!((Normalization::Caffe.channel(&pixel, 0) - (50.0 - 103.939)).abs() < 1e-4);
        assert!((Normalization::Caffe.channel(&pixel, 2) - (200.0 - 123.68)).abs() < 1e-4);
    }

    #[test]
    fn non_image_bytes_fail_to_decode() {
        let err = preprocessor(Normalization::Raw, TensorLayout::Nhwc)
            .prepare(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
        assert!(err.to_string().starts_with("failed to decode image"));
    }

    #[test]
    fn same_input_gives_same_tensor() {
        let p = preprocessor(Normalization::Torch, TensorLayout::Nchw);
        let bytes = png(16, 16, [90, 140, 200]);
        assert_eq!(p.prepare(&bytes).unwrap(), p.prepare(&bytes).unwrap());
    }
}

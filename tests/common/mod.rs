#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array1, Array2, Array4};
use occipital::{Classifier, InferenceEngine};

/// Returns the same logits for every input and counts its invocations
#[derive(Debug)]
pub struct FixedEngine {
    logits: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedEngine {
    pub fn new(logits: Vec<f32>) -> Self {
        Self {
            logits,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceEngine for FixedEngine {
    fn input_name(&self) -> &str {
        "data"
    }

    fn output_name(&self) -> &str {
        "logits"
    }

    fn input_shape(&self) -> Vec<i64> {
        vec![1, 3, 224, 224]
    }

    fn output_shape(&self) -> Vec<i64> {
        vec![1, self.logits.len() as i64]
    }

    fn run(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.dim().0 != 1 || input.dim().1 != 3 {
            bail!("unexpected input shape {:?}", input.shape());
        }
        Ok(Array1::from(self.logits.clone()).insert_axis(ndarray::Axis(0)))
    }
}

/// Logits derived from the mean of each channel, so different images give
/// different but reproducible rankings
#[derive(Debug)]
pub struct ChannelMeanEngine {
    pub num_classes: usize,
}

impl InferenceEngine for ChannelMeanEngine {
    fn input_name(&self) -> &str {
        "data"
    }

    fn output_name(&self) -> &str {
        "logits"
    }

    fn input_shape(&self) -> Vec<i64> {
        vec![1, 3, 224, 224]
    }

    fn output_shape(&self) -> Vec<i64> {
        vec![1, self.num_classes as i64]
    }

    fn run(&self, input: Array4<f32>) -> anyhow::Result<Array2<f32>> {
        let means: Vec<f32> = (0..3)
            .map(|c| input.index_axis(ndarray::Axis(1), c).mean().unwrap_or(0.0))
            .collect();
        Ok(Array2::from_shape_fn((1, self.num_classes), |(_, i)| {
            means[i % 3] * (i as f32 + 1.0).sin()
        }))
    }
}

pub fn numbered_labels(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("class_{}", i)).collect()
}

pub fn classifier_with(engine: Arc<dyn InferenceEngine>, labels: Vec<String>) -> Classifier {
    Classifier::builder()
        .with_engine(engine, labels)
        .unwrap()
        .build()
        .expect("Failed to create classifier")
}

pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode PNG");
    buffer.into_inner()
}

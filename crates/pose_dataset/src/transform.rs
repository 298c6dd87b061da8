//! Image transform pipeline: resize, center crop, grayscale tensor conversion, normalize.

use crate::types::{DatasetError, DatasetResult};
use data_contracts::NormalizeStats;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

pub const DEFAULT_RESIZE_SHORTER: u32 = 256;
pub const DEFAULT_CROP: (u32, u32) = (224, 224);

#[derive(Debug, Clone)]
pub struct TransformPipeline {
    /// Scale so the shorter side matches this length, keeping aspect ratio.
    pub resize_shorter: Option<u32>,
    /// Center crop to (width, height).
    pub center_crop: Option<(u32, u32)>,
    pub normalize: Option<NormalizeStats>,
    pub filter: FilterType,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self {
            resize_shorter: Some(DEFAULT_RESIZE_SHORTER),
            center_crop: Some(DEFAULT_CROP),
            normalize: Some(NormalizeStats::default()),
            filter: FilterType::Triangle,
        }
    }
}

impl TransformPipeline {
    pub fn describe(&self) -> String {
        let resize = self
            .resize_shorter
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        let crop = self
            .center_crop
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "none".to_string());
        let norm = self
            .normalize
            .map(|n| format!("mean={:.3} std={:.3}", n.mean, n.std))
            .unwrap_or_else(|| "none".to_string());
        format!(
            "resize_shorter={} center_crop={} normalize=[{}] filter={:?}",
            resize, crop, norm, self.filter
        )
    }

    /// Apply the pipeline, returning CHW pixels (one channel) and the final (width, height).
    pub fn apply(&self, img: DynamicImage) -> DatasetResult<(Vec<f32>, u32, u32)> {
        let mut gray = img.to_luma8();

        if let Some(shorter) = self.resize_shorter {
            let (w, h) = resized_dims(gray.width(), gray.height(), shorter);
            if (w, h) != gray.dimensions() {
                gray = image::imageops::resize(&gray, w, h, self.filter);
            }
        }

        if let Some((cw, ch)) = self.center_crop {
            gray = center_crop(&gray, cw, ch)?;
        }

        let (width, height) = gray.dimensions();
        let pixels = gray
            .as_raw()
            .iter()
            .map(|&p| {
                let v = p as f32 / 255.0;
                match &self.normalize {
                    Some(stats) => stats.apply(v),
                    None => v,
                }
            })
            .collect();
        Ok((pixels, width, height))
    }
}

/// Shorter side becomes `shorter`; the longer side is scaled and truncated.
fn resized_dims(width: u32, height: u32, shorter: u32) -> (u32, u32) {
    if width <= height {
        let h = (shorter as u64 * height as u64 / width.max(1) as u64) as u32;
        (shorter, h.max(1))
    } else {
        let w = (shorter as u64 * width as u64 / height.max(1) as u64) as u32;
        (w.max(1), shorter)
    }
}

/// Leading margin of a centered crop; halves round to even (341 -> 224 starts at 58).
fn crop_offset(extent: u32, crop: u32) -> u32 {
    ((extent - crop) as f32 / 2.0).round_ties_even() as u32
}

fn center_crop(img: &GrayImage, crop_w: u32, crop_h: u32) -> DatasetResult<GrayImage> {
    let (width, height) = img.dimensions();
    if crop_w > width || crop_h > height {
        return Err(DatasetError::CropTooLarge {
            crop_w,
            crop_h,
            width,
            height,
        });
    }
    let left = crop_offset(width, crop_w);
    let top = crop_offset(height, crop_h);
    Ok(image::imageops::crop_imm(img, left, top, crop_w, crop_h).to_image())
}

#[derive(Debug, Clone, Default)]
pub struct TransformPipelineBuilder {
    inner: TransformPipeline,
}

impl TransformPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn resize_shorter(mut self, size: Option<u32>) -> Self {
        self.inner.resize_shorter = size;
        self
    }
    pub fn center_crop(mut self, size: Option<(u32, u32)>) -> Self {
        self.inner.center_crop = size;
        self
    }
    pub fn normalize(mut self, stats: Option<NormalizeStats>) -> Self {
        self.inner.normalize = stats;
        self
    }
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.inner.filter = filter;
        self
    }
    pub fn build(self) -> DatasetResult<TransformPipeline> {
        if self.inner.resize_shorter == Some(0) {
            return Err(DatasetError::Config("resize_shorter must be > 0".into()));
        }
        if let Some((w, h)) = self.inner.center_crop {
            if w == 0 || h == 0 {
                return Err(DatasetError::Config(format!(
                    "center crop must be non-empty, got {w}x{h}"
                )));
            }
        }
        if let Some(stats) = &self.inner.normalize {
            stats
                .validate()
                .map_err(|e| DatasetError::Config(e.to_string()))?;
        }
        Ok(self.inner)
    }
}

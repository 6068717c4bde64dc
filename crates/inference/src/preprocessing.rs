use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use image::RgbImage;
use ndarray::{Array, IxDyn};

const LETTERBOX_COLOR: u8 = 114;

/// DETR-style detectors normalize with the ImageNet statistics.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// ViT image processors default to 0.5 mean/std on every channel.
pub const VIT_MEAN: [f32; 3] = [0.5, 0.5, 0.5];
pub const VIT_STD: [f32; 3] = [0.5, 0.5, 0.5];

/// How the image is fitted to the model input.
///
/// `Letterbox` preserves aspect ratio and pads with gray; `Stretch`
/// resizes both axes independently (what a ViT processor does).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Letterbox,
    Stretch,
}

/// Geometry of the forward transform, used to map detector boxes back to
/// original-image pixel coordinates.
///
/// For `Stretch` mode the scale is 1.0 and offsets are 0; nothing maps back.
#[derive(Debug, Clone)]
pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

pub struct PreProcessor {
    pub input_size: (u32, u32),
    mode: ResizeMode,
    mean: [f32; 3],
    std: [f32; 3],
    rgb_buffer: Vec<u8>,
    letterboxed_buffer: Vec<u8>,
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32), mode: ResizeMode, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self {
            input_size,
            mode,
            mean,
            std,
            rgb_buffer: Vec::with_capacity(1920 * 1080 * 3),
            letterboxed_buffer: vec![LETTERBOX_COLOR; (input_size.0 * input_size.1 * 3) as usize],
        }
    }

    /// Preprocessor for a DETR-style detector: letterbox + ImageNet stats.
    pub fn detector(input_size: (u32, u32)) -> Self {
        Self::new(input_size, ResizeMode::Letterbox, IMAGENET_MEAN, IMAGENET_STD)
    }

    /// Preprocessor for a ViT-style classifier: stretch resize + 0.5 stats.
    pub fn classifier(input_size: (u32, u32)) -> Self {
        Self::new(input_size, ResizeMode::Stretch, VIT_MEAN, VIT_STD)
    }

    /// Resize and normalize an RGB image into a `[1, 3, H, W]` tensor.
    pub fn preprocess(
        &mut self,
        image: &RgbImage,
    ) -> anyhow::Result<(Array<f32, IxDyn>, TransformParams)> {
        let _s = common::span!("preprocess_image");

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            anyhow::bail!("cannot preprocess an empty image ({}x{})", width, height);
        }

        tracing::trace!(width, height, mode = ?self.mode, "Preprocessing image");

        self.rgb_buffer.clear();
        self.rgb_buffer.extend_from_slice(image.as_raw());

        let params = match self.mode {
            ResizeMode::Letterbox => self.resize_and_letterbox(width, height)?,
            ResizeMode::Stretch => self.resize_stretched(width, height)?,
        };

        let input = self.normalize();
        Ok((input, params))
    }

    fn resize_and_letterbox(
        &mut self,
        width: u32,
        height: u32,
    ) -> anyhow::Result<TransformParams> {
        let scale =
            (self.input_size.0 as f32 / width as f32).min(self.input_size.1 as f32 / height as f32);
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        let offset_x = (self.input_size.0 - new_width) / 2;
        let offset_y = (self.input_size.1 - new_height) / 2;

        let src = Image::from_slice_u8(width, height, &mut self.rgb_buffer, PixelType::U8x3)?;

        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.fill(LETTERBOX_COLOR);

        let resized_data = resized.buffer();
        let stride = self.input_size.0 * 3;

        for y in 0..new_height {
            let src_row = (y * new_width * 3) as usize;
            let dst_row = ((y + offset_y) * stride + offset_x * 3) as usize;

            self.letterboxed_buffer[dst_row..dst_row + (new_width * 3) as usize]
                .copy_from_slice(&resized_data[src_row..src_row + (new_width * 3) as usize]);
        }

        Ok(TransformParams {
            orig_width: width,
            orig_height: height,
            input_width: self.input_size.0,
            input_height: self.input_size.1,
            scale,
            offset_x: offset_x as f32,
            offset_y: offset_y as f32,
        })
    }

    fn resize_stretched(&mut self, width: u32, height: u32) -> anyhow::Result<TransformParams> {
        let src = Image::from_slice_u8(width, height, &mut self.rgb_buffer, PixelType::U8x3)?;

        let mut resized = Image::new(self.input_size.0, self.input_size.1, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        self.letterboxed_buffer.copy_from_slice(resized.buffer());

        Ok(TransformParams {
            orig_width: width,
            orig_height: height,
            input_width: self.input_size.0,
            input_height: self.input_size.1,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        })
    }

    fn normalize(&self) -> Array<f32, IxDyn> {
        let width = self.input_size.0 as usize;
        let height = self.input_size.1 as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];

        for (i, px) in self.letterboxed_buffer.chunks_exact(3).enumerate() {
            let r = px[0] as f32 / 255.0;
            let g = px[1] as f32 / 255.0;
            let b = px[2] as f32 / 255.0;

            output[i] = (r - self.mean[0]) / self.std[0];
            output[i + spatial] = (g - self.mean[1]) / self.std[1];
            output[i + 2 * spatial] = (b - self.mean[2]) / self.std[2];
        }

        Array::from_shape_vec(IxDyn(&[1, 3, height, width]), output)
            .expect("buffer length matches [1, 3, H, W]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to build a solid-color RGB image
    fn solid_image(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([value, value, value]))
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 800x600 image into a 640x640 input
        let img = solid_image(800, 600, 128);

        let mut preprocessor = PreProcessor::detector((640, 640));
        let (output, params) = preprocessor.preprocess(&img).unwrap();

        // Scale should be min(640/800, 640/600) = 0.8
        assert_eq!(params.scale, 0.8, "Scale should preserve aspect ratio");

        // Resized dimensions: 800*0.8 = 640, 600*0.8 = 480
        // Offset X = 0, Offset Y = (640 - 480) / 2 = 80
        assert_eq!(params.offset_x, 0.0, "X offset should be 0 for wide image");
        assert_eq!(params.offset_y, 80.0, "Y offset should center vertically");

        assert_eq!(output.shape(), &[1, 3, 640, 640]);
    }

    #[test]
    fn test_letterbox_padding_uses_gray() {
        let img = solid_image(100, 50, 0);

        let mut preprocessor = PreProcessor::detector((64, 64));
        let (output, params) = preprocessor.preprocess(&img).unwrap();

        // Top rows are padding; their value should be the normalized gray 114
        let expected = (114.0 / 255.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let top_left = output[[0, 0, 0, 0]];
        assert!(
            (top_left - expected).abs() < 1e-5,
            "Padding should normalize the gray fill (got {}, want {})",
            top_left,
            expected
        );

        // Center rows are image; black normalizes differently from the fill
        let center_y = (params.offset_y as usize) + 10;
        let center = output[[0, 0, center_y, 32]];
        assert!(
            (center - top_left).abs() > 0.1,
            "Image content should differ from padding"
        );
    }

    #[test]
    fn test_imagenet_normalization_values() {
        // Mid gray 128 (0.502) with ImageNet stats:
        //   R: (0.502 - 0.485) / 0.229 ≈ 0.074
        //   G: (0.502 - 0.456) / 0.224 ≈ 0.205
        //   B: (0.502 - 0.406) / 0.225 ≈ 0.427
        let img = solid_image(64, 64, 128);

        let mut preprocessor = PreProcessor::detector((64, 64));
        let (output, _) = preprocessor.preprocess(&img).unwrap();

        let r = output[[0, 0, 32, 32]];
        let g = output[[0, 1, 32, 32]];
        let b = output[[0, 2, 32, 32]];

        assert!((r - 0.074).abs() < 0.01, "R channel should be ~0.074 (got {})", r);
        assert!((g - 0.205).abs() < 0.01, "G channel should be ~0.205 (got {})", g);
        assert!((b - 0.427).abs() < 0.01, "B channel should be ~0.427 (got {})", b);
    }

    #[test]
    fn test_stretch_resize_fills_whole_input() {
        // Non-square image stretched into a square input: no padding anywhere
        let img = solid_image(100, 40, 200);

        let mut preprocessor = PreProcessor::classifier((32, 32));
        let (output, params) = preprocessor.preprocess(&img).unwrap();

        assert_eq!(output.shape(), &[1, 3, 32, 32]);
        assert_eq!(params.scale, 1.0);
        assert_eq!(params.offset_x, 0.0);
        assert_eq!(params.offset_y, 0.0);

        // 200/255 ≈ 0.784 -> (0.784 - 0.5) / 0.5 ≈ 0.569 at every position
        let expected = (200.0 / 255.0 - 0.5) / 0.5;
        for &(y, x) in &[(0usize, 0usize), (0, 31), (31, 0), (31, 31), (16, 16)] {
            let v = output[[0, 0, y, x]];
            assert!(
                (v - expected).abs() < 1e-5,
                "Stretched solid image should be uniform at ({}, {}): got {}",
                y,
                x,
                v
            );
        }
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let img = RgbImage::new(0, 0);
        let mut preprocessor = PreProcessor::detector((64, 64));
        assert!(
            preprocessor.preprocess(&img).is_err(),
            "Zero-sized images should not reach the resizer"
        );
    }
}

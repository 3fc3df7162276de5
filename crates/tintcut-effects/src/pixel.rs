//! Pixel-level colour transform.
//!
//! Per pixel, in this order: channel scale, brightness, composite onto the
//! background at the given opacity, then (optionally) an unweighted greyscale
//! mean. Every multiplicative step clamps to `[0, 255]`. Alpha is untouched.

use crate::adjustments::AdjustmentParameters;
use rayon::prelude::*;
use tintcut_core::frame::BYTES_PER_PIXEL;
use tintcut_core::{FrameBuffer, Rgb8};

/// Frames smaller than this many bytes are processed on the calling thread.
const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// The subset of [`AdjustmentParameters`] the pixel model uses, with the
/// percentages pre-divided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelAdjustments {
    scale: [f64; 3],
    brightness: f64,
    opacity: f64,
    background: [f64; 3],
    greyscale: bool,
}

impl PixelAdjustments {
    pub fn new(params: &AdjustmentParameters) -> Self {
        let Rgb8 { r, g, b } = params.background;
        Self {
            scale: [
                params.red_scale / 100.0,
                params.green_scale / 100.0,
                params.blue_scale / 100.0,
            ],
            brightness: params.brightness / 100.0,
            opacity: params.opacity / 100.0,
            background: [f64::from(r), f64::from(g), f64::from(b)],
            greyscale: params.greyscale,
        }
    }

    /// True when the transform leaves every pixel unchanged.
    pub fn is_identity(&self) -> bool {
        self.scale == [1.0; 3] && self.brightness == 1.0 && self.opacity == 1.0 && !self.greyscale
    }

    #[inline]
    fn apply(&self, px: &mut [u8; 4]) {
        let mut out = [0.0f64; 3];
        for (i, c) in out.iter_mut().enumerate() {
            let scaled = clamp_channel(f64::from(px[i]) * self.scale[i]);
            let lit = clamp_channel(scaled * self.brightness);
            *c = (self.background[i] * (1.0 - self.opacity) + lit * self.opacity).round();
        }
        if self.greyscale {
            let grey = ((out[0] + out[1] + out[2]) / 3.0).round();
            out = [grey; 3];
        }
        for (dst, c) in px.iter_mut().zip(out) {
            *dst = clamp_channel(c) as u8;
        }
    }
}

impl From<&AdjustmentParameters> for PixelAdjustments {
    fn from(params: &AdjustmentParameters) -> Self {
        Self::new(params)
    }
}

#[inline]
fn clamp_channel(v: f64) -> f64 {
    v.clamp(0.0, 255.0)
}

/// Transform a frame in place. Row padding is left as-is.
pub fn transform(frame: &mut FrameBuffer, params: &PixelAdjustments) {
    if params.is_identity() {
        return;
    }
    let row_bytes = frame.width as usize * BYTES_PER_PIXEL;
    let stride = frame.stride;
    let height = frame.height as usize;
    if row_bytes == 0 || height == 0 {
        return;
    }
    let data = &mut frame.as_bytes_mut()[..stride * height];
    if data.len() < PARALLEL_THRESHOLD {
        data.chunks_mut(stride)
            .for_each(|row| transform_row(&mut row[..row_bytes], params));
    } else {
        data.par_chunks_mut(stride)
            .for_each(|row| transform_row(&mut row[..row_bytes], params));
    }
}

/// Transform tightly packed RGBA bytes in place. A trailing partial pixel is
/// ignored.
pub fn transform_rgba(data: &mut [u8], params: &PixelAdjustments) {
    if params.is_identity() {
        return;
    }
    let whole = data.len() / BYTES_PER_PIXEL * BYTES_PER_PIXEL;
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut data[..whole]);
    if whole < PARALLEL_THRESHOLD {
        pixels.iter_mut().for_each(|px| params.apply(px));
    } else {
        pixels.par_iter_mut().for_each(|px| params.apply(px));
    }
}

#[inline]
fn transform_row(row: &mut [u8], params: &PixelAdjustments) {
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(row);
    for px in pixels {
        params.apply(px);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params_with(f: impl FnOnce(&mut AdjustmentParameters)) -> PixelAdjustments {
        let mut params = AdjustmentParameters::default();
        f(&mut params);
        PixelAdjustments::new(&params)
    }

    fn reference(rgb: [u8; 3], p: &AdjustmentParameters) -> [u8; 3] {
        let bg = p.background.to_array();
        let scales = [p.red_scale, p.green_scale, p.blue_scale];
        let mut out = [0.0; 3];
        for i in 0..3 {
            let c = (f64::from(rgb[i]) * (scales[i] / 100.0)).min(255.0);
            let c = (c * (p.brightness / 100.0)).min(255.0);
            out[i] = (f64::from(bg[i]) * (1.0 - p.opacity / 100.0) + c * (p.opacity / 100.0)).round();
        }
        if p.greyscale {
            let g = ((out[0] + out[1] + out[2]) / 3.0).round();
            out = [g; 3];
        }
        [out[0] as u8, out[1] as u8, out[2] as u8]
    }

    #[test]
    fn test_brightness_scales_channels() {
        let params = params_with(|p| p.brightness = 150.0);
        let mut frame = FrameBuffer::solid(800, 600, [100, 100, 100, 255]);
        transform(&mut frame, &params);
        assert_eq!(frame.pixel(0, 0), Some([150, 150, 150, 255]));
        assert_eq!(frame.pixel(799, 599), Some([150, 150, 150, 255]));
    }

    #[test]
    fn test_brightness_clamps_at_white() {
        let params = params_with(|p| p.brightness = 200.0);
        let mut px = [200, 10, 128, 7];
        transform_rgba(&mut px, &params);
        assert_eq!(px, [255, 20, 255, 7]);
    }

    #[test]
    fn test_zero_opacity_shows_background() {
        let params = params_with(|p| p.opacity = 0.0);
        let mut px = [255, 0, 12, 99];
        transform_rgba(&mut px, &params);
        assert_eq!(px, [48, 48, 48, 99]);
    }

    #[test]
    fn test_half_opacity_composites() {
        let params = params_with(|p| {
            p.opacity = 50.0;
            p.background = Rgb8::new(0, 100, 255);
        });
        let mut px = [100, 100, 100, 255];
        transform_rgba(&mut px, &params);
        assert_eq!(px, [50, 100, 178, 255]);
    }

    #[test]
    fn test_greyscale_is_unweighted_mean() {
        let params = params_with(|p| p.greyscale = true);
        let mut px = [255, 0, 1, 255];
        transform_rgba(&mut px, &params);
        assert_eq!(px, [85, 85, 85, 255]);
    }

    #[test]
    fn test_padding_is_untouched() {
        let params = params_with(|p| p.red_scale = 0.0);
        let mut data = vec![200u8; 12 * 2];
        data[8..12].copy_from_slice(&[1, 2, 3, 4]);
        let mut frame = FrameBuffer::from_rgba_with_stride(2, 2, 12, data).unwrap();
        transform(&mut frame, &params);
        assert_eq!(frame.pixel(1, 1), Some([0, 200, 200, 200]));
        assert_eq!(&frame.as_bytes()[8..12], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut p = AdjustmentParameters::default();
        p.green_scale = 37.0;
        p.opacity = 61.0;
        p.greyscale = true;

        let mut data: Vec<u8> = (0..PARALLEL_THRESHOLD * 2).map(|i| (i * 31 % 251) as u8).collect();
        let mut expected = data.clone();
        for px in expected.chunks_exact_mut(4) {
            let rgb = reference([px[0], px[1], px[2]], &p);
            px[..3].copy_from_slice(&rgb);
        }
        transform_rgba(&mut data, &PixelAdjustments::new(&p));
        assert_eq!(data, expected);
    }

    proptest! {
        #[test]
        fn matches_reference(
            rgb in any::<[u8; 3]>(),
            alpha: u8,
            scales in any::<[u8; 3]>(),
            brightness in 0.0f64..=200.0,
            opacity in 0.0f64..=100.0,
            bg in any::<[u8; 3]>(),
            greyscale: bool,
        ) {
            let mut p = AdjustmentParameters::default();
            p.red_scale = f64::from(scales[0]) * 200.0 / 255.0;
            p.green_scale = f64::from(scales[1]) * 200.0 / 255.0;
            p.blue_scale = f64::from(scales[2]) * 200.0 / 255.0;
            p.brightness = brightness;
            p.opacity = opacity;
            p.background = Rgb8::new(bg[0], bg[1], bg[2]);
            p.greyscale = greyscale;

            let mut px = [rgb[0], rgb[1], rgb[2], alpha];
            transform_rgba(&mut px, &PixelAdjustments::new(&p));
            let expected = reference(rgb, &p);
            prop_assert_eq!(&px[..3], &expected[..]);
            prop_assert_eq!(px[3], alpha);
        }

        #[test]
        fn scale_step_stays_in_range(c: u8, s in 0.0f64..=200.0) {
            let v = clamp_channel(f64::from(c) * s / 100.0);
            prop_assert!((0.0..=255.0).contains(&v));
        }

        #[test]
        fn greyscale_channels_are_equal(rgb in any::<[u8; 3]>()) {
            let params = params_with(|p| p.greyscale = true);
            let mut px = [rgb[0], rgb[1], rgb[2], 255];
            transform_rgba(&mut px, &params);
            let mean = ((f64::from(rgb[0]) + f64::from(rgb[1]) + f64::from(rgb[2])) / 3.0).round() as u8;
            prop_assert_eq!(px, [mean, mean, mean, 255]);
        }
    }
}

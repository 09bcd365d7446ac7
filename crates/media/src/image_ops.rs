//! In-process image pipeline: decode, scale to a bound, flatten onto an
//! opaque canvas and encode as WebP.
//!
//! These functions are synchronous and CPU-bound; callers are expected to
//! run them on the blocking pool.

use crate::MediaError;
use image::{imageops::FilterType, Rgb, RgbImage};
use std::{ops::Deref, path::Path};

/// How a thumbnail must be produced.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailParams {
	/// Longest side of the output, in pixels.
	pub bound: u32,
	/// WebP quality, 0.0 to 100.0.
	pub quality: f32,
	/// Background the image is flattened onto when it carries alpha.
	pub background: [u8; 3],
}

impl Default for ThumbnailParams {
	fn default() -> Self {
		Self {
			bound: 272,
			quality: 85.0,
			background: [0xFF, 0x00, 0xFF],
		}
	}
}

/// Decodes `source`, scales it so its longest side is at most
/// `params.bound` (aspect ratio preserved, Lanczos3 resampling), flattens
/// alpha onto the configured background and writes a WebP file to `dest`.
///
/// Returns the dimensions of the written thumbnail.
pub fn generate_thumbnail(
	source: &Path,
	dest: &Path,
	params: &ThumbnailParams,
) -> Result<(u32, u32), MediaError> {
	let decoded = image::open(source)?;

	let scaled = if decoded.width() > params.bound || decoded.height() > params.bound {
		decoded.resize(params.bound, params.bound, FilterType::Lanczos3)
	} else {
		decoded
	};

	let flattened = flatten(&scaled.to_rgba8(), params.background);
	let (width, height) = flattened.dimensions();

	let encoded = webp::Encoder::from_rgb(flattened.as_raw(), width, height)
		.encode_simple(false, params.quality)
		.map_err(|e| MediaError::Encode(format!("{e:?}")))?;
	std::fs::write(dest, encoded.deref())?;

	Ok((width, height))
}

/// Alpha-blends an RGBA image over an opaque canvas of the given color.
/// Palette and alpha sources come out as plain RGB.
fn flatten(source: &image::RgbaImage, background: [u8; 3]) -> RgbImage {
	let (width, height) = source.dimensions();
	let mut canvas = RgbImage::from_pixel(width, height, Rgb(background));

	for (x, y, pixel) in source.enumerate_pixels() {
		let alpha = f32::from(pixel[3]) / 255.0;
		let out = canvas.get_pixel_mut(x, y);
		for channel in 0..3 {
			let fg = f32::from(pixel[channel]);
			let bg = f32::from(background[channel]);
			out[channel] = (fg * alpha + bg * (1.0 - alpha)).round() as u8;
		}
	}

	canvas
}

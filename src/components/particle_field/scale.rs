//! Device-pixel-ratio scaling for option values.
//!
//! Options are authored in CSS pixels while the simulation runs in canvas
//! (device) pixels. Every length that reaches the simulation passes through
//! [`ScaledValues`] exactly once, when the population is seeded:
//!
//! - link distances (the field default and per-group overrides)
//! - link line widths
//! - particle radii and speeds
//!
//! Ribbon chains are the exception: they integrate in CSS pixels in the
//! particle's local frame and are scaled at draw time, see
//! [`super::ribbon::Ribbon::polygons`].

use super::types::FieldOptions;

/// Option values converted to device pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledValues {
	/// Device pixels per CSS pixel.
	pub pixel_ratio: f64,
	/// Default link distance for particles without their own.
	pub links_distance: f64,
	/// Default link line width.
	pub links_width: f64,
}

impl ScaledValues {
	/// Compute scaled values from options.
	pub fn new(options: &FieldOptions) -> Self {
		let pixel_ratio = options.pixel_ratio;
		let links = &options.particles.links;
		Self {
			pixel_ratio,
			links_distance: links.distance * pixel_ratio,
			links_width: links.width * pixel_ratio,
		}
	}

	/// Converts a CSS length to device pixels.
	pub fn to_device(&self, css: f64) -> f64 {
		css * self.pixel_ratio
	}
}

impl Default for ScaledValues {
	fn default() -> Self {
		Self::new(&FieldOptions::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_retina_distances() {
		let mut options = FieldOptions {
			pixel_ratio: 2.0,
			..FieldOptions::default()
		};
		options.particles.links.distance = 120.0;
		options.particles.links.width = 1.5;

		let scale = ScaledValues::new(&options);
		assert_eq!(scale.links_distance, 240.0);
		assert_eq!(scale.links_width, 3.0);
		assert_eq!(scale.to_device(10.0), 20.0);
	}
}

//! Declarative option types for the particle field.
//!
//! Options are deserialised once (from JSON embedded in the page or built in
//! code) and resolved into plain per-particle values when the population is
//! seeded. Nothing here changes while a frame is being computed.

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while ingesting field options.
#[derive(Debug, Error)]
pub enum OptionsError {
	/// The document is not valid JSON for [`FieldOptions`].
	#[error("options parse error: {0}")]
	Json(#[from] serde_json::Error),

	/// A numeric option lies outside its valid domain.
	#[error("invalid value for `{field}`: {value}")]
	InvalidValue {
		/// Option path, e.g. `particles.links.distance`.
		field: &'static str,
		/// The rejected value.
		value: f64,
	},
}

/// A number, or a range sampled uniformly each time a particle is created.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RangeValue {
	/// Always the same value.
	Fixed(f64),
	/// Uniform in `[min, max)`; `min` when the range is empty.
	Range { min: f64, max: f64 },
}

impl RangeValue {
	/// Draws a value from the range.
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
		match *self {
			RangeValue::Fixed(value) => value,
			RangeValue::Range { min, max } if max > min => rng.gen_range(min..max),
			RangeValue::Range { min, .. } => min,
		}
	}

	/// Smallest value the range can produce.
	pub fn min(&self) -> f64 {
		match *self {
			RangeValue::Fixed(value) => value,
			RangeValue::Range { min, max } => min.min(max),
		}
	}

	/// Largest value the range can produce.
	pub fn max(&self) -> f64 {
		match *self {
			RangeValue::Fixed(value) => value,
			RangeValue::Range { min, max } => min.max(max),
		}
	}
}

/// A color as written in options: `"#ff0000"`, `"rgb(1, 2, 3)"`, `"red"`,
/// `"random"`, or the object form `{ "value": "..." }`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ColorSpec {
	/// Bare string form.
	Value(String),
	/// Object form.
	Object {
		/// The color string.
		value: String,
	},
}

impl ColorSpec {
	/// The color string regardless of which form was used.
	pub fn value(&self) -> &str {
		match self {
			ColorSpec::Value(value) | ColorSpec::Object { value } => value,
		}
	}
}

impl From<&str> for ColorSpec {
	fn from(value: &str) -> Self {
		ColorSpec::Value(value.to_string())
	}
}

impl Default for ColorSpec {
	fn default() -> Self {
		ColorSpec::from("#ffffff")
	}
}

/// Triangle fill options for a link group.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TriangleOptions {
	pub enable: bool,
	/// Probability that a newly formed triangle is drawn.
	pub frequency: f64,
	/// Fill opacity; falls back to the link opacity.
	pub opacity: Option<f64>,
	/// Fill color; falls back to the link color.
	pub color: Option<ColorSpec>,
}

impl Default for TriangleOptions {
	fn default() -> Self {
		Self {
			enable: false,
			frequency: 1.0,
			opacity: None,
			color: None,
		}
	}
}

/// Link options carried by every particle.
///
/// Particles only link to particles whose `id` (link group) is equal to
/// their own; `None` is a group of its own.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkOptions {
	pub enable: bool,
	/// Link group identifier.
	pub id: Option<String>,
	/// Maximum link length in CSS pixels.
	pub distance: f64,
	/// Opacity of a zero-length link.
	pub opacity: f64,
	/// Line width in CSS pixels.
	pub width: f64,
	pub color: ColorSpec,
	/// With `color: "random"`, pick one random color for the group.
	pub consent: bool,
	/// With `color: "random"`, pick a new random color on every draw.
	pub blink: bool,
	/// Also link across the right and bottom canvas edges.
	pub warp: bool,
	pub triangles: TriangleOptions,
}

impl Default for LinkOptions {
	fn default() -> Self {
		Self {
			enable: false,
			id: None,
			distance: 100.0,
			opacity: 1.0,
			width: 1.0,
			color: ColorSpec::default(),
			consent: false,
			blink: false,
			warp: false,
			triangles: TriangleOptions::default(),
		}
	}
}

/// Ribbon shape options.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RibbonOptions {
	/// Number of mass points in the chain.
	pub length: RangeValue,
	/// Spacing between consecutive mass points.
	pub distance: RangeValue,
}

impl Default for RibbonOptions {
	fn default() -> Self {
		Self {
			length: RangeValue::Fixed(30.0),
			distance: RangeValue::Fixed(4.0),
		}
	}
}

/// How a particle is drawn and moved.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Shape {
	/// A filled circle moving in a straight line.
	#[default]
	Circle,
	/// A falling ribbon driven by the mass-point integrator.
	Ribbon(RibbonOptions),
}

/// Options shared by a population of particles.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleOptions {
	pub color: ColorSpec,
	/// Color of the reverse side of ribbons.
	pub back_color: Option<ColorSpec>,
	/// Radius in CSS pixels.
	pub size: RangeValue,
	/// Speed in CSS pixels per 1/60 s.
	pub speed: RangeValue,
	pub shape: Shape,
	pub links: LinkOptions,
}

impl Default for ParticleOptions {
	fn default() -> Self {
		Self {
			color: ColorSpec::default(),
			back_color: None,
			size: RangeValue::Range { min: 1.0, max: 3.0 },
			speed: RangeValue::Fixed(1.0),
			shape: Shape::Circle,
			links: LinkOptions::default(),
		}
	}
}

/// An extra population with its own options.
///
/// Particles in a group carry their own link distance instead of the
/// field-wide default.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupOptions {
	pub count: usize,
	pub particles: ParticleOptions,
}

/// Complete options for a particle field.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldOptions {
	/// Canvas width in device pixels.
	pub width: f64,
	/// Canvas height in device pixels.
	pub height: f64,
	/// Device pixels per CSS pixel.
	pub pixel_ratio: f64,
	/// Size of the default population.
	pub count: usize,
	/// RNG seed; a fixed default is used when absent.
	pub seed: Option<u64>,
	pub background: ColorSpec,
	pub particles: ParticleOptions,
	pub groups: Vec<GroupOptions>,
}

impl Default for FieldOptions {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 600.0,
			pixel_ratio: 1.0,
			count: 80,
			seed: None,
			background: ColorSpec::from("#161b22"),
			particles: ParticleOptions::default(),
			groups: Vec::new(),
		}
	}
}

impl FieldOptions {
	/// Parses and validates options from JSON.
	pub fn from_json(json: &str) -> Result<Self, OptionsError> {
		let options: Self = serde_json::from_str(json)?;
		options.validate()?;
		Ok(options)
	}

	/// Rejects values that would make the simulation meaningless.
	///
	/// A link distance of zero is allowed: it disables linking for the
	/// affected particles.
	pub fn validate(&self) -> Result<(), OptionsError> {
		check("width", self.width, self.width > 0.0)?;
		check("height", self.height, self.height > 0.0)?;
		check("pixelRatio", self.pixel_ratio, self.pixel_ratio > 0.0)?;
		validate_particles(&self.particles)?;
		for group in &self.groups {
			validate_particles(&group.particles)?;
		}
		Ok(())
	}
}

/// Upper bound on mass points per ribbon.
pub const MAX_RIBBON_LENGTH: f64 = 1000.0;

fn validate_particles(options: &ParticleOptions) -> Result<(), OptionsError> {
	check_range("particles.size", &options.size, f64::MAX)?;
	check_range("particles.speed", &options.speed, f64::MAX)?;

	let links = &options.links;
	check("particles.links.distance", links.distance, links.distance >= 0.0)?;
	check("particles.links.opacity", links.opacity, links.opacity >= 0.0)?;
	check("particles.links.width", links.width, links.width >= 0.0)?;
	let frequency = links.triangles.frequency;
	check(
		"particles.links.triangles.frequency",
		frequency,
		(0.0..=1.0).contains(&frequency),
	)?;

	if let Shape::Ribbon(ribbon) = &options.shape {
		check_range("particles.shape.length", &ribbon.length, MAX_RIBBON_LENGTH)?;
		check_range("particles.shape.distance", &ribbon.distance, f64::MAX)?;
	}
	Ok(())
}

/// Both ends of `range` must lie in `[0, max]`.
fn check_range(field: &'static str, range: &RangeValue, max: f64) -> Result<(), OptionsError> {
	let low = range.min();
	check(field, low, low >= 0.0)?;
	let high = range.max();
	check(field, high, high <= max)
}

fn check(field: &'static str, value: f64, valid: bool) -> Result<(), OptionsError> {
	if value.is_finite() && valid {
		Ok(())
	} else {
		Err(OptionsError::InvalidValue { field, value })
	}
}

//! Colors and visual theming for the particle field.
//!
//! Link colors are resolved once per link group and cached (see
//! [`super::links::LinkColorRegistry`]); two sentinels survive resolution
//! and are only turned into a concrete color by the renderer.

use rand::Rng;

use super::types::{ColorSpec, FieldOptions};

/// Color value asking for a random color.
pub const RANDOM_COLOR_VALUE: &str = "random";

/// Color value asking for the mid-gray link color.
pub const MID_COLOR_VALUE: &str = "mid";

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	/// Fixed color behind [`LinkColor::Mid`].
	pub const MID_GRAY: Color = Color::rgb(128, 128, 128);

	/// Fallback when a particle color cannot be parsed.
	pub const WHITE: Color = Color::rgb(255, 255, 255);

	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// A uniformly random opaque color.
	pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
		Self::rgb(rng.gen_range(0..=255), rng.gen_range(0..=255), rng.gen_range(0..=255))
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Parses a CSS color string.
	///
	/// Supports `#rgb`, `#rrggbb`, `rgb()`/`rgba()` functional notation and a
	/// small set of named colors. Returns `None` for anything else,
	/// including the `random` and `mid` sentinels.
	pub fn parse(value: &str) -> Option<Color> {
		let value = value.trim();

		if let Some(hex) = value.strip_prefix('#') {
			return parse_hex(hex);
		}

		if value.starts_with("rgb") {
			let nums: Vec<&str> = value
				.trim_start_matches("rgba(")
				.trim_start_matches("rgb(")
				.trim_end_matches(')')
				.split(',')
				.map(str::trim)
				.collect();
			if !(3..=4).contains(&nums.len()) {
				return None;
			}
			let r = nums[0].parse().ok()?;
			let g = nums[1].parse().ok()?;
			let b = nums[2].parse().ok()?;
			let a = match nums.get(3) {
				Some(a) => a.parse().ok()?,
				None => 1.0,
			};
			return Some(Color::rgba(r, g, b, a));
		}

		named(&value.to_ascii_lowercase())
	}
}

fn parse_hex(hex: &str) -> Option<Color> {
	let channel = |s: &str| u8::from_str_radix(s, 16).ok();
	match hex.len() {
		3 => {
			let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
			Some(Color::rgb(digits.next()??, digits.next()??, digits.next()??))
		}
		6 => Some(Color::rgb(
			channel(hex.get(0..2)?)?,
			channel(hex.get(2..4)?)?,
			channel(hex.get(4..6)?)?,
		)),
		_ => None,
	}
}

fn named(name: &str) -> Option<Color> {
	let color = match name {
		"black" => Color::rgb(0, 0, 0),
		"white" => Color::rgb(255, 255, 255),
		"red" => Color::rgb(255, 0, 0),
		"green" => Color::rgb(0, 128, 0),
		"lime" => Color::rgb(0, 255, 0),
		"blue" => Color::rgb(0, 0, 255),
		"yellow" => Color::rgb(255, 255, 0),
		"cyan" | "aqua" => Color::rgb(0, 255, 255),
		"magenta" | "fuchsia" => Color::rgb(255, 0, 255),
		"gray" | "grey" => Color::rgb(128, 128, 128),
		"orange" => Color::rgb(255, 165, 0),
		"purple" => Color::rgb(128, 0, 128),
		"pink" => Color::rgb(255, 192, 203),
		"transparent" => Color::rgba(0, 0, 0, 0.0),
		_ => return None,
	};
	Some(color)
}

/// Converts an option color to a concrete color; `random` yields a fresh
/// random color on every call.
pub fn resolve_color<R: Rng + ?Sized>(spec: &ColorSpec, rng: &mut R) -> Option<Color> {
	match spec.value() {
		RANDOM_COLOR_VALUE => Some(Color::random(rng)),
		value => Color::parse(value),
	}
}

/// Resolved color of a link group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkColor {
	/// A fixed color.
	Rgb(Color),
	/// A new random color on every draw.
	Random,
	/// The fixed mid-gray sentinel.
	Mid,
}

impl LinkColor {
	/// Concrete color for one draw. `random` is only called for
	/// [`LinkColor::Random`].
	pub fn to_color(self, random: impl FnOnce() -> Color) -> Color {
		match self {
			LinkColor::Rgb(color) => color,
			LinkColor::Random => random(),
			LinkColor::Mid => Color::MID_GRAY,
		}
	}
}

/// Field-wide visual style.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: Color,
}

impl Theme {
	pub fn from_options(options: &FieldOptions) -> Self {
		let background = Color::parse(options.background.value()).unwrap_or_else(|| {
			log::warn!(
				"particle-links: unparseable background color {:?}",
				options.background.value()
			);
			Theme::default().background
		});
		Self { background }
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: Color::rgb(22, 27, 34),
		}
	}
}

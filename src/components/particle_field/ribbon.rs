//! Ribbon trails: a chain of point masses dragged behind a falling particle.
//!
//! The chain lives in the particle's local frame with the head pinned to the
//! origin. Each frame the head's travel pulls every trailing point towards
//! its predecessor, the points are integrated, and a single relaxation pass
//! restores the fixed spacing between neighbours. A ribbon that falls past
//! the bottom of the canvas (plus its own length) is reset above the top.

use std::f64::consts::FRAC_PI_4;

use glam::DVec2;
use rand::Rng;

use super::types::{MAX_RIBBON_LENGTH, RibbonOptions};

/// Drag coefficient of every ribbon point.
const RIBBON_DRAG: f64 = 0.05;

/// Lower bound on point mass, keeps zero-size particles integrable.
const MIN_MASS: f64 = 1e-3;

/// A point mass integrated with semi-implicit Euler.
#[derive(Clone, Debug, PartialEq)]
pub struct EulerMass {
	pub position: DVec2,
	pub velocity: DVec2,
	/// Force accumulated since the last integration.
	pub force: DVec2,
	pub mass: f64,
	pub drag: f64,
}

impl EulerMass {
	pub fn new(position: DVec2, mass: f64, drag: f64) -> Self {
		Self {
			position,
			velocity: DVec2::ZERO,
			force: DVec2::ZERO,
			mass: mass.max(MIN_MASS),
			drag,
		}
	}

	pub fn add_force(&mut self, force: DVec2) {
		self.force += force;
	}

	/// Quadratic drag opposing the current velocity.
	fn drag_force(&self) -> DVec2 {
		self.velocity * (self.drag * self.mass * self.velocity.length())
	}

	/// Advances one step: velocity first, then position with the new
	/// velocity. Clears the accumulated force.
	pub fn integrate(&mut self, dt: f64) {
		let acceleration = (self.force - self.drag_force()) / self.mass;
		self.velocity += acceleration * dt;
		self.position += self.velocity * dt;
		self.force = DVec2::ZERO;
	}
}

/// Random motion parameters, redrawn on every reset.
#[derive(Clone, Debug, PartialEq)]
pub struct RibbonMotion {
	/// Scales the head's travel into the trailing force.
	pub velocity_inherit: f64,
	/// Oscillation phase.
	pub time: f64,
	pub oscillation_speed: f64,
	/// Horizontal sway amplitude, px per second.
	pub oscillation_distance: f64,
	/// Fall speed, px per second.
	pub y_speed: f64,
}

impl RibbonMotion {
	pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
		Self {
			velocity_inherit: rng.gen_range(0.0..1.0) * 2.0 + 4.0,
			time: rng.gen_range(0.0..1.0) * 100.0,
			oscillation_speed: rng.gen_range(0.0..1.0) * 2.0 + 1.5,
			oscillation_distance: rng.gen_range(0.0..1.0) * 40.0 + 40.0,
			y_speed: rng.gen_range(0.0..1.0) * 40.0 + 80.0,
		}
	}
}

/// Which side of the ribbon faces the viewer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Face {
	Front,
	Back,
}

/// One filled polygon of a ribbon, in local coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RibbonPolygon {
	pub face: Face,
	pub points: Vec<DVec2>,
}

/// Chain state of a ribbon particle.
#[derive(Clone, Debug, PartialEq)]
pub struct Ribbon {
	/// Index 0 is the head.
	pub steps: Vec<EulerMass>,
	pub length: usize,
	pub step_distance: f64,
	/// Offset of the ribbon's second edge from the chain.
	pub offset: DVec2,
	pub mass: f64,
	pub drag: f64,
	pub motion: RibbonMotion,
	/// Head position at the end of the last frame.
	prev_position: DVec2,
}

impl Ribbon {
	/// Builds a ribbon for a particle of the given radius and size that
	/// starts at `position`.
	pub fn new<R: Rng + ?Sized>(
		options: &RibbonOptions,
		position: DVec2,
		radius: f64,
		size: f64,
		rng: &mut R,
	) -> Self {
		let step_distance = options.distance.sample(rng).max(0.0);
		let length = options.length.sample(rng).clamp(0.0, MAX_RIBBON_LENGTH).round() as usize;

		let mut ribbon = Self {
			steps: Vec::new(),
			length,
			step_distance,
			offset: DVec2::from_angle(FRAC_PI_4) * radius,
			mass: size,
			drag: RIBBON_DRAG,
			motion: RibbonMotion::random(rng),
			prev_position: position,
		};
		ribbon.rebuild_chain();
		ribbon
	}

	/// Lays the chain out as a vertical ladder above the head.
	fn rebuild_chain(&mut self) {
		self.steps = (0..self.length)
			.map(|i| {
				EulerMass::new(
					DVec2::new(0.0, -(i as f64) * self.step_distance),
					self.mass,
					self.drag,
				)
			})
			.collect();
	}

	/// Whether the chain can be integrated this frame.
	pub fn is_ready(&self) -> bool {
		self.length > 0 && self.steps.len() == self.length && self.step_distance > 0.0
	}

	/// Runs one frame for the particle at `position` and returns whether
	/// the ribbon was reset. A chain that is not ready is left untouched.
	pub fn update<R: Rng + ?Sized>(
		&mut self,
		position: &mut DVec2,
		dt: f64,
		canvas: DVec2,
		rng: &mut R,
	) -> bool {
		if !self.is_ready() || dt <= 0.0 {
			return false;
		}

		self.motion.time += dt * self.motion.oscillation_speed;
		position.y += self.motion.y_speed * dt;
		position.x += self.motion.time.cos() * self.motion.oscillation_distance * dt;
		self.steps[0].position = DVec2::ZERO;

		let distance = self.prev_position.distance(*position);
		self.prev_position = *position;

		self.apply_trailing_forces(distance, dt);
		self.integrate(dt);
		self.relax();

		if position.y > canvas.y + self.step_distance * self.length as f64 {
			self.reset(position, canvas, rng);
			return true;
		}
		false
	}

	/// Pulls every trailing point towards its predecessor with a force of
	/// `distance / dt * velocity_inherit`.
	pub fn apply_trailing_forces(&mut self, distance: f64, dt: f64) {
		let magnitude = distance / dt * self.motion.velocity_inherit;
		for i in 1..self.steps.len() {
			let direction =
				(self.steps[i - 1].position - self.steps[i].position).normalize_or_zero();
			self.steps[i].add_force(direction * magnitude);
		}
	}

	/// Integrates every point except the pinned head.
	pub fn integrate(&mut self, dt: f64) {
		for step in self.steps.iter_mut().skip(1) {
			step.integrate(dt);
		}
	}

	/// Places each point exactly `step_distance` from its predecessor,
	/// keeping its direction. Coincident points fall back to trailing
	/// straight up.
	pub fn relax(&mut self) {
		for i in 1..self.steps.len() {
			let previous = self.steps[i - 1].position;
			let direction = (self.steps[i].position - previous)
				.try_normalize()
				.unwrap_or(DVec2::NEG_Y);
			self.steps[i].position = previous + direction * self.step_distance;
		}
	}

	/// Moves the particle above the canvas and starts a fresh chain.
	pub fn reset<R: Rng + ?Sized>(&mut self, position: &mut DVec2, canvas: DVec2, rng: &mut R) {
		position.y = -rng.gen_range(0.0..1.0) * canvas.y;
		position.x = rng.gen_range(0.0..1.0) * canvas.x;
		self.prev_position = *position;
		self.motion = RibbonMotion::random(rng);
		self.rebuild_chain();
		log::trace!("particle-links: ribbon reset at ({:.1}, {:.1})", position.x, position.y);
	}

	/// Filled polygons for the current chain, scaled by `ratio`.
	///
	/// Each segment spans two consecutive chain points and their copies
	/// shifted by [`Ribbon::offset`]. The first and last segments taper into
	/// two triangles; the others are quads.
	pub fn polygons(&self, ratio: f64) -> Vec<RibbonPolygon> {
		let segments = self.steps.len().saturating_sub(1);
		let mut polygons = Vec::with_capacity(segments * 2);

		for i in 0..segments {
			let s0 = self.steps[i].position;
			let s1 = self.steps[i + 1].position;
			let p0 = s0 + self.offset;
			let p1 = s1 + self.offset;

			let face = if side(s0, s1, p1) < 0.0 {
				Face::Front
			} else {
				Face::Back
			};
			let mut push = |points: Vec<DVec2>| {
				polygons.push(RibbonPolygon {
					face,
					points: points.into_iter().map(|p| p * ratio).collect(),
				});
			};

			if i == 0 {
				let mid = (s1 + p1) * 0.5;
				push(vec![s0, s1, mid]);
				push(vec![p1, p0, mid]);
			} else if i == segments - 1 {
				let mid = (s0 + p0) * 0.5;
				push(vec![s0, s1, mid]);
				push(vec![p1, p0, mid]);
			} else {
				push(vec![s0, s1, p1, p0]);
			}
		}
		polygons
	}
}

/// Signed area test: which side of the line `b -> a` the point `c` lies on.
fn side(a: DVec2, b: DVec2, c: DVec2) -> f64 {
	(a.x - b.x) * (c.y - b.y) - (a.y - b.y) * (c.x - b.x)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::particle_field::types::RangeValue;
	use rand::SeedableRng;
	use rand::rngs::SmallRng;

	fn ribbon(length: f64, distance: f64) -> Ribbon {
		let mut rng = SmallRng::seed_from_u64(9);
		let options = RibbonOptions {
			length: RangeValue::Fixed(length),
			distance: RangeValue::Fixed(distance),
		};
		Ribbon::new(&options, DVec2::new(50.0, 10.0), 2.0, 2.0, &mut rng)
	}

	#[test]
	fn test_new_chain_is_a_vertical_ladder() {
		let r = ribbon(5.0, 4.0);
		assert_eq!(r.steps.len(), 5);
		for (i, step) in r.steps.iter().enumerate() {
			assert_eq!(step.position, DVec2::new(0.0, -(i as f64) * 4.0));
			assert_eq!(step.mass, 2.0);
			assert_eq!(step.drag, RIBBON_DRAG);
		}
		assert!((r.offset.x - 2.0 * FRAC_PI_4.cos()).abs() < 1e-12);
	}

	#[test]
	fn test_trailing_force_scales_with_speed() {
		let mut r = ribbon(3.0, 4.0);
		r.motion.velocity_inherit = 5.0;
		r.apply_trailing_forces(2.0, 0.5);

		// Point 1 sits straight above the head, so the pull is +y.
		let force = r.steps[1].force;
		assert!(force.x.abs() < 1e-12);
		assert!((force.y - 2.0 / 0.5 * 5.0).abs() < 1e-9);

		let mut doubled = ribbon(3.0, 4.0);
		doubled.motion.velocity_inherit = 5.0;
		doubled.apply_trailing_forces(4.0, 0.5);
		assert!((doubled.steps[1].force.y - 2.0 * force.y).abs() < 1e-9);
	}

	#[test]
	fn test_integrate_is_semi_implicit_and_clears_force() {
		let mut mass = EulerMass::new(DVec2::ZERO, 2.0, 0.0);
		mass.add_force(DVec2::new(4.0, 0.0));
		mass.integrate(0.5);
		// v = F/m * dt = 1, x = v * dt = 0.5
		assert_eq!(mass.velocity, DVec2::new(1.0, 0.0));
		assert_eq!(mass.position, DVec2::new(0.5, 0.0));
		assert_eq!(mass.force, DVec2::ZERO);
	}

	#[test]
	fn test_drag_slows_points() {
		let mut mass = EulerMass::new(DVec2::ZERO, 1.0, 0.5);
		mass.velocity = DVec2::new(2.0, 0.0);
		mass.integrate(0.1);
		assert!(mass.velocity.x < 2.0 && mass.velocity.x > 0.0);
	}

	#[test]
	fn test_relax_restores_spacing() {
		let mut r = ribbon(6.0, 3.0);
		for (i, step) in r.steps.iter_mut().enumerate() {
			step.position = DVec2::new(i as f64 * 1.7, (i as f64).powi(2) * 0.9);
		}
		r.steps[3].position = r.steps[2].position;
		r.relax();
		for pair in r.steps.windows(2) {
			let gap = pair[0].position.distance(pair[1].position);
			assert!((gap - 3.0).abs() < 1e-9, "gap {gap}");
		}
	}

	#[test]
	fn test_update_keeps_spacing_and_pins_head() {
		let mut rng = SmallRng::seed_from_u64(2);
		let mut r = ribbon(10.0, 4.0);
		let mut position = DVec2::new(50.0, 10.0);
		let canvas = DVec2::new(400.0, 10_000.0);
		for _ in 0..30 {
			assert!(!r.update(&mut position, 1.0 / 60.0, canvas, &mut rng));
		}
		assert_eq!(r.steps[0].position, DVec2::ZERO);
		for pair in r.steps.windows(2) {
			let gap = pair[0].position.distance(pair[1].position);
			assert!((gap - 4.0).abs() < 1e-9);
		}
		assert!(position.y > 10.0);
	}

	#[test]
	fn test_first_frame_pulls_the_tail() {
		let mut rng = SmallRng::seed_from_u64(2);
		let mut r = ribbon(4.0, 4.0);
		let mut position = DVec2::new(50.0, 10.0);
		r.update(&mut position, 1.0 / 60.0, DVec2::new(400.0, 10_000.0), &mut rng);

		// The head moved from its spawn point, so the tail already picked up
		// velocity towards it.
		assert!(position.distance(DVec2::new(50.0, 10.0)) > 0.0);
		assert!(r.steps[1].velocity.y > 0.0);
	}

	#[test]
	fn test_reset_past_bottom_edge() {
		let mut rng = SmallRng::seed_from_u64(4);
		let mut r = ribbon(5.0, 4.0);
		let canvas = DVec2::new(300.0, 200.0);
		// Threshold is 200 + 4 * 5.
		let mut position = DVec2::new(100.0, 219.9);
		r.motion.y_speed = 100.0;

		assert!(r.update(&mut position, 0.1, canvas, &mut rng));
		assert!(position.y <= 0.0 && position.y > -200.0);
		assert!(position.x >= 0.0 && position.x < 300.0);
		for (i, step) in r.steps.iter().enumerate() {
			assert_eq!(step.position, DVec2::new(0.0, -(i as f64) * 4.0));
		}
	}

	#[test]
	fn test_missing_chain_is_a_no_op() {
		let mut rng = SmallRng::seed_from_u64(4);
		let mut empty = ribbon(0.0, 4.0);
		let mut flat = ribbon(5.0, 0.0);
		let mut position = DVec2::new(10.0, 10.0);
		let canvas = DVec2::new(100.0, 100.0);

		assert!(!empty.update(&mut position, 0.1, canvas, &mut rng));
		assert!(!flat.update(&mut position, 0.1, canvas, &mut rng));
		assert_eq!(position, DVec2::new(10.0, 10.0));
		assert!(empty.polygons(1.0).is_empty());
	}

	#[test]
	fn test_polygons_taper_at_both_ends() {
		let r = ribbon(4.0, 4.0);
		let polygons = r.polygons(2.0);
		// Three segments: 2 + 1 + 2.
		let sizes: Vec<usize> = polygons.iter().map(|p| p.points.len()).collect();
		assert_eq!(sizes, vec![3, 3, 4, 3, 3]);
		assert_eq!(polygons[0].points[0], DVec2::ZERO);
		assert_eq!(polygons[0].points[1], DVec2::new(0.0, -8.0));
	}

	#[test]
	fn test_side_flips_with_orientation() {
		let a = DVec2::new(0.0, 0.0);
		let b = DVec2::new(0.0, -1.0);
		assert!(side(a, b, DVec2::new(1.0, -1.0)) < 0.0);
		assert!(side(a, b, DVec2::new(-1.0, -1.0)) > 0.0);
	}
}

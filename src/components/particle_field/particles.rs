//! Particle registry and per-frame motion.

use std::collections::HashMap;
use std::f64::consts::TAU;

use glam::DVec2;
use rand::Rng;

use super::ribbon::Ribbon;
use super::scale::ScaledValues;
use super::theme::{Color, resolve_color};
use super::types::{LinkOptions, ParticleOptions, Shape};

/// Stable particle identity. Never reused within a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(u32);

/// A single particle.
#[derive(Clone, Debug)]
pub struct Particle {
	pub id: ParticleId,
	/// Canvas position in device pixels.
	pub position: DVec2,
	/// Device pixels per 1/60 s.
	pub velocity: DVec2,
	pub radius: f64,
	/// Unscaled size; the mass of ribbon points.
	pub size: f64,
	pub color: Color,
	pub back_color: Option<Color>,
	pub links: LinkOptions,
	/// Own link distance in device pixels; `None` uses the field default.
	pub links_distance: Option<f64>,
	pub destroyed: bool,
	/// Not yet visible to other particles' links.
	pub spawning: bool,
	pub ribbon: Option<Ribbon>,
}

impl Particle {
	fn new(id: ParticleId, position: DVec2) -> Self {
		Self {
			id,
			position,
			velocity: DVec2::ZERO,
			radius: 1.0,
			size: 1.0,
			color: Color::WHITE,
			back_color: None,
			links: LinkOptions::default(),
			links_distance: None,
			destroyed: false,
			spawning: false,
			ribbon: None,
		}
	}

	pub fn with_links(&mut self, links: LinkOptions) -> &mut Self {
		self.links = links;
		self
	}

	pub fn with_links_distance(&mut self, distance: f64) -> &mut Self {
		self.links_distance = Some(distance);
		self
	}

	pub fn with_velocity(&mut self, velocity: DVec2) -> &mut Self {
		self.velocity = velocity;
		self
	}

	/// Link distance in device pixels, given the field default.
	pub fn link_distance(&self, default: f64) -> f64 {
		self.links_distance.unwrap_or(default)
	}
}

/// Owns every particle of a field.
///
/// Particles are kept in insertion order; the id index is rebuilt whenever
/// particles are removed.
#[derive(Debug, Default)]
pub struct ParticleSystem {
	particles: Vec<Particle>,
	index: HashMap<ParticleId, usize>,
	next_id: u32,
}

impl ParticleSystem {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a plain particle at `position` and returns it for configuration.
	pub fn add(&mut self, position: DVec2) -> &mut Particle {
		let id = ParticleId(self.next_id);
		self.next_id += 1;
		self.index.insert(id, self.particles.len());
		self.particles.push(Particle::new(id, position));
		let last = self.particles.len() - 1;
		&mut self.particles[last]
	}

	/// Creates a particle from population options at a random canvas
	/// position.
	pub fn spawn<R: Rng + ?Sized>(
		&mut self,
		options: &ParticleOptions,
		links_distance: Option<f64>,
		canvas: DVec2,
		scale: &ScaledValues,
		rng: &mut R,
	) -> ParticleId {
		let position = DVec2::new(
			rng.gen_range(0.0..1.0) * canvas.x,
			rng.gen_range(0.0..1.0) * canvas.y,
		);
		self.spawn_at(options, position, links_distance, scale, rng)
	}

	/// Creates a particle from population options at `position`.
	pub fn spawn_at<R: Rng + ?Sized>(
		&mut self,
		options: &ParticleOptions,
		position: DVec2,
		links_distance: Option<f64>,
		scale: &ScaledValues,
		rng: &mut R,
	) -> ParticleId {
		let size = options.size.sample(rng);
		let speed = scale.to_device(options.speed.sample(rng));
		let angle = rng.gen_range(0.0..TAU);

		let color = resolve_color(&options.color, rng).unwrap_or_else(|| {
			log::warn!("particle-links: unparseable particle color {:?}", options.color.value());
			Color::WHITE
		});
		let back_color = options.back_color.as_ref().and_then(|spec| resolve_color(spec, rng));
		let ribbon = match &options.shape {
			Shape::Circle => None,
			Shape::Ribbon(ribbon) => {
				Some(Ribbon::new(ribbon, position, scale.to_device(size), size, rng))
			}
		};

		let particle = self.add(position);
		particle.velocity = DVec2::from_angle(angle) * speed;
		particle.size = size;
		particle.radius = scale.to_device(size);
		particle.color = color;
		particle.back_color = back_color;
		particle.links = options.links.clone();
		particle.links_distance = links_distance;
		particle.ribbon = ribbon;
		particle.id
	}

	pub fn get(&self, id: ParticleId) -> Option<&Particle> {
		self.index.get(&id).map(|&i| &self.particles[i])
	}

	pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut Particle> {
		let i = *self.index.get(&id)?;
		Some(&mut self.particles[i])
	}

	pub fn iter(&self) -> impl Iterator<Item = &Particle> {
		self.particles.iter()
	}

	pub fn len(&self) -> usize {
		self.particles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.particles.is_empty()
	}

	/// Marks a particle destroyed. It stays in place until
	/// [`ParticleSystem::remove_destroyed`] runs.
	pub fn destroy(&mut self, id: ParticleId) -> bool {
		match self.get_mut(id) {
			Some(particle) => {
				particle.destroyed = true;
				true
			}
			None => false,
		}
	}

	/// Removes destroyed particles and returns their ids.
	pub fn remove_destroyed(&mut self) -> Vec<ParticleId> {
		let removed: Vec<ParticleId> = self
			.particles
			.iter()
			.filter(|p| p.destroyed)
			.map(|p| p.id)
			.collect();
		if !removed.is_empty() {
			self.particles.retain(|p| !p.destroyed);
			self.reindex();
		}
		removed
	}

	/// Ends the spawning phase of every particle.
	pub fn finish_spawning(&mut self) {
		for p in &mut self.particles {
			p.spawning = false;
		}
	}

	pub fn clear(&mut self) {
		self.particles.clear();
		self.index.clear();
	}

	/// Advances every particle by `dt` seconds and returns how many ribbons
	/// were reset.
	///
	/// Ribbon particles are moved by their integrator; all others move in a
	/// straight line and wrap around the canvas edges.
	pub fn update<R: Rng + ?Sized>(&mut self, dt: f64, canvas: DVec2, rng: &mut R) -> usize {
		let mut resets = 0;
		for p in &mut self.particles {
			if let Some(ribbon) = p.ribbon.as_mut() {
				if ribbon.update(&mut p.position, dt, canvas, rng) {
					resets += 1;
				}
				continue;
			}

			p.position += p.velocity * dt * 60.0;

			// Wrap around canvas edges
			let margin = p.radius;
			if p.position.x < -margin {
				p.position.x = canvas.x + margin;
			} else if p.position.x > canvas.x + margin {
				p.position.x = -margin;
			}
			if p.position.y < -margin {
				p.position.y = canvas.y + margin;
			} else if p.position.y > canvas.y + margin {
				p.position.y = -margin;
			}
		}
		resets
	}

	fn reindex(&mut self) {
		self.index = self
			.particles
			.iter()
			.enumerate()
			.map(|(i, p)| (p.id, i))
			.collect();
	}
}

//! Field simulation state and the per-frame update pipeline.
//!
//! A frame runs to completion in four phases before anything is drawn:
//! particles move, the quadtree is rebuilt from the new positions, every
//! eligible particle reconciles its links against that snapshot, and
//! destroyed particles are dropped together with their links.

use glam::DVec2;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::linker::Linker;
use super::links::LinkGraph;
use super::particles::{ParticleId, ParticleSystem};
use super::quadtree::QuadTree;
use super::scale::ScaledValues;
use super::theme::Theme;
use super::types::{FieldOptions, ParticleOptions};

/// Seed used when the options do not carry one.
const DEFAULT_SEED: u64 = 0x5eed_1ea5;

/// Core field state.
///
/// Created once when the component mounts, then advanced each frame by the
/// animation loop through [`FieldState::tick`].
pub struct FieldState {
	pub particles: ParticleSystem,
	pub links: LinkGraph,
	pub linker: Linker,
	pub theme: Theme,
	pub scale: ScaledValues,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	/// Seconds simulated since the last reset.
	pub time: f64,
	options: FieldOptions,
	tree: QuadTree,
	rng: SmallRng,
}

impl FieldState {
	pub fn new(options: FieldOptions) -> Self {
		let scale = ScaledValues::new(&options);
		let mut state = Self {
			particles: ParticleSystem::new(),
			links: LinkGraph::new(),
			linker: Linker::new(scale.links_distance),
			theme: Theme::from_options(&options),
			scale,
			width: options.width,
			height: options.height,
			animation_running: true,
			time: 0.0,
			rng: SmallRng::seed_from_u64(options.seed.unwrap_or(DEFAULT_SEED)),
			tree: QuadTree::default(),
			options,
		};
		state.populate();
		info!(
			"particle-links: field ready, {} particles on {}x{}",
			state.particles.len(),
			state.width,
			state.height
		);
		state
	}

	pub fn options(&self) -> &FieldOptions {
		&self.options
	}

	/// The quadtree built during the last tick.
	pub fn tree(&self) -> &QuadTree {
		&self.tree
	}

	pub fn canvas_size(&self) -> DVec2 {
		DVec2::new(self.width, self.height)
	}

	fn populate(&mut self) {
		let canvas = self.canvas_size();
		for _ in 0..self.options.count {
			self.particles.spawn(
				&self.options.particles,
				None,
				canvas,
				&self.scale,
				&mut self.rng,
			);
		}
		for group in &self.options.groups {
			let distance = self.scale.to_device(group.particles.links.distance);
			for _ in 0..group.count {
				self.particles.spawn(
					&group.particles,
					Some(distance),
					canvas,
					&self.scale,
					&mut self.rng,
				);
			}
		}
	}

	/// Adds a particle at `position`. It takes part in linking from the
	/// next frame on, with the link distance from its own options like a
	/// group particle.
	pub fn add_particle(&mut self, position: DVec2, options: &ParticleOptions) -> ParticleId {
		let distance = self.scale.to_device(options.links.distance);
		let id = self
			.particles
			.spawn_at(options, position, Some(distance), &self.scale, &mut self.rng);
		if let Some(particle) = self.particles.get_mut(id) {
			particle.spawning = true;
		}
		id
	}

	/// Marks a particle destroyed; it is removed at the end of the next
	/// frame.
	pub fn destroy(&mut self, id: ParticleId) -> bool {
		self.particles.destroy(id)
	}

	/// Advances the field by `dt` seconds.
	pub fn tick(&mut self, dt: f64) {
		let canvas = self.canvas_size();

		self.particles.update(dt, canvas, &mut self.rng);

		self.tree = QuadTree::build(self.particles.iter().map(|p| (p.position, p.id)));

		self.linker.link_all(
			&self.particles,
			&self.tree,
			canvas,
			&mut self.links,
			&mut self.rng,
		);

		for id in self.particles.remove_destroyed() {
			self.links.remove_links_of(id);
		}
		self.particles.finish_spawning();

		self.time += dt;
	}

	/// Drops every particle, link, triangle and cached link color, then
	/// seeds a fresh population from the options.
	pub fn reset(&mut self) {
		self.links.clear();
		self.particles.clear();
		self.tree = QuadTree::default();
		self.time = 0.0;
		self.populate();
		info!(
			"particle-links: field reset, {} particles",
			self.particles.len()
		);
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		debug!("particle-links: resize {}x{} -> {}x{}", self.width, self.height, width, height);
		self.width = width;
		self.height = height;
		self.options.width = width;
		self.options.height = height;
		self.reset();
	}
}

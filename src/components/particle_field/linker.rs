//! Per-particle link reconciliation and triangle derivation.
//!
//! [`Linker::interact`] brings one particle's links in line with the
//! neighbours the quadtree reports for the current frame:
//!
//! 1. stale links (other endpoint out of range in both directions) are pruned
//! 2. every candidate is linked, updated or unlinked by its distance
//! 3. triangles are derived from adjacent links when enabled
//!
//! Opacity falls off linearly from the group's base opacity at distance zero
//! to nothing at the link distance.

use std::collections::HashSet;

use glam::DVec2;
use rand::Rng;

use super::links::{LinkGraph, Triangle};
use super::particles::{Particle, ParticleId, ParticleSystem};
use super::quadtree::{QuadTree, QueryShape, wrap_offsets};
use super::theme::{Color, LinkColor, MID_COLOR_VALUE, RANDOM_COLOR_VALUE};
use super::types::LinkOptions;

/// Drives link reconciliation for a field.
#[derive(Clone, Debug, PartialEq)]
pub struct Linker {
	/// Link distance in device pixels for particles without their own.
	pub links_distance: f64,
}

impl Linker {
	pub fn new(links_distance: f64) -> Self {
		Self { links_distance }
	}

	/// Effective link distance of `particle` in device pixels.
	pub fn link_distance(&self, particle: &Particle) -> f64 {
		particle.link_distance(self.links_distance)
	}

	/// Whether `particle` links at all. A zero or non-finite distance
	/// disables linking.
	pub fn is_enabled(&self, particle: &Particle) -> bool {
		let distance = self.link_distance(particle);
		particle.links.enable && distance.is_finite() && distance > 0.0
	}

	/// Enabled and alive.
	pub fn is_eligible(&self, particle: &Particle) -> bool {
		!particle.destroyed && !particle.spawning && self.is_enabled(particle)
	}

	pub fn query_shape(&self, particle: &Particle, canvas: DVec2) -> QueryShape {
		let radius = self.link_distance(particle);
		if particle.links.warp {
			QueryShape::warp(particle.position, radius, canvas)
		} else {
			QueryShape::circle(particle.position, radius)
		}
	}

	/// Runs [`Linker::interact`] for every eligible particle, in registry
	/// order.
	pub fn link_all<R: Rng + ?Sized>(
		&self,
		particles: &ParticleSystem,
		tree: &QuadTree,
		canvas: DVec2,
		graph: &mut LinkGraph,
		rng: &mut R,
	) {
		for particle in particles.iter().filter(|p| self.is_eligible(p)) {
			self.interact(particle, particles, tree, canvas, graph, rng);
		}
	}

	/// Reconciles the links of `p1` against this frame's neighbours.
	pub fn interact<R: Rng + ?Sized>(
		&self,
		p1: &Particle,
		particles: &ParticleSystem,
		tree: &QuadTree,
		canvas: DVec2,
		graph: &mut LinkGraph,
		rng: &mut R,
	) {
		if !self.is_enabled(p1) {
			return;
		}
		let max = self.link_distance(p1);
		let mut candidates = tree.query(&self.query_shape(p1, canvas));
		candidates.sort_unstable();

		self.prune(p1, &candidates, particles, canvas, graph);

		for &id in &candidates {
			if id == p1.id {
				continue;
			}
			let Some(p2) = particles.get(id) else {
				continue;
			};

			if !self.is_eligible(p2) {
				graph.remove_links_of(id);
				continue;
			}
			if p1.links.id != p2.links.id {
				if let Some(index) = graph.find_link_index(p1.id, id) {
					graph.remove_link_at(index);
				}
				continue;
			}

			let (distance, _) = warped_distance(p1.position, p2.position, max, p1.links.warp, canvas);
			let opacity = link_opacity(distance, max, p1.links.opacity);

			match graph.find_link_index(p1.id, id) {
				Some(index) if opacity <= 0.0 => {
					graph.remove_link_at(index);
				}
				Some(index) => {
					if let Some(link) = graph.link_mut(index) {
						link.opacity = opacity;
					}
				}
				None if opacity > 0.0 => {
					let color = graph
						.colors
						.get_or_resolve(p1.links.id.as_deref(), || resolve_link_color(&p1.links, &mut *rng));
					graph.add_link(p1.id, id, opacity, Some(color));
				}
				None => {}
			}
		}

		if p1.links.triangles.enable {
			derive_triangles(p1, graph, rng);
		}
	}

	/// Endpoints to draw the link between `p1` and `p2` at. The segment is
	/// measured from `p1`; when that stays beyond `p1`'s reach and `p2`
	/// wraps, it is measured from `p2` instead, so a link kept alive by
	/// `p2` crosses the edge `p2` wraps over.
	pub fn link_segment(&self, p1: &Particle, p2: &Particle, canvas: DVec2) -> (DVec2, DVec2) {
		let max = self.link_distance(p1);
		let (distance, end) = warped_distance(p1.position, p2.position, max, p1.links.warp, canvas);
		if distance <= max || !p2.links.warp {
			return (p1.position, end);
		}
		let (reverse, start) =
			warped_distance(p2.position, p1.position, self.link_distance(p2), true, canvas);
		if reverse < distance {
			(p2.position, start)
		} else {
			(p1.position, end)
		}
	}

	/// Drops links of `p1` whose other endpoint is neither a candidate nor
	/// itself in reach of `p1`.
	fn prune(
		&self,
		p1: &Particle,
		candidates: &[ParticleId],
		particles: &ParticleSystem,
		canvas: DVec2,
		graph: &mut LinkGraph,
	) {
		let candidates: HashSet<ParticleId> = candidates.iter().copied().collect();
		let stale: Vec<[ParticleId; 2]> = graph
			.links_of(p1.id)
			.filter(|link| {
				let Some(other) = link.other(p1.id) else {
					return false;
				};
				if candidates.contains(&other) {
					return false;
				}
				!particles
					.get(other)
					.is_some_and(|p2| self.reaches(p2, p1, canvas))
			})
			.map(|link| link.edges)
			.collect();

		for edges in stale {
			graph.remove_exact_link(edges);
		}
	}

	/// Whether `from` would itself link `to` this frame.
	fn reaches(&self, from: &Particle, to: &Particle, canvas: DVec2) -> bool {
		self.is_eligible(from)
			&& from.links.id == to.links.id
			&& self.query_shape(from, canvas).contains(to.position)
	}
}

/// Distance from `from` to `to`, trying the right, bottom-right and bottom
/// wrap translations in turn while the direct distance exceeds `max`.
///
/// Returns the distance and the (possibly translated) endpoint it was
/// measured to. Only the right and bottom canvas edges wrap.
pub fn warped_distance(from: DVec2, to: DVec2, max: f64, warp: bool, canvas: DVec2) -> (f64, DVec2) {
	let mut endpoint = to;
	let mut distance = from.distance(to);
	if warp {
		for offset in wrap_offsets(canvas) {
			if distance <= max {
				break;
			}
			endpoint = to - offset;
			distance = from.distance(endpoint);
		}
	}
	(distance, endpoint)
}

/// Linear falloff: `base` at distance zero, zero at `max`.
pub fn link_opacity(distance: f64, max: f64, base: f64) -> f64 {
	base - distance * base / max
}

/// Resolves the link color of a group from its options.
///
/// `random` becomes one fixed random color with `consent`, a per-draw
/// random color with `blink`, and mid-gray otherwise.
pub fn resolve_link_color<R: Rng + ?Sized>(options: &LinkOptions, rng: &mut R) -> LinkColor {
	match options.color.value() {
		RANDOM_COLOR_VALUE if options.consent => LinkColor::Rgb(Color::random(rng)),
		RANDOM_COLOR_VALUE if options.blink => LinkColor::Random,
		RANDOM_COLOR_VALUE | MID_COLOR_VALUE => LinkColor::Mid,
		value => match Color::parse(value) {
			Some(color) => LinkColor::Rgb(color),
			None => {
				log::warn!(
					"particle-links: unparseable link color {value:?} for group {:?}",
					options.id
				);
				LinkColor::Mid
			}
		},
	}
}

/// Creates or removes triangles over adjacent pairs of `p1`'s links.
///
/// Only links next to each other in storage order are paired, so not every
/// closed 3-cycle through `p1` gets a triangle.
fn derive_triangles<R: Rng + ?Sized>(p1: &Particle, graph: &mut LinkGraph, rng: &mut R) {
	let options = &p1.links.triangles;
	let neighbours: Vec<ParticleId> = graph
		.links_of(p1.id)
		.filter_map(|link| link.other(p1.id))
		.collect();

	for pair in neighbours.windows(2) {
		let (p2, p3) = (pair[0], pair[1]);
		let closed = graph.find_link(p2, p3).is_some();
		match (closed, graph.find_triangle_index(p1.id, p2, p3)) {
			(true, None) => {
				let visible = rng.gen_range(0.0..1.0) > 1.0 - options.frequency;
				graph.add_triangle(Triangle {
					vertices: [p1.id, p2, p3],
					opacity: options.opacity.unwrap_or(p1.links.opacity),
					visible,
				});
			}
			(false, Some(index)) => {
				graph.remove_triangle_at(index);
			}
			_ => {}
		}
	}
}

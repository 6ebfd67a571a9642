//! Region quadtree for per-frame neighbour queries.
//!
//! The tree is rebuilt from scratch once per frame from the current particle
//! positions, before any particle queries it, so every query in a frame sees
//! the same snapshot. Queries take a [`QueryShape`]: a circle, or a circle
//! that also reaches across the right and bottom canvas edges.

use glam::DVec2;

use super::particles::ParticleId;

/// Items held by a leaf before it splits.
const NODE_CAPACITY: usize = 4;

/// Depth at which leaves stop splitting (guards against stacked points).
const MAX_DEPTH: usize = 12;

/// Axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	pub min: DVec2,
	pub max: DVec2,
}

/// Area searched by a neighbour query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryShape {
	/// Points within `radius` of `center`.
	Circle { center: DVec2, radius: f64 },
	/// Like `Circle`, but a point also matches when shifting it left by the
	/// canvas width, up by the canvas height, or both, brings it in range.
	/// Only the right and bottom edges wrap.
	Warp {
		center: DVec2,
		radius: f64,
		canvas: DVec2,
	},
}

impl QueryShape {
	pub fn circle(center: DVec2, radius: f64) -> Self {
		QueryShape::Circle { center, radius }
	}

	pub fn warp(center: DVec2, radius: f64, canvas: DVec2) -> Self {
		QueryShape::Warp {
			center,
			radius,
			canvas,
		}
	}

	/// Whether `point` lies inside the shape (boundary included).
	pub fn contains(&self, point: DVec2) -> bool {
		match *self {
			QueryShape::Circle { center, radius } => circle_contains(center, radius, point),
			QueryShape::Warp {
				center,
				radius,
				canvas,
			} => {
				circle_contains(center, radius, point)
					|| wrap_offsets(canvas)
						.iter()
						.any(|offset| circle_contains(center, radius, point - *offset))
			}
		}
	}

	/// Whether the shape reaches into `rect`.
	pub fn intersects(&self, rect: &Rect) -> bool {
		match *self {
			QueryShape::Circle { center, radius } => circle_intersects(center, radius, rect),
			QueryShape::Warp {
				center,
				radius,
				canvas,
			} => {
				circle_intersects(center, radius, rect)
					|| wrap_offsets(canvas)
						.iter()
						.any(|offset| circle_intersects(center + *offset, radius, rect))
			}
		}
	}
}

/// Translations tried by warp queries, in order: right, bottom-right, bottom.
pub fn wrap_offsets(canvas: DVec2) -> [DVec2; 3] {
	[
		DVec2::new(canvas.x, 0.0),
		canvas,
		DVec2::new(0.0, canvas.y),
	]
}

fn circle_contains(center: DVec2, radius: f64, point: DVec2) -> bool {
	center.distance_squared(point) <= radius * radius
}

fn circle_intersects(center: DVec2, radius: f64, rect: &Rect) -> bool {
	let closest = center.clamp(rect.min, rect.max);
	center.distance_squared(closest) <= radius * radius
}

#[derive(Debug)]
struct Node {
	bounds: Rect,
	children: Option<[usize; 4]>,
	/// Indices into `QuadTree::points`; empty for inner nodes.
	items: Vec<usize>,
}

/// A quadtree over particle positions.
#[derive(Debug)]
pub struct QuadTree {
	nodes: Vec<Node>,
	points: Vec<(DVec2, ParticleId)>,
}

impl Default for QuadTree {
	fn default() -> Self {
		Self::build(std::iter::empty())
	}
}

impl QuadTree {
	/// Builds a tree over the given positions. Non-finite positions are
	/// left out.
	pub fn build(points: impl IntoIterator<Item = (DVec2, ParticleId)>) -> Self {
		let points: Vec<(DVec2, ParticleId)> = points
			.into_iter()
			.filter(|(position, _)| position.is_finite())
			.collect();

		// Bounding square with some padding
		let (mut min, mut max) = points.iter().fold(
			(DVec2::splat(f64::MAX), DVec2::splat(f64::MIN)),
			|(min, max), (position, _)| (min.min(*position), max.max(*position)),
		);
		if points.is_empty() {
			(min, max) = (DVec2::ZERO, DVec2::ZERO);
		}
		let padding = ((max - min).max_element() * 0.1).max(1.0);
		let width = (max - min).max_element() + padding * 2.0;
		let center = (min + max) / 2.0;
		let bounds = Rect {
			min: center - width / 2.0,
			max: center + width / 2.0,
		};

		let mut nodes = Vec::with_capacity(points.len() / NODE_CAPACITY * 2 + 1);
		let mut builder = TreeBuilder {
			points: &points,
			nodes: &mut nodes,
		};
		let indices: Vec<usize> = (0..points.len()).collect();
		builder.build_node(indices, bounds, 0);

		Self { nodes, points }
	}

	/// Ids of every point inside `shape`, in no particular order.
	pub fn query(&self, shape: &QueryShape) -> Vec<ParticleId> {
		let mut found = Vec::new();
		let mut stack = vec![0];

		while let Some(i) = stack.pop() {
			let Some(node) = self.nodes.get(i) else {
				continue;
			};
			if !shape.intersects(&node.bounds) {
				continue;
			}
			match node.children {
				Some(children) => stack.extend(children),
				None => found.extend(
					node.items
						.iter()
						.map(|&item| self.points[item])
						.filter(|(position, _)| shape.contains(*position))
						.map(|(_, id)| id),
				),
			}
		}
		found
	}

	pub fn len(&self) -> usize {
		self.points.len()
	}

	pub fn is_empty(&self) -> bool {
		self.points.is_empty()
	}
}

struct TreeBuilder<'a> {
	points: &'a [(DVec2, ParticleId)],
	nodes: &'a mut Vec<Node>,
}

impl TreeBuilder<'_> {
	fn build_node(&mut self, indices: Vec<usize>, bounds: Rect, depth: usize) -> usize {
		let node_idx = self.nodes.len();

		if indices.len() <= NODE_CAPACITY || depth >= MAX_DEPTH {
			self.nodes.push(Node {
				bounds,
				children: None,
				items: indices,
			});
			return node_idx;
		}

		self.nodes.push(Node {
			bounds,
			children: None,
			items: Vec::new(),
		});

		// Subdivide into quadrants
		let mid = (bounds.min + bounds.max) / 2.0;
		let mut quadrants: [Vec<usize>; 4] = Default::default();
		for i in indices {
			let position = self.points[i].0;
			let quadrant = usize::from(position.x >= mid.x) + 2 * usize::from(position.y >= mid.y);
			quadrants[quadrant].push(i);
		}

		let [nw, ne, sw, se] = quadrants;
		let children = [
			self.build_node(nw, Rect { min: bounds.min, max: mid }, depth + 1),
			self.build_node(
				ne,
				Rect {
					min: DVec2::new(mid.x, bounds.min.y),
					max: DVec2::new(bounds.max.x, mid.y),
				},
				depth + 1,
			),
			self.build_node(
				sw,
				Rect {
					min: DVec2::new(bounds.min.x, mid.y),
					max: DVec2::new(mid.x, bounds.max.y),
				},
				depth + 1,
			),
			self.build_node(se, Rect { min: mid, max: bounds.max }, depth + 1),
		];
		self.nodes[node_idx].children = Some(children);

		node_idx
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::particle_field::particles::ParticleSystem;
	use rand::rngs::SmallRng;
	use rand::{Rng, SeedableRng};

	fn random_points(n: usize, size: f64, seed: u64) -> Vec<(DVec2, ParticleId)> {
		let mut rng = SmallRng::seed_from_u64(seed);
		let mut system = ParticleSystem::new();
		(0..n)
			.map(|_| {
				let position = DVec2::new(rng.gen_range(0.0..size), rng.gen_range(0.0..size));
				(position, system.add(position).id)
			})
			.collect()
	}

	fn brute_force(points: &[(DVec2, ParticleId)], shape: &QueryShape) -> Vec<ParticleId> {
		let mut ids: Vec<ParticleId> = points
			.iter()
			.filter(|(p, _)| shape.contains(*p))
			.map(|(_, id)| *id)
			.collect();
		ids.sort();
		ids
	}

	#[test]
	fn test_empty_tree() {
		let tree = QuadTree::default();
		assert!(tree.is_empty());
		assert!(tree.query(&QueryShape::circle(DVec2::ZERO, 100.0)).is_empty());
	}

	#[test]
	fn test_circle_query_matches_brute_force() {
		let points = random_points(500, 1000.0, 7);
		let tree = QuadTree::build(points.clone());
		assert_eq!(tree.len(), 500);

		for (center, _) in points.iter().step_by(37) {
			let shape = QueryShape::circle(*center, 80.0);
			let mut found = tree.query(&shape);
			found.sort();
			assert_eq!(found, brute_force(&points, &shape));
		}
	}

	#[test]
	fn test_warp_query_matches_brute_force() {
		let points = random_points(400, 500.0, 13);
		let tree = QuadTree::build(points.clone());
		let canvas = DVec2::new(500.0, 500.0);

		for center in [DVec2::new(5.0, 5.0), DVec2::new(3.0, 250.0), DVec2::new(250.0, 8.0)] {
			let shape = QueryShape::warp(center, 60.0, canvas);
			let mut found = tree.query(&shape);
			found.sort();
			assert_eq!(found, brute_force(&points, &shape));
		}
	}

	#[test]
	fn test_warp_reaches_right_and_bottom_only() {
		let canvas = DVec2::new(100.0, 100.0);
		let shape = QueryShape::warp(DVec2::new(2.0, 2.0), 10.0, canvas);
		assert!(shape.contains(DVec2::new(95.0, 95.0)));
		assert!(shape.contains(DVec2::new(97.0, 2.0)));
		assert!(shape.contains(DVec2::new(2.0, 97.0)));

		let shape = QueryShape::warp(DVec2::new(95.0, 95.0), 10.0, canvas);
		assert!(!shape.contains(DVec2::new(2.0, 2.0)));
	}

	#[test]
	fn test_stacked_points_terminate() {
		let mut system = ParticleSystem::new();
		let points: Vec<_> = (0..50)
			.map(|_| (DVec2::new(10.0, 10.0), system.add(DVec2::new(10.0, 10.0)).id))
			.collect();
		let tree = QuadTree::build(points);
		assert_eq!(tree.query(&QueryShape::circle(DVec2::new(10.0, 10.0), 0.0)).len(), 50);
	}

	#[test]
	fn test_non_finite_positions_are_skipped() {
		let mut system = ParticleSystem::new();
		let good = system.add(DVec2::new(1.0, 1.0)).id;
		let bad = system.add(DVec2::new(f64::NAN, 1.0)).id;
		let tree = QuadTree::build([(DVec2::new(1.0, 1.0), good), (DVec2::new(f64::NAN, 1.0), bad)]);
		assert_eq!(tree.len(), 1);
		assert_eq!(tree.query(&QueryShape::circle(DVec2::ONE, 5.0)), vec![good]);
	}
}

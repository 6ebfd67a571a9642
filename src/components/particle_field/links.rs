//! Authoritative link and triangle collections.
//!
//! [`LinkGraph::links_of`] yields a particle's links in creation order
//! because triangle derivation walks them pairwise. At most one link
//! exists per unordered particle pair. Removing a link by any path also
//! removes every triangle built on it.

use std::collections::HashMap;

use super::particles::ParticleId;
use super::theme::LinkColor;

/// A line between two particles.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
	/// The particle whose pass created the link comes first.
	pub edges: [ParticleId; 2],
	/// Opacity for the current frame, in `(0, 1]`.
	pub opacity: f64,
	/// Color resolved when the link was created.
	pub color: Option<LinkColor>,
}

impl Link {
	/// Whether the link joins `a` and `b`, in either order.
	pub fn connects(&self, a: ParticleId, b: ParticleId) -> bool {
		self.edges == [a, b] || self.edges == [b, a]
	}

	pub fn touches(&self, particle: ParticleId) -> bool {
		self.edges.contains(&particle)
	}

	/// The endpoint that is not `particle`.
	pub fn other(&self, particle: ParticleId) -> Option<ParticleId> {
		match self.edges {
			[a, b] if a == particle => Some(b),
			[a, b] if b == particle => Some(a),
			_ => None,
		}
	}
}

/// A filled triangle over three pairwise-linked particles.
#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
	pub vertices: [ParticleId; 3],
	pub opacity: f64,
	/// Drawn at creation and kept for the triangle's lifetime.
	pub visible: bool,
}

impl Triangle {
	/// Vertex-set equality, order ignored.
	pub fn has_vertices(&self, a: ParticleId, b: ParticleId, c: ParticleId) -> bool {
		[a, b, c].iter().all(|v| self.vertices.contains(v))
	}
}

fn pair_key(a: ParticleId, b: ParticleId) -> (ParticleId, ParticleId) {
	if a <= b { (a, b) } else { (b, a) }
}

fn triangle_key(a: ParticleId, b: ParticleId, c: ParticleId) -> [ParticleId; 3] {
	let mut key = [a, b, c];
	key.sort_unstable();
	key
}

/// Lazily filled link colors, one per link group plus one for particles
/// without a group.
///
/// An entry is written once, on the first link created for its group, and
/// only [`LinkColorRegistry::clear`] (a full field reset) removes it.
#[derive(Clone, Debug, Default)]
pub struct LinkColorRegistry {
	groups: HashMap<String, LinkColor>,
	global: Option<LinkColor>,
}

impl LinkColorRegistry {
	pub fn get(&self, group: Option<&str>) -> Option<LinkColor> {
		match group {
			Some(id) => self.groups.get(id).copied(),
			None => self.global,
		}
	}

	/// Returns the cached color for `group`, resolving it with `resolve` on
	/// first use.
	pub fn get_or_resolve(
		&mut self,
		group: Option<&str>,
		resolve: impl FnOnce() -> LinkColor,
	) -> LinkColor {
		match group {
			Some(id) => match self.groups.get(id) {
				Some(color) => *color,
				None => {
					let color = resolve();
					self.groups.insert(id.to_string(), color);
					color
				}
			},
			None => *self.global.get_or_insert_with(resolve),
		}
	}

	pub fn clear(&mut self) {
		self.groups.clear();
		self.global = None;
	}
}

/// Owns all links, triangles and the link color cache of a field.
///
/// Links and triangles sit in flat vectors (removal swaps the last element
/// into the hole) and are found through hash indices keyed by their sorted
/// vertices. Each particle also keeps its neighbours in link creation order,
/// so pair lookups and per-particle walks cost O(1) and O(degree).
#[derive(Clone, Debug, Default)]
pub struct LinkGraph {
	links: Vec<Link>,
	link_index: HashMap<(ParticleId, ParticleId), usize>,
	adjacency: HashMap<ParticleId, Vec<ParticleId>>,
	triangles: Vec<Triangle>,
	triangle_index: HashMap<[ParticleId; 3], usize>,
	pub colors: LinkColorRegistry,
}

impl LinkGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// All links, in no particular order.
	pub fn links(&self) -> &[Link] {
		&self.links
	}

	pub fn triangles(&self) -> &[Triangle] {
		&self.triangles
	}

	pub fn find_link(&self, a: ParticleId, b: ParticleId) -> Option<&Link> {
		self.find_link_index(a, b).map(|i| &self.links[i])
	}

	/// Position of the link between `a` and `b`. Valid until the next
	/// removal.
	pub fn find_link_index(&self, a: ParticleId, b: ParticleId) -> Option<usize> {
		self.link_index.get(&pair_key(a, b)).copied()
	}

	pub fn link_mut(&mut self, index: usize) -> Option<&mut Link> {
		self.links.get_mut(index)
	}

	/// Stores a new link. The caller checks that the pair is not linked yet.
	pub fn add_link(
		&mut self,
		a: ParticleId,
		b: ParticleId,
		opacity: f64,
		color: Option<LinkColor>,
	) -> &mut Link {
		debug_assert!(a != b, "self link on {a:?}");
		debug_assert!(self.find_link_index(a, b).is_none(), "duplicate link {a:?}-{b:?}");
		let index = self.links.len();
		self.links.push(Link {
			edges: [a, b],
			opacity,
			color,
		});
		self.link_index.insert(pair_key(a, b), index);
		self.adjacency.entry(a).or_default().push(b);
		self.adjacency.entry(b).or_default().push(a);
		&mut self.links[index]
	}

	pub fn remove_link_at(&mut self, index: usize) -> Option<Link> {
		let [a, b] = self.links.get(index)?.edges;
		self.remove_triangles_on(a, b);

		let link = self.links.swap_remove(index);
		self.link_index.remove(&pair_key(a, b));
		if let Some(moved) = self.links.get(index) {
			let [x, y] = moved.edges;
			self.link_index.insert(pair_key(x, y), index);
		}
		self.detach(a, b);
		self.detach(b, a);
		Some(link)
	}

	/// Removes the link with exactly these edges.
	pub fn remove_exact_link(&mut self, edges: [ParticleId; 2]) -> Option<Link> {
		let index = self.find_link_index(edges[0], edges[1])?;
		if self.links[index].edges != edges {
			return None;
		}
		self.remove_link_at(index)
	}

	/// Removes every link touching `particle` and returns how many went.
	pub fn remove_links_of(&mut self, particle: ParticleId) -> usize {
		let neighbours = self.adjacency.get(&particle).cloned().unwrap_or_default();
		let mut removed = 0;
		for other in neighbours {
			if let Some(index) = self.find_link_index(particle, other) {
				self.remove_link_at(index);
				removed += 1;
			}
		}
		removed
	}

	/// Links touching `particle`, in creation order.
	pub fn links_of(&self, particle: ParticleId) -> impl Iterator<Item = &Link> + '_ {
		self.adjacency
			.get(&particle)
			.into_iter()
			.flatten()
			.filter_map(move |&other| self.find_link(particle, other))
	}

	pub fn find_triangle_index(&self, a: ParticleId, b: ParticleId, c: ParticleId) -> Option<usize> {
		self.triangle_index.get(&triangle_key(a, b, c)).copied()
	}

	/// Stores a triangle over pairwise-linked vertices.
	pub fn add_triangle(&mut self, triangle: Triangle) {
		let [a, b, c] = triangle.vertices;
		let key = triangle_key(a, b, c);
		debug_assert!(!self.triangle_index.contains_key(&key), "duplicate triangle {key:?}");
		self.triangle_index.insert(key, self.triangles.len());
		self.triangles.push(triangle);
	}

	pub fn remove_triangle_at(&mut self, index: usize) -> Option<Triangle> {
		if index >= self.triangles.len() {
			return None;
		}
		let triangle = self.triangles.swap_remove(index);
		let [a, b, c] = triangle.vertices;
		self.triangle_index.remove(&triangle_key(a, b, c));
		if let Some(moved) = self.triangles.get(index) {
			let [x, y, z] = moved.vertices;
			self.triangle_index.insert(triangle_key(x, y, z), index);
		}
		Some(triangle)
	}

	/// Drops every link, triangle and cached color.
	pub fn clear(&mut self) {
		self.links.clear();
		self.link_index.clear();
		self.adjacency.clear();
		self.triangles.clear();
		self.triangle_index.clear();
		self.colors.clear();
	}

	/// Removes the triangles resting on edge `a`-`b`. Their third vertex is
	/// a neighbour of `a` or of `b`.
	fn remove_triangles_on(&mut self, a: ParticleId, b: ParticleId) {
		if self.triangle_index.is_empty() {
			return;
		}
		let thirds = [a, b]
			.iter()
			.filter_map(|p| self.adjacency.get(p))
			.flatten()
			.copied()
			.filter(|&c| c != a && c != b)
			.collect::<Vec<_>>();
		for c in thirds {
			if let Some(index) = self.find_triangle_index(a, b, c) {
				self.remove_triangle_at(index);
			}
		}
	}

	fn detach(&mut self, from: ParticleId, to: ParticleId) {
		if let Some(neighbours) = self.adjacency.get_mut(&from) {
			neighbours.retain(|&n| n != to);
			if neighbours.is_empty() {
				self.adjacency.remove(&from);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::particle_field::particles::ParticleSystem;
	use crate::components::particle_field::theme::Color;
	use glam::DVec2;

	fn ids(n: usize) -> Vec<ParticleId> {
		let mut system = ParticleSystem::new();
		(0..n).map(|_| system.add(DVec2::ZERO).id).collect()
	}

	fn triangle(vertices: [ParticleId; 3]) -> Triangle {
		Triangle {
			vertices,
			opacity: 1.0,
			visible: true,
		}
	}

	#[test]
	fn test_lookup_is_order_independent() {
		let p = ids(3);
		let mut graph = LinkGraph::new();
		graph.add_link(p[0], p[1], 0.5, None);

		assert_eq!(graph.find_link_index(p[1], p[0]), Some(0));
		assert_eq!(graph.find_link(p[1], p[0]).map(|l| l.opacity), Some(0.5));
		assert!(graph.find_link(p[0], p[2]).is_none());
	}

	#[test]
	fn test_links_of_keeps_creation_order() {
		let p = ids(4);
		let mut graph = LinkGraph::new();
		graph.add_link(p[0], p[2], 1.0, None);
		graph.add_link(p[1], p[3], 1.0, None);
		graph.add_link(p[3], p[0], 1.0, None);
		graph.add_link(p[0], p[1], 1.0, None);

		let others: Vec<_> = graph.links_of(p[0]).filter_map(|l| l.other(p[0])).collect();
		assert_eq!(others, vec![p[2], p[3], p[1]]);
	}

	#[test]
	fn test_removing_an_edge_removes_its_triangles() {
		let p = ids(4);
		let mut graph = LinkGraph::new();
		graph.add_link(p[0], p[1], 1.0, None);
		graph.add_link(p[1], p[2], 1.0, None);
		graph.add_link(p[0], p[2], 1.0, None);
		graph.add_link(p[2], p[3], 1.0, None);
		graph.add_triangle(triangle([p[0], p[1], p[2]]));

		graph.remove_exact_link([p[2], p[3]]);
		assert_eq!(graph.triangles().len(), 1);

		let removed = graph.remove_exact_link([p[1], p[2]]);
		assert!(removed.is_some());
		assert!(graph.triangles().is_empty());
		assert!(graph.remove_exact_link([p[2], p[1]]).is_none());
	}

	#[test]
	fn test_remove_links_of() {
		let p = ids(4);
		let mut graph = LinkGraph::new();
		graph.add_link(p[0], p[1], 1.0, None);
		graph.add_link(p[1], p[2], 1.0, None);
		graph.add_link(p[2], p[3], 1.0, None);
		graph.add_triangle(triangle([p[1], p[2], p[3]]));

		assert_eq!(graph.remove_links_of(p[1]), 2);
		assert_eq!(graph.links().len(), 1);
		assert!(graph.links_of(p[1]).next().is_none());
		assert!(graph.triangles().is_empty());
	}

	#[test]
	fn test_indices_follow_swapped_links() {
		let p = ids(5);
		let mut graph = LinkGraph::new();
		graph.add_link(p[0], p[1], 0.1, None);
		graph.add_link(p[1], p[2], 0.2, None);
		graph.add_link(p[2], p[3], 0.3, None);
		graph.add_link(p[3], p[4], 0.4, None);

		graph.remove_exact_link([p[0], p[1]]);
		for (a, b, opacity) in [(1, 2, 0.2), (2, 3, 0.3), (3, 4, 0.4)] {
			let index = graph.find_link_index(p[b], p[a]).unwrap();
			assert_eq!(graph.link_mut(index).map(|l| l.opacity), Some(opacity));
		}
		let others: Vec<_> = graph.links_of(p[2]).filter_map(|l| l.other(p[2])).collect();
		assert_eq!(others, vec![p[1], p[3]]);
		assert!(graph.links_of(p[0]).next().is_none());
	}

	#[test]
	fn test_triangle_index_survives_removals() {
		let p = ids(5);
		let mut graph = LinkGraph::new();
		for (a, b) in [(0, 1), (1, 2), (0, 2), (2, 3), (1, 3), (3, 4), (2, 4)] {
			graph.add_link(p[a], p[b], 1.0, None);
		}
		graph.add_triangle(triangle([p[0], p[1], p[2]]));
		graph.add_triangle(triangle([p[1], p[2], p[3]]));
		graph.add_triangle(triangle([p[2], p[3], p[4]]));

		graph.remove_exact_link([p[0], p[1]]);
		assert_eq!(graph.triangles().len(), 2);
		assert!(graph.find_triangle_index(p[0], p[1], p[2]).is_none());
		for [a, b, c] in [[1, 2, 3], [2, 3, 4]] {
			let index = graph.find_triangle_index(p[c], p[a], p[b]).unwrap();
			assert!(graph.triangles()[index].has_vertices(p[a], p[b], p[c]));
		}

		graph.remove_links_of(p[4]);
		assert_eq!(graph.triangles().len(), 1);
		let index = graph.find_triangle_index(p[1], p[2], p[3]).unwrap();
		assert_eq!(graph.remove_triangle_at(index).map(|t| t.vertices), Some([p[1], p[2], p[3]]));
		assert!(graph.triangles().is_empty());
	}

	#[test]
	fn test_random_edits_match_a_plain_list() {
		use rand::rngs::SmallRng;
		use rand::{Rng, SeedableRng};

		let mut rng = SmallRng::seed_from_u64(21);
		let p = ids(12);
		let mut graph = LinkGraph::new();
		let mut expected: Vec<[ParticleId; 2]> = Vec::new();

		for _ in 0..400 {
			let a = p[rng.gen_range(0..p.len())];
			let b = p[rng.gen_range(0..p.len())];
			if a == b {
				continue;
			}
			match expected.iter().position(|e| *e == [a, b] || *e == [b, a]) {
				Some(i) => {
					let edges = expected.remove(i);
					assert!(graph.remove_exact_link(edges).is_some());
				}
				None => {
					graph.add_link(a, b, 1.0, None);
					expected.push([a, b]);
				}
			}

			assert_eq!(graph.links().len(), expected.len());
			for &q in &p {
				let got: Vec<_> = graph.links_of(q).map(|l| l.edges).collect();
				let want: Vec<_> = expected.iter().filter(|e| e.contains(&q)).copied().collect();
				assert_eq!(got, want);
			}
		}
	}

	#[test]
	fn test_triangle_vertex_set_match() {
		let p = ids(4);
		let t = triangle([p[0], p[1], p[2]]);
		assert!(t.has_vertices(p[2], p[0], p[1]));
		assert!(!t.has_vertices(p[0], p[1], p[3]));
	}

	#[test]
	fn test_color_registry_resolves_once() {
		let mut registry = LinkColorRegistry::default();
		let red = LinkColor::Rgb(Color::rgb(255, 0, 0));
		let blue = LinkColor::Rgb(Color::rgb(0, 0, 255));

		assert_eq!(registry.get_or_resolve(Some("a"), || red), red);
		assert_eq!(registry.get_or_resolve(Some("a"), || blue), red);
		assert_eq!(registry.get_or_resolve(None, || blue), blue);
		assert_eq!(registry.get_or_resolve(None, || red), blue);
		assert_eq!(registry.get(Some("b")), None);

		registry.clear();
		assert_eq!(registry.get(Some("a")), None);
		assert_eq!(registry.get(None), None);
	}
}

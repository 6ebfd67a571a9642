//! End-to-end runs of the field simulation from JSON options.

#![allow(unused_crate_dependencies)]

use std::collections::HashSet;

use particle_links::components::particle_field::{Color, LinkColor};
use particle_links::{FieldOptions, FieldState, OptionsError};

const LINKED: &str = r##"{
	"width": 300,
	"height": 300,
	"count": 60,
	"seed": 7,
	"particles": {
		"speed": { "min": 0.5, "max": 1.5 },
		"links": {
			"enable": true,
			"distance": 70,
			"opacity": 0.8,
			"color": "#ff8800",
			"warp": true,
			"triangles": { "enable": true, "frequency": 0.5 }
		}
	}
}"##;

fn run(state: &mut FieldState, frames: usize) {
	for _ in 0..frames {
		state.tick(0.016);
	}
}

#[test]
fn test_links_stay_consistent_over_many_frames() {
	let options = FieldOptions::from_json(LINKED).unwrap();
	let mut state = FieldState::new(options);

	for _ in 0..20 {
		run(&mut state, 5);

		let links = state.links.links();
		assert!(!links.is_empty());
		for link in links {
			let [a, b] = link.edges;
			assert_ne!(a, b);
			assert!(state.particles.get(a).is_some());
			assert!(state.particles.get(b).is_some());
			assert!(link.opacity > 0.0 && link.opacity <= 0.8);
			assert_eq!(state.links.links().iter().filter(|l| l.connects(a, b)).count(), 1);
		}

		for triangle in state.links.triangles() {
			let [a, b, c] = triangle.vertices;
			assert!(state.links.find_link(a, b).is_some());
			assert!(state.links.find_link(b, c).is_some());
			assert!(state.links.find_link(a, c).is_some());
			assert_eq!(triangle.opacity, 0.8);
		}
	}
}

#[test]
fn test_link_group_color_is_cached() {
	let options = FieldOptions::from_json(LINKED).unwrap();
	let mut state = FieldState::new(options);
	run(&mut state, 2);

	let cached = state.links.colors.get(None);
	assert_eq!(cached, Some(LinkColor::Rgb(Color::rgb(255, 136, 0))));
	assert!(state.links.links().iter().all(|l| l.color == cached));
}

#[test]
fn test_groups_link_only_among_themselves() {
	let json = r##"{
		"width": 200,
		"height": 200,
		"count": 30,
		"seed": 3,
		"particles": { "speed": 0, "links": { "enable": true, "distance": 80 } },
		"groups": [
			{ "count": 30, "particles": { "speed": 0, "links": { "enable": true, "id": "web", "distance": 40 } } }
		]
	}"##;
	let mut state = FieldState::new(FieldOptions::from_json(json).unwrap());
	run(&mut state, 3);

	assert!(!state.links.links().is_empty());
	for link in state.links.links() {
		let [a, b] = link.edges;
		let (Some(pa), Some(pb)) = (state.particles.get(a), state.particles.get(b)) else {
			panic!("link to a missing particle");
		};
		assert_eq!(pa.links.id, pb.links.id);
	}
	assert!(state.links.colors.get(Some("web")).is_some());
}

#[test]
fn test_ribbons_fall_and_reset() {
	let json = r##"{
		"width": 200,
		"height": 100,
		"count": 5,
		"seed": 11,
		"particles": {
			"color": "#ffffff",
			"backColor": "#333333",
			"shape": { "type": "ribbon", "length": 10, "distance": 3 }
		}
	}"##;
	let mut state = FieldState::new(FieldOptions::from_json(json).unwrap());
	let start: Vec<f64> = state.particles.iter().map(|p| p.position.y).collect();

	run(&mut state, 10);
	for (p, y0) in state.particles.iter().zip(&start) {
		assert!(p.position.y > *y0);
		let ribbon = p.ribbon.as_ref().unwrap();
		for pair in ribbon.steps.windows(2) {
			let gap = pair[0].position.distance(pair[1].position);
			assert!((gap - 3.0).abs() < 1e-9);
		}
		// Two tapered ends of two triangles each, quads in between
		assert_eq!(ribbon.polygons(1.0).len(), 11);
	}

	// Falling at 80..120 px/s, every ribbon passes 100 + 10 * 3 and
	// restarts above the canvas within 200 frames
	let mut restarted = HashSet::new();
	for _ in 0..200 {
		let before: Vec<_> = state.particles.iter().map(|p| (p.id, p.position.y)).collect();
		state.tick(0.016);
		for (id, y) in before {
			if state.particles.get(id).is_some_and(|p| p.position.y < y) {
				restarted.insert(id);
			}
		}
		assert!(state.particles.iter().all(|p| p.position.y <= 130.0));
	}
	assert_eq!(restarted.len(), 5);
}

#[test]
fn test_destroy_and_reset() {
	let options = FieldOptions::from_json(LINKED).unwrap();
	let mut state = FieldState::new(options);
	run(&mut state, 3);

	let id = state.links.links()[0].edges[0];
	assert!(state.destroy(id));
	run(&mut state, 1);
	assert!(state.particles.get(id).is_none());
	assert!(state.links.links().iter().all(|l| !l.touches(id)));
	assert!(state.links.triangles().iter().all(|t| !t.vertices.contains(&id)));
	assert_eq!(state.particles.len(), 59);

	state.reset();
	assert_eq!(state.particles.len(), 60);
	assert!(state.links.links().is_empty());
	assert!(state.links.triangles().is_empty());
	assert_eq!(state.links.colors.get(None), None);
}

#[test]
fn test_bad_options_are_rejected() {
	assert!(matches!(
		FieldOptions::from_json(r#"{ "pixelRatio": -1 }"#),
		Err(OptionsError::InvalidValue { field: "pixelRatio", .. })
	));
	assert!(matches!(FieldOptions::from_json("[1, 2"), Err(OptionsError::Json(_))));
}

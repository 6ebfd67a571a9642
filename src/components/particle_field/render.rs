//! Canvas rendering for the particle field.
//!
//! Draws one frame from the state left by [`FieldState::tick`], back to
//! front:
//! 1. Background
//! 2. Visible triangles
//! 3. Links (wrapped links towards their translated endpoint)
//! 4. Particles, as circles or ribbons

use std::f64::consts::PI;

use glam::DVec2;
use web_sys::CanvasRenderingContext2d;

use super::links::{Link, Triangle};
use super::particles::Particle;
use super::ribbon::{Face, Ribbon};
use super::state::FieldState;
use super::theme::Color;

/// Random opaque color for blinking links, drawn from the JS RNG.
fn blink_color() -> Color {
	let channel = || (js_sys::Math::random() * 256.0).min(255.0) as u8;
	Color::rgb(channel(), channel(), channel())
}

/// Renders the complete field to the canvas.
pub fn render(state: &FieldState, ctx: &CanvasRenderingContext2d) {
	draw_background(state, ctx);

	for triangle in state.links.triangles().iter().filter(|t| t.visible) {
		draw_triangle(state, ctx, triangle);
	}

	ctx.set_line_cap("round");
	for link in state.links.links() {
		draw_link(state, ctx, link);
	}

	for p in state.particles.iter() {
		match &p.ribbon {
			Some(ribbon) => draw_ribbon(state, ctx, p, ribbon),
			None => draw_circle(ctx, p),
		}
	}
}

fn draw_background(state: &FieldState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(&state.theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
}

fn draw_triangle(state: &FieldState, ctx: &CanvasRenderingContext2d, triangle: &Triangle) {
	let Some(points) = triangle
		.vertices
		.iter()
		.map(|&id| state.particles.get(id).map(|p| p.position))
		.collect::<Option<Vec<DVec2>>>()
	else {
		return;
	};
	let Some(owner) = state.particles.get(triangle.vertices[0]) else {
		return;
	};

	// Triangle color option, else the group's link color
	let color = owner
		.links
		.triangles
		.color
		.as_ref()
		.and_then(|spec| Color::parse(spec.value()))
		.or_else(|| {
			state
				.links
				.colors
				.get(owner.links.id.as_deref())
				.map(|c| c.to_color(blink_color))
		});
	let Some(color) = color else {
		return;
	};

	ctx.set_fill_style_str(&color.with_alpha(triangle.opacity).to_css());
	ctx.begin_path();
	ctx.move_to(points[0].x, points[0].y);
	ctx.line_to(points[1].x, points[1].y);
	ctx.line_to(points[2].x, points[2].y);
	ctx.close_path();
	ctx.fill();
}

fn draw_link(state: &FieldState, ctx: &CanvasRenderingContext2d, link: &Link) {
	let [id1, id2] = link.edges;
	let (Some(p1), Some(p2)) = (state.particles.get(id1), state.particles.get(id2)) else {
		return;
	};
	let Some(color) = link.color.map(|c| c.to_color(blink_color)) else {
		return;
	};

	let (start, end) = state.linker.link_segment(p1, p2, state.canvas_size());

	ctx.set_stroke_style_str(&color.with_alpha(link.opacity).to_css());
	ctx.set_line_width(state.scale.to_device(p1.links.width));
	ctx.begin_path();
	ctx.move_to(start.x, start.y);
	ctx.line_to(end.x, end.y);
	ctx.stroke();
}

fn draw_circle(ctx: &CanvasRenderingContext2d, p: &Particle) {
	ctx.set_fill_style_str(&p.color.to_css());
	ctx.begin_path();
	let _ = ctx.arc(p.position.x, p.position.y, p.radius, 0.0, PI * 2.0);
	ctx.fill();
}

/// Ribbons need both faces colored; without a back color nothing is drawn.
fn draw_ribbon(state: &FieldState, ctx: &CanvasRenderingContext2d, p: &Particle, ribbon: &Ribbon) {
	let Some(back_color) = p.back_color else {
		return;
	};
	if !ribbon.is_ready() {
		return;
	}
	let (front, back) = (p.color.to_css(), back_color.to_css());

	ctx.save();
	let _ = ctx.translate(p.position.x, p.position.y);
	for polygon in ribbon.polygons(state.scale.pixel_ratio) {
		let Some((first, rest)) = polygon.points.split_first() else {
			continue;
		};
		ctx.set_fill_style_str(match polygon.face {
			Face::Front => &front,
			Face::Back => &back,
		});
		ctx.begin_path();
		ctx.move_to(first.x, first.y);
		for point in rest {
			ctx.line_to(point.x, point.y);
		}
		ctx.close_path();
		ctx.fill();
	}
	ctx.restore();
}

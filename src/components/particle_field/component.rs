//! Leptos component wrapping the particle field canvas.
//!
//! The component creates an HTML canvas element sized in device pixels and
//! runs an animation loop via `requestAnimationFrame`, advancing the field
//! and redrawing it each frame. In fullscreen mode the field is rebuilt for
//! the new size whenever the window is resized.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Window};

use super::render;
use super::state::FieldState;
use super::types::FieldOptions;

/// Fixed simulation step per animation frame, in seconds.
const FRAME_DT: f64 = 0.016;

/// Viewport size in CSS pixels.
fn viewport_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Sizes the canvas backing store in device pixels and its box in CSS
/// pixels.
fn size_canvas(canvas: &HtmlCanvasElement, css_w: f64, css_h: f64, ratio: f64) {
	canvas.set_width((css_w * ratio) as u32);
	canvas.set_height((css_h * ratio) as u32);
	let _ = canvas.set_attribute(
		"style",
		&format!("display: block; width: {css_w}px; height: {css_h}px;"),
	);
}

/// Renders an animated particle field on a canvas element.
///
/// Pass options via the reactive `options` signal; their `width`, `height`
/// and `pixelRatio` are replaced by the measured canvas size and the
/// window's device pixel ratio. The component sizes itself to its parent
/// container by default; set `fullscreen = true` to fill the viewport and
/// follow window resizes. Explicit `width`/`height` (CSS pixels) override
/// automatic sizing.
#[component]
pub fn ParticleFieldCanvas(
	#[prop(into)] options: Signal<FieldOptions>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let field: Rc<RefCell<Option<FieldState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ratio = window.device_pixel_ratio().max(1.0);

		let (w, h) = if fullscreen {
			viewport_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		size_canvas(&canvas, w, h, ratio);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			log::warn!("particle-links: canvas has no 2d context");
			return;
		};

		let mut opts = options.get();
		opts.width = w * ratio;
		opts.height = h * ratio;
		opts.pixel_ratio = ratio;
		if opts.seed.is_none() {
			opts.seed = Some((js_sys::Math::random() * u32::MAX as f64) as u64);
		}
		*field.borrow_mut() = Some(FieldState::new(opts));

		if fullscreen {
			let (field_resize, canvas_resize) = (field.clone(), canvas.clone());
			*resize_cb.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let Some((nw, nh)) = viewport_size(&win) else {
					return;
				};
				let ratio = win.device_pixel_ratio().max(1.0);
				size_canvas(&canvas_resize, nw, nh, ratio);
				if let Some(ref mut state) = *field_resize.borrow_mut() {
					state.resize(nw * ratio, nh * ratio);
				}
			}));
			if let Some(ref cb) = *resize_cb.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (field_anim, animate_inner) = (field.clone(), animate.clone());
		*animate.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut state) = *field_anim.borrow_mut() {
				if state.animation_running {
					state.tick(FRAME_DT);
				}
				render::render(state, &ctx);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	view! { <canvas node_ref=canvas_ref class="particle-field-canvas" /> }
}

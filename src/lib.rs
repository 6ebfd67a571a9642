//! particle-links: Animated particle field with proximity links.
//!
//! This crate provides a WASM-based canvas component that animates a field
//! of particles, links nearby particles with distance-faded lines, fills
//! triangles between linked triples, and draws falling ribbons.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::particle_field::{
	FieldOptions, FieldState, OptionsError, ParticleFieldCanvas, ParticleId,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("particle-links: logging initialized");
}

/// Load field options from a script element with id="particles-options".
/// Expected format: JSON matching [`FieldOptions`].
fn load_field_options() -> Option<FieldOptions> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("particles-options")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match FieldOptions::from_json(&json_text) {
		Ok(options) => {
			info!(
				"particle-links: loaded options for {} particles, {} groups",
				options.count,
				options.groups.len()
			);
			Some(options)
		}
		Err(e) => {
			warn!("particle-links: failed to load options: {}", e);
			None
		}
	}
}

/// Main application component.
/// Loads field options from the DOM and renders the particle field.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let options = load_field_options().unwrap_or_default();
	let options_signal = Signal::derive(move || options.clone());

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text="Particle Links" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-field">
			<ParticleFieldCanvas options=options_signal fullscreen=true />
		</div>
	}
}

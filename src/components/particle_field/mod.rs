//! Particle field visualization component.
//!
//! Animates a population of particles on an HTML canvas and connects nearby
//! particles with links:
//! - Neighbour queries through a per-frame quadtree, optionally wrapping
//!   across the right and bottom canvas edges
//! - Link opacity falling off with distance, colors cached per link group
//! - Triangles filled between adjacent links that close a 3-cycle
//! - Falling ribbons driven by a chain of mass points
//!
//! # Example
//!
//! ```ignore
//! use particle_links::{FieldOptions, ParticleFieldCanvas};
//!
//! let mut options = FieldOptions::default();
//! options.particles.links.enable = true;
//! options.particles.links.warp = true;
//!
//! view! { <ParticleFieldCanvas options=Signal::derive(move || options.clone()) fullscreen=true /> }
//! ```

mod component;
pub mod linker;
pub mod links;
pub mod particles;
pub mod quadtree;
mod render;
pub mod ribbon;
pub mod scale;
pub mod state;
pub mod theme;
pub mod types;

pub use component::ParticleFieldCanvas;
pub use linker::Linker;
pub use links::{Link, LinkGraph, Triangle};
pub use particles::{Particle, ParticleId, ParticleSystem};
pub use state::FieldState;
pub use theme::{Color, LinkColor, Theme};
pub use types::{FieldOptions, OptionsError};

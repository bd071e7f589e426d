//! Immersive video playback: flat frames wrapped onto a sphere, half-sphere,
//! cube or equi-angular cubemap, with camera control picked from whatever
//! VR hardware the runtime exposes.
//!
//! The player itself ([`session::VrPlayer`]) is host-agnostic. The media
//! host, GPU backend, device APIs and frame clock are traits the embedding
//! application implements.

pub mod ambisonic;
pub mod buttons;
pub mod camera;
pub mod capability;
pub mod config;
pub mod controls;
pub mod error;
pub mod host;
pub mod mesh;
pub mod projection;
pub mod render_loop;
pub mod session;

pub use config::{Args, VrOptions};
pub use error::VrError;
pub use projection::Projection;
pub use session::{PlayerContext, SessionState, VrPlayer};

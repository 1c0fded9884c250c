//! Planet Maker application: window, frame loop and the editing controls.

pub mod controls;
pub mod editor;
pub mod platform;
pub mod window;

pub use editor::PlanetEditor;
pub use platform::{PlatformDirs, PlatformError};

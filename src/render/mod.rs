//! Rendering: backend trait, the shared CPU radar painter, and its visual constants.

/// Backend trait, variants, and frame/settings types.
pub mod backend;
/// `vello_cpu` radar painter.
pub(crate) mod cpu;
/// Built-in digit glyphs.
pub(crate) mod glyphs;
/// Colors, radii, and fades.
pub mod style;

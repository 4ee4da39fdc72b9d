//! Styles : convention `@epos_style`, style utilisateur, allocation

pub mod allocator;
pub mod resolver;
pub mod spec;
pub mod visual;

pub use allocator::StyleAllocator;
pub use resolver::{assign, resolve, StyleAssignment, StyleResolution, StyleTable};
pub use spec::{Anchor, MarkerKind, MarkerSpec, StyleSpec, DEFAULT_GLYPH};
pub use visual::{Style, StyleHandle};

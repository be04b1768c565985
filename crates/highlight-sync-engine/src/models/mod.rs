pub mod palette;
pub mod range;
pub mod selection;

pub use palette::{DEFAULT_COLOR, Palette};
pub use range::{HighlightRange, HighlightSet, NewHighlight, TextOffsets};
pub use selection::{SelectionAnchor, SelectionEvent};

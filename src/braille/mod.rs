mod canvas;
pub mod draw;
mod surface;

pub use canvas::BrailleCanvas;
pub use surface::{BrailleSurface, Label};

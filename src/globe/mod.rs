pub mod gesture;
pub mod markers;
pub mod path;
pub mod policy;
pub mod projection;
pub mod render;
pub mod solar;
pub mod versor;
pub mod view;

pub use gesture::{Arrival, DragSession, GestureController, GestureEvent};
pub use hit_test::{country_at, hit_test_country};
pub use markers::{Marker, MarkerError, MarkerId, MarkerLayer};
pub use policy::{DeviceClass, InputMode, Visibility, ZoomBounds};
pub use projection::{Projection, Rotation, Viewport};
pub use render::{Layer, RedrawScheduler, Renderer, Surface};
pub use solar::Terminator;
pub use versor::Versor;
pub use view::{GlobeOptions, GlobeState, GlobeView, PointerButton, Selection, ViewEvent};

pub mod diagram;
pub mod layout;
pub mod packing;
pub mod shape;
pub mod simulation;
pub mod tree;
pub mod view;

pub use diagram::{Diagram, LayoutCommand};
pub use layout::{force_layout, initial_layout};
pub use packing::{enclosing_circle, pack_siblings};
pub use shape::{AbsoluteShape, NodeShape};
pub use simulation::{Body, CollisionForce, Force, Simulation};
pub use tree::{Node, NodeIndex, Tree};
pub use view::{CharWidthMeasure, InstantView, NodeView, TextMeasure, ViewAck};

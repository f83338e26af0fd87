pub mod reading;
pub mod session;

pub use reading::{render_graph, Reading, GRAPH_WIDTH};
pub use session::{Button, ButtonPress, CloseReason, EndedSession};

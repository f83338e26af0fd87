pub mod controller;
pub mod loop_worker;

pub use controller::InputController;
pub use loop_worker::{input_loop, InputBackend, InputEngine};

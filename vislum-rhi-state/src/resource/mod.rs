pub mod barrier;
pub mod registry;
pub mod state;

pub use barrier::*;
pub use registry::*;
pub use state::*;

pub mod command_buffer;
pub mod pass;
pub mod pool;
pub mod state;
pub mod tables;
pub mod tracker;
pub mod transfer;
pub mod types;

pub use command_buffer::*;
pub use pass::*;
pub use pool::*;
pub use state::*;
pub use tracker::*;
pub use transfer::*;
pub use types::*;

pub mod bps;
pub mod plan;
pub mod protocol;
pub mod signals;

pub use bps::*;
pub use plan::*;
pub use protocol::*;
pub use signals::*;

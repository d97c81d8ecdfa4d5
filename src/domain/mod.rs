pub mod dispatch;
pub mod region;
pub mod status;

pub use dispatch::*;
pub use region::*;
pub use status::*;

pub mod battery;
pub mod dispatch;
pub mod scenario;
pub mod schedule;

pub use battery::*;
pub use dispatch::*;
pub use scenario::*;
pub use schedule::*;

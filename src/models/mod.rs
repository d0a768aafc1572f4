pub mod stats;
pub mod visitor;

pub use stats::{QueuePosition, VisitorStats};
pub use visitor::{HeardVia, Visitor, YesNo};

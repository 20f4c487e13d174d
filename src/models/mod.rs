pub mod plant;
pub mod template;
pub mod chain;
pub mod assignment;
pub mod care_task;

pub use plant::*;
pub use template::*;
pub use chain::*;
pub use assignment::*;
pub use care_task::*;

pub mod process;
pub mod checklist;
pub mod audit;
pub mod report;
pub mod equipment;
pub mod user;
pub mod config;

pub use process::*;
pub use checklist::*;
pub use audit::*;
pub use report::*;
pub use equipment::*;
pub use user::*;
pub use config::*;

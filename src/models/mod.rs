pub mod analysis;
pub mod diagnosis;
pub mod enums;
pub mod lab;
pub mod medication;

pub use analysis::*;
pub use diagnosis::*;
pub use lab::*;
pub use medication::*;

pub mod page;
pub mod policy;
pub mod report;
pub mod upload;

pub use page::*;
pub use policy::*;
pub use report::*;
pub use upload::*;

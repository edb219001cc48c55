pub mod error;
pub mod logging;
pub mod model;
pub mod resolver;

pub use error::Result;

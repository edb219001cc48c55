mod cache;

pub use cache::{CacheStats, IdentityCache};

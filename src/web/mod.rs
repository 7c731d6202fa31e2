//! Web search: engines, result cache, filters and page enrichment.

pub mod cache;
pub mod filter;
pub mod search;
pub mod transport;

pub use cache::{CacheKey, SearchCache};
pub use filter::{DateRange, SearchFilter};
pub use search::{SearchResponse, WebSearch};
pub use transport::{HttpSearchTransport, SearchEngine, SearchHit, SearchTransport};

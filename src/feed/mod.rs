mod extractor;
mod fetcher;

pub use extractor::ContentExtractor;
pub use fetcher::{FeedFetcher, FeedItem};

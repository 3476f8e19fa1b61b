//! Bulk import of reference texts from third-party APIs: fetch one unit with
//! retry, transform, upsert on the natural key, pause, repeat.

mod bible;
mod books;
mod retry;

pub use bible::BibleImporter;
pub use books::{find_book, CANON};

// Hockey-Reference collection: page fetching, table extraction and the
// per-season collector that ties them together.

pub mod collector;
pub mod source;
pub mod table;

pub use collector::{Collector, RawTable, ScrapeError};
pub use source::{FetchError, HttpPageSource, PageSource};
pub use table::extract_rows;

//! Query engine over the loaded prediction table.

pub mod lookup;

pub use lookup::{diverse_sample, item_options, shops_for_item, summarize, table_stats, ItemOptions};

pub mod amount;
pub mod registry;
pub mod source;
pub mod stats;

pub use amount::{scale_amount, unscale_amount};
pub use registry::TokenCache;
pub use source::{resolve_missing, JsonTokenSource, TokenSource};
pub use stats::{summarize_genesis, token_stats, GenesisSummary, TokenSupply};

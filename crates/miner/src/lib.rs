mod error;
mod mine;
mod refine;
mod tokens;

pub use error::Error;
pub use mine::{MineSummary, MinerConfig, build_first_cu};
pub use refine::{Anchor, ChildCandidate, RefineConfig, Refined, refine};
pub use tokens::{TokenStream, find_anchor, word_tokens};

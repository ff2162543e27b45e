mod error;
mod index;
mod lookup;

pub use error::Error;
pub use index::rebuild;
pub use lookup::{WindowHit, phrase_hits};

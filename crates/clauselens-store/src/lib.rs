//! Storage layer: the canonical template corpus and its nearest-neighbour index.

mod error;
pub use error::StoreError;

mod index;
pub use index::{Neighbor, VectorIndex, normalize};

mod templates;
pub use templates::{Template, TemplateDir, TemplateSource};

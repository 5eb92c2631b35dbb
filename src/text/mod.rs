//! Transcript text processing — window stitching and final polish.

pub mod normalize;
pub mod reconcile;

pub use normalize::{collapse_doubling, fast_punctuate};
pub use reconcile::merge_transcript;

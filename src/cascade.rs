pub mod input;
pub mod model;
pub mod traversal;

pub use input::{BuildInput, DataSample};
pub use model::{Cascade, Episode, Index, Stage};
pub use traversal::{EpisodeRef, TargetCoordinate};

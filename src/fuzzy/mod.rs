pub mod engine;
pub mod membership;

pub use engine::{FeatureTarget, MoodEngine};

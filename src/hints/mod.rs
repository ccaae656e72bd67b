pub mod classifier;
pub mod comparator;

pub use classifier::{label_all, HintLabel};
pub use comparator::compare;

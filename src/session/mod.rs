pub mod machine;

pub use machine::{GuessOutcome, Session};

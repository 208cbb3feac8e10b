mod thread;

pub use thread::{spawn_named, spawn_named_or_err};

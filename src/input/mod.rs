pub mod intent;
pub mod journal;
pub mod recording;

pub use intent::{InputInjector, MovementIntent, TracingInjector};
pub use journal::JournalInjector;
pub use recording::RecordingInjector;

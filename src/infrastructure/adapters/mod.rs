//! Notifier adapters

pub mod console;
pub mod recording;

pub use console::ConsoleNotifier;
pub use recording::RecordingNotifier;

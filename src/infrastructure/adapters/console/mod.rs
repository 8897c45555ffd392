//! Console notifier for the command-line front-end

use async_trait::async_trait;
use crate::domain::traits::{Notice, Notifier};

/// Prints notices to stdout, failures to stderr
pub struct ConsoleNotifier {
    prefix: String,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            prefix: "[favorites]".to_string(),
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notice: Notice) {
        match notice {
            Notice::Failed(_) | Notice::SignInRequired => eprintln!("{} {}", self.prefix, notice),
            _ => println!("{} {}", self.prefix, notice),
        }
    }
}

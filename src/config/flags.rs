//! Command-line flags.

use clap::Parser;

use crate::config::schema::{Configuration, DEFAULT_LISTEN_ADDRESS};

#[derive(Debug, Clone, Parser)]
#[command(name = "eventrouter")]
#[command(about = "Watches cluster events and forwards them to a sink", long_about = None)]
pub struct Flags {
    /// The address to listen on for HTTP requests.
    #[arg(long, default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
        }
    }
}

impl Flags {
    /// Flags sit above every other source.
    pub fn apply(&self, config: &mut Configuration) {
        config.listen_address = self.listen_address.clone();
    }
}

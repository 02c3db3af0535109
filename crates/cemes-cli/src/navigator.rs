use cemes_core::navigation::{Location, NavigationMode, Navigator};
use tracing::debug;

/// Reports view changes on stderr; the terminal has no views to switch.
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, to: &Location, mode: NavigationMode) {
        debug!(to = %to, ?mode, "Navigate");
        match mode {
            NavigationMode::Reload => {
                eprintln!("Signed out by the server. Log in again with `cemes login`.");
            }
            NavigationMode::Push | NavigationMode::Replace => {
                eprintln!("-> {}", to);
            }
        }
    }
}

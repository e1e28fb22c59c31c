//! Terminal stand-ins for the navigator and notifier

use cadence_core::{Navigator, Notifier};
use cadence_session::{SEARCH_PATH, TITLE_PARAM};
use std::sync::Mutex;

/// Prints navigation requests and remembers the last search title
#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    title: Mutex<String>,
}

impl ConsoleNavigator {
    /// Title of the most recent search page visited
    pub fn current_title(&self) -> String {
        self.title.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, path: &str, query: &[(&str, &str)]) {
        if path == SEARCH_PATH {
            let title = query
                .iter()
                .find(|(key, _)| *key == TITLE_PARAM)
                .map_or("", |(_, value)| *value);
            if let Ok(mut current) = self.title.lock() {
                *current = title.to_string();
            }
            println!("-> {}", cadence_session::search_href(title));
        } else {
            println!("-> {path}");
        }
    }

    fn refresh(&self) {
        tracing::debug!("Refresh requested");
    }
}

#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("[ok] {message}");
    }

    fn error(&self, message: &str) {
        println!("[error] {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_navigation_updates_title() {
        let navigator = ConsoleNavigator::default();
        assert_eq!(navigator.current_title(), "");

        navigator.navigate(SEARCH_PATH, &[(TITLE_PARAM, "dawn")]);
        assert_eq!(navigator.current_title(), "dawn");

        navigator.navigate("/liked", &[]);
        assert_eq!(navigator.current_title(), "dawn");
    }
}

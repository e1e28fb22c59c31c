//! Debounced search input
//!
//! Keystrokes update the input immediately; navigation to the results page
//! happens only once the input has been stable for the quiet period.

use cadence_core::Navigator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::form_urlencoded;

pub const SEARCH_PATH: &str = "/search";
pub const TITLE_PARAM: &str = "title";

/// Link to the results page for `title`
pub fn search_href(title: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(TITLE_PARAM, title)
        .finish();
    format!("{SEARCH_PATH}?{query}")
}

pub struct SearchController {
    input: watch::Sender<String>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SearchController {
    /// Start debouncing; the initial (empty) input is emitted too
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        navigator: Arc<dyn Navigator>,
        quiet_period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (input, rx) = watch::channel(String::new());
        let task = tokio::spawn(debounce(rx, quiet_period, navigator, cancel.clone()));
        Self {
            input,
            cancel,
            task,
        }
    }

    /// Record the latest raw input
    pub fn set_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.input.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }

    pub fn input(&self) -> String {
        self.input.borrow().clone()
    }

    /// Stop debouncing and drop any pending emission
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn debounce(
    mut input: watch::Receiver<String>,
    quiet_period: Duration,
    navigator: Arc<dyn Navigator>,
    cancel: CancellationToken,
) {
    let mut last_emitted: Option<String> = None;

    loop {
        // Every change restarts the quiet period
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = tokio::time::sleep(quiet_period) => break,
            }
        }

        let value = input.borrow_and_update().clone();
        if last_emitted.as_deref() != Some(value.as_str()) {
            debug!(title = %value, "Issuing search");
            navigator.navigate(SEARCH_PATH, &[(TITLE_PARAM, value.as_str())]);
            last_emitted = Some(value);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            changed = input.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

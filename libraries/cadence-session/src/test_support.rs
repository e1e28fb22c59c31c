use cadence_core::{Navigator, Notifier};
use mockall::mock;
use std::sync::Mutex;

mock! {
    pub Notifier {}

    impl Notifier for Notifier {
        fn success(&self, message: &str);

        fn error(&self, message: &str);
    }
}

/// Navigator that records every request
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub visits: Mutex<Vec<String>>,
    pub refreshes: Mutex<usize>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str, query: &[(&str, &str)]) {
        let query = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        self.visits.lock().unwrap().push(format!("{path}?{query}"));
    }

    fn refresh(&self) {
        *self.refreshes.lock().unwrap() += 1;
    }
}

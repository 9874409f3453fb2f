use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the board can say about a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    /// No poll has finished yet
    Loading,
    Ready,
    /// The last poll failed; older data is still shown
    Stale,
    /// Polls failed and there is nothing to show
    Unavailable,
}

/// Named error state of a feed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedError {
    /// Diagnostic code, e.g. `statusboard::weather`
    pub code: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Last good value of a polled feed plus the outcome of the latest poll
#[derive(Debug, Clone)]
pub struct Feed<T> {
    data: Option<T>,
    last_success: Option<DateTime<Utc>>,
    error: Option<FeedError>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            data: None,
            last_success: None,
            error: None,
        }
    }
}

impl<T> Feed<T> {
    pub fn record_success(&mut self, data: T, at: DateTime<Utc>) {
        self.data = Some(data);
        self.last_success = Some(at);
        self.error = None;
    }

    /// Keep the last good value and remember what went wrong
    pub fn record_failure(&mut self, error: &Error, at: DateTime<Utc>) {
        self.error = Some(FeedError {
            code: error.code_name(),
            message: error.to_string(),
            at,
        });
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn status(&self) -> FeedStatus {
        match (&self.data, &self.error) {
            (Some(_), None) => FeedStatus::Ready,
            (Some(_), Some(_)) => FeedStatus::Stale,
            (None, Some(_)) => FeedStatus::Unavailable,
            (None, None) => FeedStatus::Loading,
        }
    }

    /// Serializable view, with the data mapped through `f`
    pub fn view_with<U>(&self, f: impl FnOnce(&T) -> U) -> FeedView<U> {
        FeedView {
            status: self.status(),
            data: self.data.as_ref().map(f),
            last_success: self.last_success,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedView<T> {
    pub status: FeedStatus,
    pub data: Option<T>,
    pub last_success: Option<DateTime<Utc>>,
    pub error: Option<FeedError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{missing_credentials, weather_error};

    #[test]
    fn test_status_transitions() {
        let now = Utc::now();
        let mut feed: Feed<u32> = Feed::default();
        assert_eq!(feed.status(), FeedStatus::Loading);

        feed.record_failure(&missing_credentials("WEATHER_API_KEY"), now);
        assert_eq!(feed.status(), FeedStatus::Unavailable);
        assert_eq!(
            feed.error().map(|e| e.code.as_str()),
            Some("statusboard::missing_credentials")
        );

        feed.record_success(7, now);
        assert_eq!(feed.status(), FeedStatus::Ready);
        assert!(feed.error().is_none());

        feed.record_failure(&weather_error("timeout"), now);
        assert_eq!(feed.status(), FeedStatus::Stale);
        // Last good value survives the failure
        assert_eq!(feed.data(), Some(&7));
    }

    #[test]
    fn test_view_maps_data() {
        let mut feed: Feed<Vec<u32>> = Feed::default();
        feed.record_success(vec![1, 2, 3], Utc::now());
        let view = feed.view_with(|v| v.len());
        assert_eq!(view.data, Some(3));
        assert_eq!(view.status, FeedStatus::Ready);
    }
}

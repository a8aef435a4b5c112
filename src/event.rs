use serde::{Deserialize, Serialize};

/// Kind of accessibility notification that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    WindowStateChanged,
    WindowContentChanged,
    WindowsChanged,
}

/// Content-change detail attached to window-content notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentChange {
    #[default]
    None,
    PaneAppeared,
    PaneDisappeared,
    Other,
}

/// One foreground notification as delivered by the platform event stream.
///
/// Ephemeral: produced by the platform, consumed once by the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundEvent {
    pub package: Option<String>,
    pub class_name: Option<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub content_change: ContentChange,
    #[serde(default)]
    pub content_description: Option<String>,
    #[serde(default)]
    pub text: Vec<String>,
    pub timestamp_ms: u64,
}

impl ForegroundEvent {
    pub fn window_state(package: &str, class_name: &str, timestamp_ms: u64) -> Self {
        Self {
            package: Some(package.to_string()),
            class_name: Some(class_name.to_string()),
            kind: EventKind::WindowStateChanged,
            content_change: ContentChange::None,
            content_description: None,
            text: Vec::new(),
            timestamp_ms,
        }
    }

    /// Case-insensitive search of the event's text segments.
    pub fn text_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.text.iter().any(|t| t.to_lowercase().contains(&needle))
    }

    /// Case-insensitive search of the first text segment only.
    pub fn first_text_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.text
            .first()
            .map(|t| t.to_lowercase().contains(&needle))
            .unwrap_or(false)
    }
}

//! Camera directory: the CCTV list, the live-stream selection, and the
//! options of the CCTV filter dropdown.

use serde::Serialize;
use tracing::info;

use crate::models::CctvEntry;

/// Dropdown value meaning "every camera".
pub const ALL_CCTV_VALUE: &str = "All";
pub const ALL_CCTV_LABEL: &str = "Semua CCTV";

/// One entry of the CCTV filter dropdown. The label shown to users is the
/// camera's location; the value sent upstream is its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

/// Builds the live-stream URL for a camera. The stream itself is opaque to us.
pub fn video_feed_url(stream_base: &str, cctv_name: &str) -> String {
    format!("{}/video_feed/{}", stream_base.trim_end_matches('/'), cctv_name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CctvDirectory {
    entries: Vec<CctvEntry>,
    stream_selection: Option<String>,
}

impl CctvDirectory {
    /// Replaces the entry list with a freshly loaded one. If no camera is
    /// selected for streaming yet, the first entry becomes the selection.
    pub fn apply(&mut self, entries: Vec<CctvEntry>) {
        if self.stream_selection.is_none() {
            if let Some(first) = entries.iter().find(|e| !e.name.is_empty()) {
                info!(cctv = %first.name, "Default stream selection");
                self.stream_selection = Some(first.name.clone());
            }
        }
        self.entries = entries;
    }

    pub fn entries(&self) -> &[CctvEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&CctvEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn stream_selection(&self) -> Option<&str> {
        self.stream_selection.as_deref()
    }

    /// Selects `name` for streaming. Returns `false` for unknown cameras.
    pub fn select_stream(&mut self, name: &str) -> bool {
        if self.find(name).is_none() {
            return false;
        }
        self.stream_selection = Some(name.to_string());
        true
    }

    /// Dropdown options: "all cameras" first, then one per distinct name.
    pub fn filter_options(&self) -> Vec<FilterOption> {
        let mut options = vec![FilterOption {
            label: ALL_CCTV_LABEL.to_string(),
            value: ALL_CCTV_VALUE.to_string(),
        }];

        for entry in &self.entries {
            if entry.name.is_empty() || options.iter().any(|o| o.value == entry.name) {
                continue;
            }
            let label = if entry.location.is_empty() {
                entry.name.clone()
            } else {
                entry.location.clone()
            };
            options.push(FilterOption {
                label,
                value: entry.name.clone(),
            });
        }

        options
    }

    /// Stream URL of the selected camera, if any.
    pub fn stream_url(&self, stream_base: &str) -> Option<String> {
        self.stream_selection
            .as_deref()
            .map(|name| video_feed_url(stream_base, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_selects_first_entry() {
        let mut dir = CctvDirectory::default();
        dir.apply(vec![cam(1, "CAM.A", "Gerbang"), cam(2, "CAM.B", "Parkir")]);

        assert_eq!(dir.stream_selection(), Some("CAM.A"));
        assert_eq!(
            dir.stream_url("http://10.0.0.1:8001/").as_deref(),
            Some("http://10.0.0.1:8001/video_feed/CAM.A")
        );
    }

    #[test]
    fn test_reload_keeps_existing_selection() {
        let mut dir = CctvDirectory::default();
        dir.apply(vec![cam(1, "CAM.A", "Gerbang"), cam(2, "CAM.B", "Parkir")]);
        assert!(dir.select_stream("CAM.B"));

        dir.apply(vec![cam(1, "CAM.A", "Gerbang"), cam(2, "CAM.B", "Parkir")]);
        assert_eq!(dir.stream_selection(), Some("CAM.B"));
    }

    #[test]
    fn test_empty_load_selects_nothing() {
        let mut dir = CctvDirectory::default();
        dir.apply(vec![]);
        assert!(dir.is_empty());
        assert_eq!(dir.stream_selection(), None);
        assert_eq!(dir.stream_url("http://x"), None);
    }

    #[test]
    fn test_unknown_stream_is_rejected() {
        let mut dir = CctvDirectory::default();
        dir.apply(vec![cam(1, "CAM.A", "Gerbang")]);
        assert!(!dir.select_stream("CAM.Z"));
        assert_eq!(dir.stream_selection(), Some("CAM.A"));
    }

    #[test]
    fn test_filter_options_label_is_location_value_is_name() {
        let mut dir = CctvDirectory::default();
        dir.apply(vec![
            cam(1, "CAM.A", "Gerbang Utama"),
            cam(2, "CAM.A", "Duplikat"),
            cam(3, "CAM.B", ""),
        ]);

        let options = dir.filter_options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].value, "All");
        assert_eq!(options[0].label, "Semua CCTV");
        assert_eq!(options[1].label, "Gerbang Utama");
        assert_eq!(options[1].value, "CAM.A");
        assert_eq!(options[2].label, "CAM.B");
    }

    // Helper functions for tests
    fn cam(id: i64, name: &str, location: &str) -> CctvEntry {
        CctvEntry {
            id,
            name: name.to_string(),
            location: location.to_string(),
            brand: "Hikvision".to_string(),
            ip_address: format!("10.0.0.{id}"),
            rtsp_url: format!("rtsp://10.0.0.{id}/stream"),
            kind: "fixed".to_string(),
            line_position: None,
        }
    }
}

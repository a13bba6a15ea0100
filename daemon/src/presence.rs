/// Presence records: what callers send, the per-console baseline, and the merged
/// record that actually goes out to Discord.
use crate::console::Console;

/// Product name shown in the small-image tooltip.
pub const PRODUCT_NAME: &str = "PlayStationDiscord";

/// Status fields supplied by the caller for a single update.
/// Any field left as `None` falls back to the controller's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresencePayload {
    pub state: Option<String>,
    pub details: Option<String>,
    /// Unix seconds. Omitting it keeps the previously sent start time.
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    pub instance: Option<bool>,
    pub large_image_key: Option<String>,
    pub large_image_text: Option<String>,
    pub small_image_key: Option<String>,
    pub small_image_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Leaves `start_timestamp` alone: it is neither filled in from nor
    /// remembered by the controller for this update.
    pub hide_timestamp: bool,
}

/// Baseline fields every outgoing presence starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultInfo {
    pub instance: bool,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: String,
    pub small_image_text: String,
}

impl DefaultInfo {
    /// Generic baseline before a console is applied.
    pub fn generic(version: &str) -> Self {
        Self {
            instance: true,
            large_image_key: "ps4_main".to_string(),
            large_image_text: "PlayStation 4".to_string(),
            small_image_key: "ps4_main".to_string(),
            small_image_text: format!("{PRODUCT_NAME} {version}"),
        }
    }

    /// Baseline for `console`; the small-image text keeps the product version.
    pub fn for_console(console: &Console, version: &str) -> Self {
        Self {
            large_image_key: console.asset_name().to_string(),
            large_image_text: console.display_name().to_string(),
            small_image_key: console.asset_name().to_string(),
            ..Self::generic(version)
        }
    }

    /// Shallow merge: each field set on `payload` wins, everything else comes
    /// from the defaults.
    pub fn overlay(&self, payload: PresencePayload) -> Presence {
        Presence {
            state: payload.state,
            details: payload.details,
            start_timestamp: payload.start_timestamp,
            end_timestamp: payload.end_timestamp,
            instance: payload.instance.unwrap_or(self.instance),
            large_image_key: payload
                .large_image_key
                .unwrap_or_else(|| self.large_image_key.clone()),
            large_image_text: payload
                .large_image_text
                .unwrap_or_else(|| self.large_image_text.clone()),
            small_image_key: payload
                .small_image_key
                .unwrap_or_else(|| self.small_image_key.clone()),
            small_image_text: payload
                .small_image_text
                .unwrap_or_else(|| self.small_image_text.clone()),
        }
    }
}

/// Fully merged record handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub state: Option<String>,
    pub details: Option<String>,
    pub start_timestamp: Option<i64>,
    pub end_timestamp: Option<i64>,
    pub instance: bool,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: String,
    pub small_image_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ConsoleKind;

    #[test]
    fn generic_defaults_embed_version() {
        let d = DefaultInfo::generic("1.2.3");
        assert!(d.instance);
        assert_eq!(d.large_image_key, "ps4_main");
        assert_eq!(d.small_image_text, "PlayStationDiscord 1.2.3");
    }

    #[test]
    fn generic_defaults_with_missing_version() {
        let d = DefaultInfo::generic("");
        assert_eq!(d.small_image_text, "PlayStationDiscord ");
    }

    #[test]
    fn console_defaults_replace_image_fields() {
        let d = DefaultInfo::for_console(&Console::new(ConsoleKind::Ps3), "0.1.0");
        assert_eq!(d.large_image_key, "ps3_main");
        assert_eq!(d.large_image_text, "PlayStation 3");
        assert_eq!(d.small_image_key, "ps3_main");
        assert_eq!(d.small_image_text, "PlayStationDiscord 0.1.0");
    }

    #[test]
    fn overlay_prefers_payload_fields() {
        let d = DefaultInfo::for_console(&Console::new(ConsoleKind::Vita), "0.1.0");
        let out = d.overlay(PresencePayload {
            large_image_text: Some("X".to_string()),
            instance: Some(false),
            ..Default::default()
        });
        assert_eq!(out.large_image_text, "X");
        assert!(!out.instance);
        assert_eq!(out.large_image_key, d.large_image_key);
        assert_eq!(out.small_image_key, d.small_image_key);
        assert_eq!(out.small_image_text, d.small_image_text);
    }

    #[test]
    fn overlay_of_empty_payload_is_defaults() {
        let d = DefaultInfo::generic("0.1.0");
        let out = d.overlay(PresencePayload::default());
        assert_eq!(out.state, None);
        assert_eq!(out.start_timestamp, None);
        assert_eq!(out.large_image_text, d.large_image_text);
        assert_eq!(out.instance, d.instance);
    }
}

/// Supported PlayStation consoles and the Discord application each one reports as.
///
/// Every console maps to a separate Discord application registration, which is
/// what decides the name Discord shows ("Playing PlayStation 3") and which image
/// catalog the asset keys below resolve against.
use serde::Deserialize;
use std::fmt;

/// Closed set of consoles the daemon knows how to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    Ps3,
    Ps4,
    Ps5,
    Vita,
}

impl ConsoleKind {
    #[cfg(test)]
    pub const ALL: [ConsoleKind; 4] = [Self::Ps3, Self::Ps4, Self::Ps5, Self::Vita];

    /// Built-in Discord application id for this console.
    pub fn default_app_id(self) -> &'static str {
        match self {
            Self::Ps3 => "941407509426606090",
            Self::Ps4 => "457775893746810880",
            Self::Ps5 => "773967402476273684",
            Self::Vita => "493957159323828259",
        }
    }

    /// Key into the Discord application's art asset catalog.
    pub fn asset_name(self) -> &'static str {
        match self {
            Self::Ps3 => "ps3_main",
            Self::Ps4 => "ps4_main",
            Self::Ps5 => "ps5_main",
            Self::Vita => "vita_main",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ps3 => "PlayStation 3",
            Self::Ps4 => "PlayStation 4",
            Self::Ps5 => "PlayStation 5",
            Self::Vita => "PlayStation Vita",
        }
    }
}

impl fmt::Display for ConsoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Immutable descriptor for the console currently being presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Console {
    kind: ConsoleKind,
    app_id: String,
}

impl Console {
    /// Descriptor using the console's built-in Discord application.
    pub fn new(kind: ConsoleKind) -> Self {
        Self {
            kind,
            app_id: kind.default_app_id().to_string(),
        }
    }

    /// Descriptor connecting as a different Discord application (e.g. a
    /// self-hosted registration with its own asset catalog).
    pub fn with_app_id(kind: ConsoleKind, app_id: impl Into<String>) -> Self {
        Self {
            kind,
            app_id: app_id.into(),
        }
    }

    pub fn kind(&self) -> ConsoleKind {
        self.kind
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn asset_name(&self) -> &'static str {
        self.kind.asset_name()
    }

    pub fn display_name(&self) -> &'static str {
        self.kind.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps3_descriptor_projections() {
        let c = Console::new(ConsoleKind::Ps3);
        assert_eq!(c.app_id(), "941407509426606090");
        assert_eq!(c.asset_name(), "ps3_main");
        assert_eq!(c.display_name(), "PlayStation 3");
    }

    #[test]
    fn app_id_override_keeps_assets() {
        let c = Console::with_app_id(ConsoleKind::Vita, "123");
        assert_eq!(c.app_id(), "123");
        assert_eq!(c.kind(), ConsoleKind::Vita);
        assert_eq!(c.asset_name(), "vita_main");
        assert_eq!(c.display_name(), "PlayStation Vita");
    }

    #[test]
    fn every_kind_has_distinct_identity() {
        let ids: std::collections::HashSet<_> =
            ConsoleKind::ALL.iter().map(|k| k.default_app_id()).collect();
        let assets: std::collections::HashSet<_> =
            ConsoleKind::ALL.iter().map(|k| k.asset_name()).collect();
        assert_eq!(ids.len(), ConsoleKind::ALL.len());
        assert_eq!(assets.len(), ConsoleKind::ALL.len());
    }

    #[test]
    fn kind_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            console: ConsoleKind,
        }
        let w: Wrapper = toml::from_str("console = \"vita\"").unwrap();
        assert_eq!(w.console, ConsoleKind::Vita);
    }
}

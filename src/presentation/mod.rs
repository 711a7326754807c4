//! Map presentation - pure projection of navigation state
//!
//! Nothing here feeds back into tracking or directions. `ViewState` holds
//! the ephemeral camera/hover/style choices; `project` turns navigation state
//! plus view state into a serialisable `MapView`.

pub mod map_view;

pub use map_view::{project, MapView, ProjectionInput, ViewState, ViewStatus};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Basemap presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasemapStyle {
    #[default]
    Streets,
    Satellite,
    Outdoors,
}

impl BasemapStyle {
    pub const ALL: [BasemapStyle; 3] =
        [BasemapStyle::Streets, BasemapStyle::Satellite, BasemapStyle::Outdoors];

    pub fn as_str(&self) -> &'static str {
        match self {
            BasemapStyle::Streets => "streets",
            BasemapStyle::Satellite => "satellite",
            BasemapStyle::Outdoors => "outdoors",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            BasemapStyle::Streets => "mapbox://styles/mapbox/streets-v11",
            BasemapStyle::Satellite => "mapbox://styles/mapbox/satellite-v9",
            BasemapStyle::Outdoors => "mapbox://styles/mapbox/outdoors-v11",
        }
    }
}

impl fmt::Display for BasemapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BasemapStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown style '{s}' (expected streets, satellite or outdoors)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("Satellite".parse::<BasemapStyle>(), Ok(BasemapStyle::Satellite));
        assert!("terrain".parse::<BasemapStyle>().is_err());
        assert_eq!(BasemapStyle::Outdoors.url(), "mapbox://styles/mapbox/outdoors-v11");
    }
}

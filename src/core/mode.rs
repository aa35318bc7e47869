//! Build mode selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compilation mode for both bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    /// Default mode from the environment: `NODE_ENV=production` selects
    /// production, everything else is development.
    pub fn from_env() -> Self {
        if std::env::var("NODE_ENV").is_ok_and(|v| v == "production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(BuildMode::Development.to_string(), "development");
        assert_eq!(BuildMode::Production.to_string(), "production");
    }

    #[test]
    fn test_serde_lowercase() {
        let mode: BuildMode = serde_json::from_str("\"production\"").unwrap();
        assert!(mode.is_production());
        assert_eq!(serde_json::to_string(&BuildMode::Development).unwrap(), "\"development\"");
    }
}

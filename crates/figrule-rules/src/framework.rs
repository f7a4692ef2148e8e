//! Target frameworks a rule can contribute output for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "react-tailwind")]
    ReactTailwind,
    #[serde(rename = "react-tailwind-v4")]
    ReactTailwindV4,
    #[serde(rename = "html-css")]
    HtmlCss,
    #[serde(rename = "react-inline")]
    ReactInline,
    #[serde(rename = "swift-ui")]
    SwiftUi,
    #[serde(rename = "android-xml")]
    AndroidXml,
}

impl Framework {
    pub const ALL: [Framework; 6] = [
        Framework::ReactTailwind,
        Framework::ReactTailwindV4,
        Framework::HtmlCss,
        Framework::ReactInline,
        Framework::SwiftUi,
        Framework::AndroidXml,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReactTailwind => "react-tailwind",
            Self::ReactTailwindV4 => "react-tailwind-v4",
            Self::HtmlCss => "html-css",
            Self::ReactInline => "react-inline",
            Self::SwiftUi => "swift-ui",
            Self::AndroidXml => "android-xml",
        }
    }

    /// Framework whose transformers are reused when a rule has none for
    /// `self`. Tailwind v4 inherits the v3 rules.
    pub fn fallback(self) -> Option<Framework> {
        match self {
            Self::ReactTailwindV4 => Some(Self::ReactTailwind),
            _ => None,
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A framework identifier outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported framework '{name}'")]
pub struct UnknownFramework {
    pub name: String,
}

impl FromStr for Framework {
    type Err = UnknownFramework;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Framework::ALL
            .into_iter()
            .find(|fw| fw.as_str() == s)
            .ok_or_else(|| UnknownFramework {
                name: s.to_string(),
            })
    }
}

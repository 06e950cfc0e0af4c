use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    NanoBananaEdit,
    Seedream,
    Imagen4,
}

impl BackendId {
    pub const ALL: [BackendId; 3] = [
        BackendId::NanoBananaEdit,
        BackendId::Seedream,
        BackendId::Imagen4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBananaEdit => "nano_banana_edit",
            Self::Seedream => "seedream",
            Self::Imagen4 => "imagen4",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "nano_banana_edit" | "nano_banana" | "nanobanana" => Ok(Self::NanoBananaEdit),
            "seedream" => Ok(Self::Seedream),
            "imagen4" | "imagen_4" | "imagen" => Ok(Self::Imagen4),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Whether a backend transforms an existing image or creates one from a prompt.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Edit,
    Generate,
}

/// Output resolution tier. Pricing is per tier.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1k")]
    OneK,
    #[serde(rename = "2k")]
    TwoK,
    #[serde(rename = "4k")]
    FourK,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1k",
            Self::TwoK => "2k",
            Self::FourK => "4k",
        }
    }

    /// Long edge in pixels.
    pub fn pixels(&self) -> u32 {
        match self {
            Self::OneK => 1024,
            Self::TwoK => 2048,
            Self::FourK => 4096,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1k" | "1024" => Ok(Self::OneK),
            "2k" | "2048" => Ok(Self::TwoK),
            "4k" | "4096" => Ok(Self::FourK),
            other => Err(format!("unknown resolution '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    pub id: BackendId,
    pub kind: BackendKind,
    pub display_name: String,
    /// Remote model or endpoint path.
    pub endpoint: String,
    /// Credits charged per resolution tier. A missing tier is unsupported.
    pub pricing: HashMap<Resolution, u64>,
}

impl BackendInfo {
    pub fn cost(&self, resolution: Resolution) -> Option<u64> {
        self.pricing.get(&resolution).copied()
    }

    pub fn supports(&self, resolution: Resolution) -> bool {
        self.pricing.contains_key(&resolution)
    }

    pub fn requires_source_image(&self) -> bool {
        self.kind == BackendKind::Edit
    }
}

fn tiered_pricing(tiers: &[(Resolution, u64)]) -> HashMap<Resolution, u64> {
    tiers.iter().copied().collect()
}

pub fn builtin_backends() -> HashMap<BackendId, BackendInfo> {
    let mut m = HashMap::new();

    m.insert(
        BackendId::NanoBananaEdit,
        BackendInfo {
            id: BackendId::NanoBananaEdit,
            kind: BackendKind::Edit,
            display_name: "Nano Banana Pro Edit".into(),
            endpoint: "fal-ai/nano-banana-pro/edit".into(),
            pricing: tiered_pricing(&[
                (Resolution::OneK, 1),
                (Resolution::TwoK, 2),
                (Resolution::FourK, 4),
            ]),
        },
    );

    m.insert(
        BackendId::Seedream,
        BackendInfo {
            id: BackendId::Seedream,
            kind: BackendKind::Generate,
            display_name: "Seedream 4".into(),
            endpoint: "fal-ai/bytedance/seedream/v4/text-to-image".into(),
            pricing: tiered_pricing(&[
                (Resolution::OneK, 1),
                (Resolution::TwoK, 2),
                (Resolution::FourK, 4),
            ]),
        },
    );

    // Imagen 4 tops out at 2K.
    m.insert(
        BackendId::Imagen4,
        BackendInfo {
            id: BackendId::Imagen4,
            kind: BackendKind::Generate,
            display_name: "Google Imagen 4".into(),
            endpoint: "imagen-4.0-generate-001".into(),
            pricing: tiered_pricing(&[(Resolution::OneK, 1), (Resolution::TwoK, 2)]),
        },
    );

    m
}

pub fn get_backend_info(id: BackendId) -> Option<BackendInfo> {
    builtin_backends().remove(&id)
}

/// All catalog entries in a stable display order.
pub fn list_backends() -> Vec<BackendInfo> {
    let mut all = builtin_backends();
    BackendId::ALL
        .iter()
        .filter_map(|id| all.remove(id))
        .collect()
}

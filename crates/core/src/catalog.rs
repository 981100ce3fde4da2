//! Model catalog value types and baseline rules.
//!
//! A [`CatalogEntry`] is one known model as held in the resolver's snapshot
//! and serialised in the snapshot file and the bundled fallback dataset.
//! The field names follow the long-standing reference JSON format so the
//! same documents can be read by every tier.

use serde::{Deserialize, Serialize};

use crate::constraints::ModelConstraints;

// ---------------------------------------------------------------------------
// Baselines
// ---------------------------------------------------------------------------

/// Baseline assumed for models the catalog does not know.
///
/// The most common architecture rather than "unknown", so ambiguous names
/// are not over-rejected downstream.
pub const DEFAULT_BASELINE: &str = "stable diffusion 1";

/// Baselines whose models are admitted into the known-name set.
pub const ACCEPTED_BASELINES: [&str; 12] = [
    "stable diffusion 1",
    "stable diffusion 2",
    "stable diffusion 2 512",
    "stable_diffusion_xl",
    "stable_cascade",
    "flux_1",
    "wan_2_1",
    "wan_2_2",
    "ltx_video",
    "cogvideo",
    "mochi",
    "text_generation",
];

/// Baselines that produce video.
pub const VIDEO_BASELINES: [&str; 5] = ["wan_2_2", "wan_2_1", "ltx_video", "cogvideo", "mochi"];

/// Name fragments that mark a video model when nothing else does.
const VIDEO_NAME_MARKERS: [&str; 5] = ["t2v", "ti2v", "i2v", "ltxv", "video"];

pub fn is_accepted_baseline(baseline: &str) -> bool {
    ACCEPTED_BASELINES.contains(&baseline)
}

/// Media a registry record produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelMedia {
    Text,
    Image,
    Video,
}

impl ModelMedia {
    /// Decode the registry's numeric model type.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ModelMedia::Text),
            1 => Some(ModelMedia::Image),
            2 => Some(ModelMedia::Video),
            _ => None,
        }
    }
}

/// Infer a baseline from a model's name when the registry does not state one.
pub fn infer_baseline(name: &str, media: ModelMedia) -> &'static str {
    let lower = name.to_lowercase();

    match media {
        ModelMedia::Text => "text_generation",
        ModelMedia::Video => {
            if lower.contains("wan") {
                if lower.contains("2.1") {
                    "wan_2_1"
                } else {
                    "wan_2_2"
                }
            } else if lower.contains("ltx") {
                "ltx_video"
            } else if lower.contains("cogvideo") {
                "cogvideo"
            } else if lower.contains("mochi") {
                "mochi"
            } else {
                "wan_2_2"
            }
        }
        ModelMedia::Image => {
            if lower.contains("flux") {
                "flux_1"
            } else if lower.contains("sdxl") || lower.contains("xl") {
                "stable_diffusion_xl"
            } else if lower.contains("sd2") || lower.contains("2.1") {
                "stable diffusion 2"
            } else if lower.contains("cascade") {
                "stable_cascade"
            } else {
                DEFAULT_BASELINE
            }
        }
    }
}

/// Baseline hinted by a tag in an uncatalogued model's name.
pub fn baseline_hint(name: &str) -> Option<&'static str> {
    if name.contains("[SDXL]") {
        Some("stable_diffusion_xl")
    } else if name.contains("[Flux]") {
        Some("flux_1")
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// CatalogEntry
// ---------------------------------------------------------------------------

/// Capability flags of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub inpainting: bool,
    pub img2img: bool,
    pub controlnet: bool,
    pub lora: bool,
}

/// One known model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical, case-sensitive display name.
    pub name: String,
    #[serde(default)]
    pub baseline: String,
    /// `checkpoint`, `controlnet`, `lora` or `video`.
    #[serde(rename = "type", default = "default_model_type")]
    pub model_type: String,
    /// `generalist` or `video`.
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub inpainting: bool,
    #[serde(default)]
    pub img2img: bool,
    #[serde(default)]
    pub controlnet: bool,
    #[serde(default)]
    pub lora: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    /// Free-form worker requirements (e.g. minimum VRAM, clip skip).
    #[serde(default)]
    pub requirements: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ModelConstraints>,
    #[serde(rename = "_chain_id", default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(rename = "_vram_mb", default, skip_serializing_if = "Option::is_none")]
    pub vram_mb: Option<u32>,
    #[serde(rename = "_size_bytes", default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(rename = "_ipfs_cid", default, skip_serializing_if = "Option::is_none")]
    pub ipfs_cid: Option<String>,
    #[serde(rename = "_download_url", default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

fn default_model_type() -> String {
    "checkpoint".to_string()
}

fn default_style() -> String {
    "generalist".to_string()
}

impl CatalogEntry {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            inpainting: self.inpainting,
            img2img: self.img2img,
            controlnet: self.controlnet,
            lora: self.lora,
        }
    }

    pub fn is_controlnet(&self) -> bool {
        self.controlnet || self.model_type == "controlnet"
    }

    /// Whether this model generates video, judged by style, type, baseline
    /// and finally by name.
    pub fn is_video(&self) -> bool {
        if self.style == "video" || self.model_type == "video" {
            return true;
        }
        if VIDEO_BASELINES.contains(&self.baseline.to_lowercase().as_str()) {
            return true;
        }
        is_video_name(&self.name)
    }
}

/// Name-only video heuristic, used for models absent from the catalog.
pub fn is_video_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIDEO_NAME_MARKERS.iter().any(|m| lower.contains(m))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

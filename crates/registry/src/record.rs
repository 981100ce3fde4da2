//! Registry wire records and their conversion into catalog entries.

use grid_core::catalog::{self, CatalogEntry, ModelMedia};
use grid_core::constraints::ModelConstraints;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// One model record as served by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    #[serde(default)]
    pub hash: String,
    /// 0 = text, 1 = image, 2 = video.
    pub model_type: u8,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub ipfs_cid: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub vram_mb: u32,
    /// Baseline stated by the registry; inferred from the name when empty.
    #[serde(default)]
    pub base_model: String,
    #[serde(default)]
    pub inpainting: bool,
    #[serde(default)]
    pub img2img: bool,
    #[serde(default)]
    pub controlnet: bool,
    #[serde(default)]
    pub lora: bool,
    pub active: bool,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub constraints: Option<ModelConstraints>,
}

impl RegistryRecord {
    /// An active record with everything else empty.
    pub fn new(name: impl Into<String>, media: ModelMedia) -> Self {
        let model_type = match media {
            ModelMedia::Text => 0,
            ModelMedia::Image => 1,
            ModelMedia::Video => 2,
        };
        Self {
            hash: String::new(),
            model_type,
            file_name: String::new(),
            name: name.into(),
            version: String::new(),
            ipfs_cid: String::new(),
            download_url: String::new(),
            size_bytes: 0,
            vram_mb: 0,
            base_model: String::new(),
            inpainting: false,
            img2img: false,
            controlnet: false,
            lora: false,
            active: true,
            nsfw: false,
            constraints: None,
        }
    }

    /// Display name, falling back to the file name.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.file_name.trim()
        } else {
            self.name.trim()
        }
    }

    /// Convert into a catalog entry.
    ///
    /// Inactive records yield `Ok(None)`. Records that cannot be interpreted
    /// yield an error; the caller skips them.
    pub fn into_entry(self, index: u64) -> Result<Option<CatalogEntry>, RegistryError> {
        if !self.active {
            return Ok(None);
        }

        let media = ModelMedia::from_code(self.model_type).ok_or_else(|| {
            RegistryError::Decode(format!(
                "record {index} has unknown model type {}",
                self.model_type
            ))
        })?;

        let name = self.display_name().to_string();
        if name.is_empty() {
            return Err(RegistryError::Decode(format!("record {index} has no name")));
        }

        let baseline = if self.base_model.trim().is_empty() {
            catalog::infer_baseline(&name, media).to_string()
        } else {
            self.base_model.trim().to_string()
        };

        let model_type = if self.controlnet {
            "controlnet"
        } else if self.lora {
            "lora"
        } else if media == ModelMedia::Video {
            "video"
        } else {
            "checkpoint"
        };
        let style = if media == ModelMedia::Video {
            "video"
        } else {
            "generalist"
        };

        let version = if self.version.is_empty() {
            "1.0".to_string()
        } else {
            self.version
        };

        Ok(Some(CatalogEntry {
            description: format!("{name} model"),
            name,
            baseline,
            model_type: model_type.to_string(),
            style: style.to_string(),
            nsfw: self.nsfw,
            inpainting: self.inpainting,
            img2img: self.img2img,
            controlnet: self.controlnet,
            lora: self.lora,
            version,
            requirements: Default::default(),
            constraints: self.constraints.filter(|c| c.has_constraints()),
            chain_id: Some(index),
            vram_mb: (self.vram_mb > 0).then_some(self.vram_mb),
            size_bytes: (self.size_bytes > 0).then_some(self.size_bytes),
            ipfs_cid: non_empty(self.ipfs_cid),
            download_url: non_empty(self.download_url),
        }))
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn inactive_records_are_skipped() {
        let mut record = RegistryRecord::new("Old Model", ModelMedia::Image);
        record.active = false;
        assert_matches!(record.into_entry(3), Ok(None));
    }

    #[test]
    fn baseline_inferred_when_missing() {
        let entry = RegistryRecord::new("FLUX.1-dev", ModelMedia::Image)
            .into_entry(1)
            .unwrap()
            .unwrap();
        assert_eq!(entry.baseline, "flux_1");
        assert_eq!(entry.model_type, "checkpoint");
        assert_eq!(entry.style, "generalist");
        assert_eq!(entry.version, "1.0");
        assert_eq!(entry.chain_id, Some(1));
    }

    #[test]
    fn stated_baseline_wins() {
        let mut record = RegistryRecord::new("FLUX.1-dev", ModelMedia::Image);
        record.base_model = "stable_diffusion_xl".into();
        let entry = record.into_entry(1).unwrap().unwrap();
        assert_eq!(entry.baseline, "stable_diffusion_xl");
    }

    #[test]
    fn type_precedence() {
        let mut record = RegistryRecord::new("wan-control", ModelMedia::Video);
        record.controlnet = true;
        record.lora = true;
        let entry = record.clone().into_entry(1).unwrap().unwrap();
        assert_eq!(entry.model_type, "controlnet");
        assert_eq!(entry.style, "video");

        record.controlnet = false;
        assert_eq!(record.clone().into_entry(1).unwrap().unwrap().model_type, "lora");

        record.lora = false;
        assert_eq!(record.into_entry(1).unwrap().unwrap().model_type, "video");
    }

    #[test]
    fn file_name_used_when_display_name_empty() {
        let mut record = RegistryRecord::new("", ModelMedia::Image);
        record.file_name = "deliberate_v3.safetensors".into();
        let entry = record.into_entry(2).unwrap().unwrap();
        assert_eq!(entry.name, "deliberate_v3.safetensors");
    }

    #[test]
    fn nameless_record_is_malformed() {
        let record = RegistryRecord::new("  ", ModelMedia::Image);
        assert_matches!(record.into_entry(2), Err(RegistryError::Decode(_)));
    }

    #[test]
    fn unknown_media_is_malformed() {
        let mut record = RegistryRecord::new("x", ModelMedia::Image);
        record.model_type = 7;
        assert_matches!(record.into_entry(2), Err(RegistryError::Decode(_)));
    }

    #[test]
    fn empty_constraints_dropped() {
        let mut record = RegistryRecord::new("x", ModelMedia::Image);
        record.constraints = Some(ModelConstraints::default());
        assert!(record.into_entry(1).unwrap().unwrap().constraints.is_none());
    }
}

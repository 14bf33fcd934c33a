//! Asset type definitions

use serde::{Deserialize, Serialize};

/// Kinds of assets the cache can hold; each kind has at most one loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Model,
    Mesh,
    Texture,
    Material,
    Skeleton,
    Animation,
    Shader,
    Audio,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Mesh => "mesh",
            AssetKind::Texture => "texture",
            AssetKind::Material => "material",
            AssetKind::Skeleton => "skeleton",
            AssetKind::Animation => "animation",
            AssetKind::Shader => "shader",
            AssetKind::Audio => "audio",
        }
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssetStats {
    pub total_loads: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub entry_count: usize,
    pub current_size: usize,
}

impl AssetStats {
    /// Fraction of loads served from the cache, 0 when nothing was loaded
    pub fn hit_rate(&self) -> f64 {
        if self.total_loads == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_loads as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = AssetStats {
            total_loads: 4,
            cache_hits: 3,
            cache_misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < 1e-9);
        assert_eq!(AssetStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_asset_kind_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: AssetKind,
        }
        let parsed: Wrapper = toml::from_str(r#"kind = "texture""#).unwrap();
        assert_eq!(parsed.kind, AssetKind::Texture);
        assert_eq!(AssetKind::Skeleton.as_str(), "skeleton");
    }
}

//! Post-processing settings and their packed GPU constant block

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

bitflags! {
    /// One bit per post-process effect, mirrored in the constant block
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EffectFlags: u32 {
        const BLOOM = 1 << 0;
        const TONE_MAPPING = 1 << 1;
        const COLOR_GRADING = 1 << 2;
        const VIGNETTE = 1 << 3;
        const CHROMATIC_ABERRATION = 1 << 4;
        const FILM_GRAIN = 1 << 5;
        const FXAA = 1 << 6;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BloomSettings {
    pub enabled: bool,
    pub threshold: f32,
    pub intensity: f32,
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 1.0,
            intensity: 0.5,
            radius: 1.0,
        }
    }
}

/// Tone-mapping curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneMapOperator {
    Reinhard,
    #[default]
    Aces,
    Uncharted2,
}

impl ToneMapOperator {
    fn index(self) -> u32 {
        match self {
            ToneMapOperator::Reinhard => 0,
            ToneMapOperator::Aces => 1,
            ToneMapOperator::Uncharted2 => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToneMappingSettings {
    pub enabled: bool,
    pub operator: ToneMapOperator,
    pub exposure: f32,
    pub gamma: f32,
}

impl Default for ToneMappingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            operator: ToneMapOperator::Aces,
            exposure: 1.0,
            gamma: 2.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorGradingSettings {
    pub enabled: bool,
    pub contrast: f32,
    pub saturation: f32,
    pub brightness: f32,
    pub temperature: f32,
    pub tint: f32,
}

impl Default for ColorGradingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            contrast: 1.0,
            saturation: 1.0,
            brightness: 0.0,
            temperature: 0.0,
            tint: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VignetteSettings {
    pub enabled: bool,
    pub intensity: f32,
    pub smoothness: f32,
    pub roundness: f32,
}

impl Default for VignetteSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 0.3,
            smoothness: 0.5,
            roundness: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChromaticAberrationSettings {
    pub enabled: bool,
    pub intensity: f32,
}

impl Default for ChromaticAberrationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilmGrainSettings {
    pub enabled: bool,
    pub intensity: f32,
    /// How strongly grain fades in bright areas
    pub response: f32,
}

impl Default for FilmGrainSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 0.05,
            response: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FxaaSettings {
    pub enabled: bool,
    pub subpixel: f32,
    pub edge_threshold: f32,
    pub edge_threshold_min: f32,
}

impl Default for FxaaSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            subpixel: 0.75,
            edge_threshold: 0.166,
            edge_threshold_min: 0.0833,
        }
    }
}

/// Full post-processing configuration, one group per effect
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostProcessSettings {
    pub bloom: BloomSettings,
    pub tone_mapping: ToneMappingSettings,
    pub color_grading: ColorGradingSettings,
    pub vignette: VignetteSettings,
    pub chromatic_aberration: ChromaticAberrationSettings,
    pub film_grain: FilmGrainSettings,
    pub fxaa: FxaaSettings,
}

impl PostProcessSettings {
    /// Bits for every enabled effect
    pub fn enabled_effects(&self) -> EffectFlags {
        let mut flags = EffectFlags::empty();
        flags.set(EffectFlags::BLOOM, self.bloom.enabled);
        flags.set(EffectFlags::TONE_MAPPING, self.tone_mapping.enabled);
        flags.set(EffectFlags::COLOR_GRADING, self.color_grading.enabled);
        flags.set(EffectFlags::VIGNETTE, self.vignette.enabled);
        flags.set(EffectFlags::CHROMATIC_ABERRATION, self.chromatic_aberration.enabled);
        flags.set(EffectFlags::FILM_GRAIN, self.film_grain.enabled);
        flags.set(EffectFlags::FXAA, self.fxaa.enabled);
        flags
    }
}

/// Constant block consumed by the post-process shaders.
///
/// Every row is four 32-bit scalars so the layout matches a 16-byte aligned
/// uniform buffer without implicit padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PostProcessConstants {
    pub screen_size: [f32; 2],
    pub inv_screen_size: [f32; 2],

    pub time: f32,
    pub enabled_effects: u32,
    pub exposure: f32,
    pub gamma: f32,

    pub bloom_threshold: f32,
    pub bloom_intensity: f32,
    pub bloom_radius: f32,
    pub tone_map_operator: u32,

    pub contrast: f32,
    pub saturation: f32,
    pub brightness: f32,
    pub temperature: f32,

    pub tint: f32,
    pub vignette_intensity: f32,
    pub vignette_smoothness: f32,
    pub vignette_roundness: f32,

    pub chromatic_aberration: f32,
    pub grain_intensity: f32,
    pub grain_response: f32,
    pub fxaa_subpixel: f32,

    pub fxaa_edge_threshold: f32,
    pub fxaa_edge_threshold_min: f32,
    pub _padding: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<PostProcessConstants>() % 16 == 0);

impl PostProcessConstants {
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn effects(&self) -> EffectFlags {
        EffectFlags::from_bits_truncate(self.enabled_effects)
    }
}

/// Pack settings into the constant block in one pass.
/// `time` only feeds the animated film grain and is zeroed otherwise.
pub fn fill_post_process_constants(
    settings: &PostProcessSettings,
    width: u32,
    height: u32,
    time: f32,
) -> PostProcessConstants {
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;
    PostProcessConstants {
        screen_size: [w, h],
        inv_screen_size: [1.0 / w, 1.0 / h],
        time: if settings.film_grain.enabled { time } else { 0.0 },
        enabled_effects: settings.enabled_effects().bits(),
        exposure: settings.tone_mapping.exposure,
        gamma: settings.tone_mapping.gamma,
        bloom_threshold: settings.bloom.threshold,
        bloom_intensity: settings.bloom.intensity,
        bloom_radius: settings.bloom.radius,
        tone_map_operator: settings.tone_mapping.operator.index(),
        contrast: settings.color_grading.contrast,
        saturation: settings.color_grading.saturation,
        brightness: settings.color_grading.brightness,
        temperature: settings.color_grading.temperature,
        tint: settings.color_grading.tint,
        vignette_intensity: settings.vignette.intensity,
        vignette_smoothness: settings.vignette.smoothness,
        vignette_roundness: settings.vignette.roundness,
        chromatic_aberration: settings.chromatic_aberration.intensity,
        grain_intensity: settings.film_grain.intensity,
        grain_response: settings.film_grain.response,
        fxaa_subpixel: settings.fxaa.subpixel,
        fxaa_edge_threshold: settings.fxaa.edge_threshold,
        fxaa_edge_threshold_min: settings.fxaa.edge_threshold_min,
        _padding: [0.0; 2],
    }
}

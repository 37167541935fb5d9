// settings.rs - Run-wide compression settings and search tunables

use crate::error::SettingsError;
use std::fmt;
use std::str::FromStr;

const MIB: u64 = 1024 * 1024;

/// Size limits offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPreset {
    #[default]
    OneMb,
    TwoMb,
    FiveMb,
}

impl TargetPreset {
    pub const ALL: [TargetPreset; 3] = [Self::OneMb, Self::TwoMb, Self::FiveMb];

    pub fn bytes(&self) -> u64 {
        match self {
            Self::OneMb => MIB,
            Self::TwoMb => 2 * MIB,
            Self::FiveMb => 5 * MIB,
        }
    }

    pub fn megabytes(&self) -> u64 {
        self.bytes() / MIB
    }
}

impl fmt::Display for TargetPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}MB", self.megabytes())
    }
}

impl FromStr for TargetPreset {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        let number = trimmed.strip_suffix("mb").unwrap_or(&trimmed).trim();
        match number {
            "1" => Ok(Self::OneMb),
            "2" => Ok(Self::TwoMb),
            "5" => Ok(Self::FiveMb),
            _ => Err(SettingsError::UnknownPreset(s.to_string())),
        }
    }
}

/// Settings chosen once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionSettings {
    target_bytes: u64,
}

impl CompressionSettings {
    pub fn new(target_bytes: u64) -> Result<Self, SettingsError> {
        if target_bytes == 0 {
            return Err(SettingsError::ZeroTarget);
        }
        Ok(Self { target_bytes })
    }

    pub fn target_bytes(&self) -> u64 {
        self.target_bytes
    }
}

impl From<TargetPreset> for CompressionSettings {
    fn from(preset: TargetPreset) -> Self {
        Self {
            target_bytes: preset.bytes(),
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        TargetPreset::default().into()
    }
}

/// Tunables for the search and the batch scheduler.
///
/// The defaults are the production values; tests tweak them to exercise
/// edge cases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Fraction of the target the search aims for, leaving headroom below the limit.
    pub safety_margin: f64,
    /// Lower edge of the acceptance band for palette codecs, relative to the effective target.
    pub palette_band_floor: f64,
    /// Lower edge of the acceptance band for lossy codecs.
    pub lossy_band_floor: f64,
    /// Images compressed concurrently per group.
    pub group_width: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            safety_margin: 0.95,
            palette_band_floor: 0.8,
            lossy_band_floor: 0.7,
            group_width: 3,
        }
    }
}

impl SearchConfig {
    /// Byte count the search aims at for a given hard limit
    pub fn effective_target(&self, settings: &CompressionSettings) -> f64 {
        settings.target_bytes() as f64 * self.safety_margin
    }
}

//! Built-in visual themes and quality presets.
//!
//! Pure data: the catalog has no behavior beyond lookup.

use serde::{Deserialize, Serialize};

use crate::Color;

/// Ambient motion style painted behind the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Horizontal streaks scrolling with time.
    Streaks,
    /// Rising circles.
    Bubbles,
    /// Scrolling tiled blocks.
    Grid,
    /// Small drifting squares.
    Sparks,
}

/// A named visual theme: background colors, accent, particle behavior, font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub background_primary: Color,
    pub background_secondary: Color,
    pub accent: Color,
    pub particle_kind: ParticleKind,
    pub font_family: String,
}

/// A fixed output quality: surface dimensions, encoder bitrate, frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityPreset {
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Target encoder bitrate in bits per second.
    pub target_bitrate: u32,
    /// Encoder sampling rate in frames per second.
    pub frame_rate: f64,
}

/// Lookup table of built-in themes and quality presets.
pub struct ThemeCatalog {
    themes: Vec<Theme>,
    qualities: Vec<QualityPreset>,
}

impl ThemeCatalog {
    /// Build the catalog of built-in entries.
    pub fn builtin() -> Self {
        let hex = |s: &str| Color::from_hex(s).expect("builtin theme colors are valid hex");
        let themes = vec![
            Theme {
                id: "subway".into(),
                background_primary: hex("#101418"),
                background_secondary: hex("#1E2630"),
                accent: hex("#FFD447"),
                particle_kind: ParticleKind::Grid,
                font_family: "Inter".into(),
            },
            Theme {
                id: "midnight".into(),
                background_primary: hex("#0B0B1E"),
                background_secondary: hex("#26124A"),
                accent: hex("#7C6CFF"),
                particle_kind: ParticleKind::Streaks,
                font_family: "Inter".into(),
            },
            Theme {
                id: "sunrise".into(),
                background_primary: hex("#FF8C42"),
                background_secondary: hex("#FFD166"),
                accent: hex("#FFFFFF"),
                particle_kind: ParticleKind::Bubbles,
                font_family: "Inter".into(),
            },
            Theme {
                id: "arcade".into(),
                background_primary: hex("#12001A"),
                background_secondary: hex("#001A33"),
                accent: hex("#00F0FF"),
                particle_kind: ParticleKind::Sparks,
                font_family: "Inter".into(),
            },
        ];
        let qualities = vec![
            QualityPreset {
                id: "720p".into(),
                width: 720,
                height: 1280,
                target_bitrate: 2_500_000,
                frame_rate: 30.0,
            },
            QualityPreset {
                id: "1080p".into(),
                width: 1080,
                height: 1920,
                target_bitrate: 5_000_000,
                frame_rate: 30.0,
            },
            QualityPreset {
                id: "4k".into(),
                width: 2160,
                height: 3840,
                target_bitrate: 12_000_000,
                frame_rate: 30.0,
            },
        ];
        Self { themes, qualities }
    }

    /// Look up a theme by id.
    pub fn theme(&self, id: &str) -> Option<&Theme> {
        self.themes.iter().find(|t| t.id == id)
    }

    /// Look up a quality preset by id.
    pub fn quality(&self, id: &str) -> Option<&QualityPreset> {
        self.qualities.iter().find(|q| q.id == id)
    }

    pub fn themes(&self) -> &[Theme] {
        &self.themes
    }

    pub fn qualities(&self) -> &[QualityPreset] {
        &self.qualities
    }
}

impl Default for ThemeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

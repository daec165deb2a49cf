//! Advisory layer metadata for the stem visualizer.
//!
//! Layers are picked from a fixed taxonomy with random volumes. They are
//! display-only and do not reflect the actual separation result.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Symbolic glyph tag for a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerIcon {
    Microphone,
    Drum,
    Bass,
    Guitar,
    Piano,
    Waveform,
}

/// One visual layer of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: String,
    pub name: String,
    pub icon: LayerIcon,
    /// 0-100, all layers of an entry sum to ~100
    pub volume: u8,
}

/// Fixed layer taxonomy (id, display name, icon)
pub const TAXONOMY: &[(&str, &str, LayerIcon)] = &[
    ("vocals", "Vocals", LayerIcon::Microphone),
    ("drums", "Drums", LayerIcon::Drum),
    ("bass", "Bass", LayerIcon::Bass),
    ("guitar", "Guitar", LayerIcon::Guitar),
    ("piano", "Piano", LayerIcon::Piano),
    ("other", "Other", LayerIcon::Waveform),
];

const MIN_LAYERS: usize = 2;

/// Normalize raw volumes to percentages: `round(100 * raw_i / sum)`.
///
/// The result may be off by one or two after rounding. An all-zero input
/// is split evenly.
pub fn normalize_volumes(raw: &[u32]) -> Vec<u8> {
    if raw.is_empty() {
        return Vec::new();
    }

    let sum: u64 = raw.iter().map(|&v| u64::from(v)).sum();
    if sum == 0 {
        let share = (100.0 / raw.len() as f64).round() as u8;
        return vec![share; raw.len()];
    }

    raw.iter()
        .map(|&v| ((100.0 * f64::from(v)) / sum as f64).round() as u8)
        .collect()
}

/// Generate a random subset of the taxonomy with normalized volumes
pub fn generate_layers<R: Rng + ?Sized>(rng: &mut R) -> Vec<LayerInfo> {
    let count = rng.gen_range(MIN_LAYERS..=TAXONOMY.len());

    let mut indices: Vec<usize> = (0..TAXONOMY.len()).collect();
    indices.shuffle(rng);
    indices.truncate(count);
    indices.sort_unstable();

    let raw: Vec<u32> = indices.iter().map(|_| rng.gen_range(10..=100)).collect();
    let volumes = normalize_volumes(&raw);

    indices
        .into_iter()
        .zip(volumes)
        .map(|(i, volume)| {
            let (id, name, icon) = TAXONOMY[i];
            LayerInfo {
                id: id.to_string(),
                name: name.to_string(),
                icon,
                volume,
            }
        })
        .collect()
}

/// Sum of layer volumes (used to check the ~100 invariant)
pub fn total_volume(layers: &[LayerInfo]) -> u32 {
    layers.iter().map(|l| u32::from(l.volume)).sum()
}

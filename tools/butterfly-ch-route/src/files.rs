//! On-disk formats: JSON road networks and contracted graphs, TOML
//! contraction settings.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use butterfly_ch::{
    ContractionConfig, DirectedGraph, Factor, RoadNetwork, RoadSegment, TableProfile,
};
use serde::{Deserialize, Serialize};

/// A road network with its profile table. Segment `profile` fields index
/// into `profiles`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkFile {
    pub profiles: Vec<Factor>,
    pub segments: Vec<RoadSegment>,
}

impl NetworkFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read network {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse network {}", path.display()))
    }

    pub fn into_parts(self) -> (RoadNetwork, TableProfile) {
        (RoadNetwork::new(self.segments), TableProfile::new(self.profiles))
    }
}

pub fn load_graph(path: &Path) -> Result<DirectedGraph> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read graph {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse graph {}", path.display()))
}

pub fn save_graph(graph: &DirectedGraph, path: &Path) -> Result<()> {
    let text = serde_json::to_string(graph)?;
    fs::write(path, text).with_context(|| format!("Failed to write graph {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> Result<ContractionConfig> {
    let Some(path) = path else {
        return Ok(ContractionConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config {}", path.display()))
}

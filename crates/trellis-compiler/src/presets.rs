//! Sizing preset baselines
//!
//! A preset names a bundle of sizing/topology defaults the request can
//! override leaf by leaf. The table is built once at process start and
//! passed explicitly into the resolver; it is never mutated afterwards.

use std::collections::BTreeMap;

use trellis_common::crd::Preset;

/// Baseline sizing values for one preset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetBaseline {
    /// Control-plane replica count
    pub replicas: u32,
    /// CPU request quantity
    pub cpu_request: String,
    /// Memory request quantity
    pub memory_request: String,
    /// CPU limit quantity
    pub cpu_limit: String,
    /// Memory limit quantity
    pub memory_limit: String,
    /// Whether persistence is on by default
    pub persistence_enabled: bool,
    /// Volume claim size
    pub persistence_size: String,
    /// CoreDNS replica count
    pub coredns_replicas: u32,
}

/// Immutable lookup table of preset baselines
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetTable {
    entries: BTreeMap<Preset, PresetBaseline>,
}

impl PresetTable {
    /// The built-in baselines: ephemeral single-replica dev, HA persistent
    /// prod.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            Preset::Dev,
            PresetBaseline {
                replicas: 1,
                cpu_request: "200m".to_string(),
                memory_request: "512Mi".to_string(),
                cpu_limit: "1000m".to_string(),
                memory_limit: "1Gi".to_string(),
                persistence_enabled: false,
                persistence_size: "5Gi".to_string(),
                coredns_replicas: 1,
            },
        );
        entries.insert(
            Preset::Prod,
            PresetBaseline {
                replicas: 3,
                cpu_request: "500m".to_string(),
                memory_request: "1Gi".to_string(),
                cpu_limit: "2".to_string(),
                memory_limit: "2Gi".to_string(),
                persistence_enabled: true,
                persistence_size: "10Gi".to_string(),
                coredns_replicas: 2,
            },
        );
        Self { entries }
    }

    /// Look up the baseline for a preset.
    pub fn get(&self, preset: Preset) -> Option<&PresetBaseline> {
        self.entries.get(&preset)
    }
}

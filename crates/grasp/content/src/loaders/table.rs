//! Interaction table loader.
//!
//! A table names reusable parameter profiles and places targets that refer
//! to them:
//!
//! ```text
//! (
//!     profiles: {
//!         "door": (capability: Some("ability.open_door"), max_angle: 120.0),
//!     },
//!     targets: [
//!         (id: 1, profile: "door", location: (x: 300.0, y: 0.0, z: 0.0)),
//!     ],
//! )
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use grasp_core::{
    InteractionParameters, InteractionPoint, PayloadItem, TargetActor, TargetId, Vec3,
};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

fn default_forward() -> Vec3 {
    Vec3::FORWARD
}

/// One placed target in an interaction table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: u64,
    pub profile: String,
    pub location: Vec3,
    #[serde(default = "default_forward")]
    pub forward: Vec3,
    #[serde(default)]
    pub points: Vec<InteractionPoint>,
    #[serde(default)]
    pub payload: Vec<String>,
}

/// Parameter profiles and the targets placed with them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionTable {
    #[serde(default)]
    pub profiles: BTreeMap<String, InteractionParameters>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

impl InteractionTable {
    pub fn profile(&self, name: &str) -> Option<&InteractionParameters> {
        self.profiles.get(name)
    }

    /// Builds a live target for every placement.
    pub fn spawn(&self) -> LoadResult<Vec<Arc<TargetActor>>> {
        self.targets
            .iter()
            .map(|spec| {
                let params = self
                    .profile(&spec.profile)
                    .with_context(|| format!("target {} uses unknown profile {:?}", spec.id, spec.profile))?;
                let actor = TargetActor::new(TargetId(spec.id), spec.location, params.clone())
                    .with_forward(spec.forward)
                    .with_points(spec.points.clone())
                    .with_payload(spec.payload.iter().cloned().map(PayloadItem).collect());
                Ok(Arc::new(actor))
            })
            .collect()
    }

    fn validate(&mut self) -> LoadResult<()> {
        for (name, params) in self.profiles.iter_mut() {
            *params = params.sanitized();
            params
                .validate()
                .with_context(|| format!("profile {:?} is invalid", name))?;
        }

        let mut seen = HashSet::new();
        for spec in &self.targets {
            anyhow::ensure!(seen.insert(spec.id), "duplicate target id {}", spec.id);
            anyhow::ensure!(
                self.profiles.contains_key(&spec.profile),
                "target {} uses unknown profile {:?}",
                spec.id,
                spec.profile
            );
        }
        Ok(())
    }
}

/// Loader for interaction tables from RON files.
pub struct TableLoader;

impl TableLoader {
    /// Load, normalise and validate an interaction table from a RON file.
    pub fn load(path: &Path) -> LoadResult<InteractionTable> {
        let content = read_file(path)?;
        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse, normalise and validate an interaction table from RON text.
    ///
    /// Highlight distances are normalised before validation, so a profile
    /// with a highlight distance below its max distance is raised rather
    /// than rejected.
    pub fn parse(content: &str) -> LoadResult<InteractionTable> {
        let mut table: InteractionTable = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse interaction table RON: {}", e))?;
        table.validate()?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_core::{CapabilityKey, Interactable};

    #[test]
    fn spawns_targets_from_profiles() {
        let table = TableLoader::parse(
            r#"(
                profiles: {
                    "door": (capability: Some("ability.open_door"), max_angle: 120.0),
                },
                targets: [
                    (id: 1, profile: "door", location: (x: 300.0, y: 0.0, z: 0.0), payload: ["key.brass"]),
                ],
            )"#,
        )
        .expect("valid table");

        let targets = table.spawn().expect("spawn");
        assert_eq!(targets.len(), 1);
        let door = &targets[0];
        assert_eq!(door.id(), TargetId(1));
        let params = door.parameters().expect("params");
        assert_eq!(params.capability, Some(CapabilityKey::new("ability.open_door")));
        assert_eq!(params.max_angle, 120.0);
        assert_eq!(params.max_distance, 200.0);
        assert_eq!(door.payload(), vec![PayloadItem("key.brass".into())]);
    }

    #[test]
    fn zero_angle_profile_is_rejected() {
        let err = TableLoader::parse(r#"(profiles: { "broken": (max_angle: 0.0) })"#).unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[test]
    fn low_highlight_distance_is_raised() {
        let table = TableLoader::parse(
            r#"(profiles: { "chest": (max_distance: 250.0, max_highlight_distance: 100.0) })"#,
        )
        .expect("normalised");
        assert_eq!(table.profile("chest").map(|p| p.max_highlight_distance), Some(250.0));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = TableLoader::parse(
            r#"(
                profiles: { "p": () },
                targets: [
                    (id: 4, profile: "p", location: (x: 0.0, y: 0.0, z: 0.0)),
                    (id: 4, profile: "p", location: (x: 1.0, y: 0.0, z: 0.0)),
                ],
            )"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate target id 4"));
    }
}

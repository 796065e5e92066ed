//! Blueprints: TOML descriptions of a system tree, built by name.
//!
//! ```toml
//! [[system]]
//! name = "game"
//!
//! [[system]]
//! name = "audio"
//! parent = "game"
//! ```
//!
//! Children are attached in declaration order, which is also their
//! delivery order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{LinkMode, System, SystemId, SystemTree};

const INLINE_SOURCE: &str = "<inline>";

/// One declared system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, rename = "system")]
    pub systems: Vec<SystemSpec>,
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Blueprint {
    pub fn new(systems: Vec<SystemSpec>) -> Self {
        Self {
            systems,
            source: None,
        }
    }

    pub fn from_toml_str(content: &str) -> ApplicationResult<Self> {
        toml::from_str(content).map_err(|e| ApplicationError::Blueprint {
            path: PathBuf::from(INLINE_SOURCE),
            message: e.to_string(),
        })
    }

    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> ApplicationResult<Self> {
        let content = fs::read_to_string(path).with_path_context("read blueprint", path)?;
        let mut blueprint: Self =
            toml::from_str(&content).map_err(|e| ApplicationError::Blueprint {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        blueprint.source = Some(path.to_path_buf());
        Ok(blueprint)
    }

    /// File the blueprint was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn invalid(&self, message: impl Into<String>) -> ApplicationError {
        ApplicationError::Blueprint {
            path: self
                .source
                .clone()
                .unwrap_or_else(|| PathBuf::from(INLINE_SOURCE)),
            message: message.into(),
        }
    }

    /// Names of systems declared without a parent, in declaration order.
    pub fn roots(&self) -> Vec<&str> {
        self.systems
            .iter()
            .filter(|s| s.parent.is_none())
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Check names are unique, parents exist and parent chains end at a root.
    pub fn validate(&self) -> ApplicationResult<()> {
        if self.systems.is_empty() {
            return Err(self.invalid("no systems declared"));
        }

        let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
        for spec in &self.systems {
            if parents
                .insert(spec.name.as_str(), spec.parent.as_deref())
                .is_some()
            {
                return Err(self.invalid(format!("duplicate system name '{}'", spec.name)));
            }
        }

        for spec in &self.systems {
            let mut seen = HashSet::from([spec.name.as_str()]);
            let mut current = spec.parent.as_deref();
            while let Some(name) = current {
                let Some(&next) = parents.get(name) else {
                    return Err(self.invalid(format!(
                        "system '{}' names unknown parent '{}'",
                        spec.name, name
                    )));
                };
                if !seen.insert(name) {
                    return Err(self.invalid(format!("cycle through system '{}'", spec.name)));
                }
                current = next;
            }
        }
        Ok(())
    }

    /// Spawn every declared system with `factory` and link the hierarchy.
    #[instrument(level = "debug", skip(self, factory))]
    pub fn build<K, F>(&self, mode: LinkMode, mut factory: F) -> ApplicationResult<BuiltTree<K>>
    where
        F: FnMut(&SystemSpec) -> Box<dyn System<K>>,
    {
        self.validate()?;

        let mut tree = SystemTree::with_mode(mode);
        let mut ids = BTreeMap::new();
        for spec in &self.systems {
            let id = tree.spawn_boxed(factory(spec));
            ids.insert(spec.name.clone(), id);
        }
        for spec in &self.systems {
            if let Some(parent) = &spec.parent {
                tree.try_add_child(ids[parent], ids[&spec.name])?;
            }
        }
        debug!(systems = ids.len(), "blueprint built");

        let names = ids.iter().map(|(name, &id)| (id, name.clone())).collect();
        Ok(BuiltTree { tree, ids, names })
    }
}

/// A tree built from a blueprint, with name lookup in both directions.
#[derive(Debug)]
pub struct BuiltTree<K> {
    pub tree: SystemTree<K>,
    ids: BTreeMap<String, SystemId>,
    names: HashMap<SystemId, String>,
}

impl<K> BuiltTree<K> {
    pub fn id(&self, name: &str) -> ApplicationResult<SystemId> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ApplicationError::UnknownName(name.to_string()))
    }

    pub fn name(&self, id: SystemId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Distinct tree roots, ordered by name.
    pub fn roots(&self) -> Vec<SystemId> {
        self.ids
            .values()
            .copied()
            .filter(|&id| self.tree.parent(id).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Named;

    const GAME: &str = r#"
[[system]]
name = "game"

[[system]]
name = "audio"
parent = "game"

[[system]]
name = "render"
parent = "game"

[[system]]
name = "mixer"
parent = "audio"
"#;

    fn named(spec: &SystemSpec) -> Box<dyn System<String>> {
        Box::new(Named(spec.name.clone()))
    }

    #[test]
    fn given_valid_blueprint_when_building_then_children_follow_declaration_order() {
        let blueprint = Blueprint::from_toml_str(GAME).unwrap();
        let built = blueprint.build(LinkMode::Literal, named).unwrap();

        let game = built.id("game").unwrap();
        let children: Vec<_> = built
            .tree
            .children(game)
            .iter()
            .map(|&id| built.name(id).unwrap())
            .collect();
        assert_eq!(children, vec!["audio", "render"]);
        assert_eq!(built.roots(), vec![game]);
        assert_eq!(blueprint.roots(), vec!["game"]);
        assert_eq!(built.tree.height(game), 3);
    }

    #[test]
    fn given_unknown_name_when_looking_up_then_errors() {
        let built = Blueprint::from_toml_str(GAME)
            .unwrap()
            .build(LinkMode::Literal, named)
            .unwrap();
        assert!(matches!(
            built.id("physics"),
            Err(ApplicationError::UnknownName(name)) if name == "physics"
        ));
    }

    #[test]
    fn given_invalid_toml_then_reports_blueprint_error() {
        let err = Blueprint::from_toml_str("[[system]\nname=").unwrap_err();
        assert!(matches!(err, ApplicationError::Blueprint { .. }));
    }
}

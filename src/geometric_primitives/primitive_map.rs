// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricPrimitiveMap type.
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::exception::{unresolved_reference, HiqpException, HiqpResult};
use crate::geometric_primitives::{GeometricPrimitive, Shape};

/// Registry of all geometric primitives, keyed by name.
///
/// Tasks refer to primitives by name only. The map keeps a reverse index from primitive to the
/// tasks which use it, so a primitive cannot disappear underneath a task.
#[derive(Debug, Clone, Default)]
pub struct GeometricPrimitiveMap {
    primitives: BTreeMap<String, GeometricPrimitive>,
    references: BTreeMap<String, BTreeSet<String>>,
}

impl GeometricPrimitiveMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a primitive or replaces the primitive with the same name.
    /// Nothing changes if the primitive cannot be created.
    ///
    /// # Arguments
    /// * `name` - Unique name of the primitive.
    /// * `kind` - Type name, e.g. `"sphere"`.
    /// * `frame_id` - Link the primitive is attached to.
    /// * `visible` - Whether the primitive is rendered.
    /// * `color` - RGBA color.
    /// * `parameters` - Type specific parameters.
    /// # Errors
    /// * UnknownPrimitiveType if `kind` is not a primitive type name.
    /// * InvalidParameterCount if the number of parameters does not fit the type.
    /// * InvalidParameter if a value cannot be used.
    pub fn set(
        &mut self,
        name: &str,
        kind: &str,
        frame_id: &str,
        visible: bool,
        color: &[f64],
        parameters: &[f64],
    ) -> HiqpResult<()> {
        let primitive = GeometricPrimitive::new(name, kind, frame_id, visible, color, parameters)?;
        match self.primitives.insert(name.to_string(), primitive) {
            Some(_) => debug!(primitive = name, "replaced geometric primitive"),
            None => debug!(primitive = name, kind, frame_id, "added geometric primitive"),
        }
        Ok(())
    }

    /// Returns the shape of a primitive if it exists and has type `T`.
    pub fn get<T: Shape>(&self, name: &str) -> Option<&T> {
        self.primitives.get(name).and_then(|p| p.shape_as::<T>())
    }

    pub fn primitive(&self, name: &str) -> Option<&GeometricPrimitive> {
        self.primitives.get(name)
    }

    /// Looks up a primitive which is referenced by a task.
    ///
    /// # Errors
    /// * UnresolvedPrimitiveReference if there is no primitive with this name.
    pub fn resolve(&self, name: &str) -> HiqpResult<&GeometricPrimitive> {
        self.primitives
            .get(name)
            .ok_or_else(|| unresolved_reference(format!("no primitive named '{}' exists", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.primitives.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// All primitives ordered by name.
    pub fn list(&self) -> Vec<&GeometricPrimitive> {
        self.primitives.values().collect()
    }

    /// Removes a primitive.
    ///
    /// # Errors
    /// * UnresolvedPrimitiveReference if there is no primitive with this name.
    /// * PrimitiveInUse if a task still references the primitive.
    pub fn remove(&mut self, name: &str) -> HiqpResult<()> {
        if !self.primitives.contains_key(name) {
            return Err(unresolved_reference(format!(
                "no primitive named '{}' exists",
                name
            )));
        }
        let tasks = self.referencing_tasks(name);
        if !tasks.is_empty() {
            return Err(HiqpException::PrimitiveInUse {
                primitive: name.to_string(),
                tasks,
            });
        }
        self.primitives.remove(name);
        debug!(primitive = name, "removed geometric primitive");
        Ok(())
    }

    /// Removes every primitive which is not referenced by a task.
    ///
    /// # Return
    /// Names of the primitives which were kept because tasks still use them.
    pub fn remove_all(&mut self) -> Vec<String> {
        let kept: Vec<String> = self
            .primitives
            .keys()
            .filter(|name| !self.referencing_tasks(name).is_empty())
            .cloned()
            .collect();
        self.primitives.retain(|name, _| kept.contains(name));
        if !kept.is_empty() {
            warn!(primitives = ?kept, "kept geometric primitives which are still in use");
        }
        kept
    }

    /// Names of the tasks which reference a primitive, ordered by name.
    pub fn referencing_tasks(&self, name: &str) -> Vec<String> {
        self.references
            .get(name)
            .map(|tasks| tasks.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Records that `task` uses the given primitives.
    pub fn add_references(&mut self, task: &str, primitives: &[String]) {
        for primitive in primitives {
            self.references
                .entry(primitive.clone())
                .or_default()
                .insert(task.to_string());
        }
    }

    /// Forgets every reference held by `task`.
    pub fn remove_references(&mut self, task: &str) {
        for tasks in self.references.values_mut() {
            tasks.remove(task);
        }
        self.references.retain(|_, tasks| !tasks.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::{status_code, HiqpException};
    use crate::geometric_primitives::{GeometricPoint, GeometricPrimitiveMap, GeometricSphere};

    const GREEN: [f64; 4] = [0., 1., 0., 1.];

    fn map_with_points() -> GeometricPrimitiveMap {
        let mut map = GeometricPrimitiveMap::new();
        map.set("p1", "point", "ee", true, &GREEN, &[0., 0., 0.])
            .unwrap();
        map.set("p2", "point", "link1", true, &GREEN, &[1., 0., 0.])
            .unwrap();
        map
    }

    #[test]
    fn set_and_get_typed() {
        let map = map_with_points();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get::<GeometricPoint>("p2").unwrap().x(), 1.);
        assert!(map.get::<GeometricSphere>("p2").is_none());
        assert!(map.get::<GeometricPoint>("p3").is_none());
        let names: Vec<&str> = map.list().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn failed_set_keeps_existing_primitive() {
        let mut map = map_with_points();
        let result = map.set("p1", "point", "ee", true, &GREEN, &[1., 2.]);
        assert!(matches!(
            result,
            Err(HiqpException::InvalidParameterCount { got: 2, .. })
        ));
        assert_eq!(status_code(&result), -1);
        assert_eq!(map.get::<GeometricPoint>("p1").unwrap().x(), 0.);
        map.set("p1", "sphere", "ee", true, &GREEN, &[0., 0., 0., 0.2])
            .unwrap();
        assert_eq!(map.get::<GeometricSphere>("p1").unwrap().radius(), 0.2);
    }

    #[test]
    fn referenced_primitives_are_not_removed() {
        let mut map = map_with_points();
        map.add_references("t1", &["p1".to_string()]);
        map.add_references("t2", &["p1".to_string(), "p2".to_string()]);
        match map.remove("p1") {
            Err(HiqpException::PrimitiveInUse { primitive, tasks }) => {
                assert_eq!(primitive, "p1");
                assert_eq!(tasks, vec!["t1".to_string(), "t2".to_string()]);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(map.contains("p1"));
        map.remove_references("t2");
        assert!(map.remove("p2").is_ok());
        assert!(map.remove("p1").is_err());
        map.remove_references("t1");
        assert!(map.remove("p1").is_ok());
        assert!(map.is_empty());
        assert_eq!(status_code(&map.remove("p1")), -3);
    }

    #[test]
    fn remove_all_keeps_referenced_primitives() {
        let mut map = map_with_points();
        map.add_references("t1", &["p2".to_string()]);
        assert_eq!(map.remove_all(), vec!["p2".to_string()]);
        assert!(!map.contains("p1"));
        assert!(map.contains("p2"));
        assert!(map.resolve("p2").is_ok());
        assert!(matches!(
            map.resolve("p1"),
            Err(HiqpException::UnresolvedPrimitiveReference { .. })
        ));
    }
}

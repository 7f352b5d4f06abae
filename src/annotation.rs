//! Annotations produced during one validate call, and the per-location record
//! of failed schema evaluations used to filter them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::location::SchemaLocation;
use crate::path::NodePath;

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Bool(bool),
    /// Largest index (plus one) an array applicator evaluated
    Count(usize),
    /// Property names an object applicator evaluated
    Names(BTreeSet<String>),
    /// Exact array indexes, as produced by `contains`
    Indexes(Vec<usize>),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub instance_location: NodePath,
    pub evaluation_path: NodePath,
    pub schema_location: SchemaLocation,
    pub keyword: Arc<str>,
    pub value: AnnotationValue,
}

/// Append-only multimap of annotations keyed by instance location
#[derive(Debug, Default)]
pub struct Annotations {
    values: HashMap<NodePath, Vec<Annotation>>,
}

impl Annotations {
    pub fn put(&mut self, annotation: Annotation) {
        self.values
            .entry(annotation.instance_location.clone())
            .or_default()
            .push(annotation);
    }

    pub fn at(&self, instance_location: &NodePath) -> &[Annotation] {
        self.values
            .get(instance_location)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Annotations at `instance_location` produced under the evaluation path
    /// `scope`, i.e. by the keyword's siblings or anything they applied.
    pub fn adjacent<'a>(
        &'a self,
        instance_location: &NodePath,
        scope: &'a NodePath,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.at(instance_location)
            .iter()
            .filter(move |annotation| annotation.evaluation_path.starts_with(scope))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.values.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Evaluation paths of schemas that failed, keyed by instance location
#[derive(Debug, Default)]
pub struct InstanceResults {
    failed: HashMap<NodePath, Vec<NodePath>>,
}

impl InstanceResults {
    pub fn record_failure(&mut self, instance_location: &NodePath, evaluation_path: &NodePath) {
        self.failed
            .entry(instance_location.clone())
            .or_default()
            .push(evaluation_path.clone());
    }

    /// False when a schema on the way to `evaluation_path` failed at this
    /// instance location.
    pub fn is_valid(&self, instance_location: &NodePath, evaluation_path: &NodePath) -> bool {
        match self.failed.get(instance_location) {
            Some(failed) => !failed.iter().any(|path| evaluation_path.starts_with(path)),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(evaluation_path: NodePath, names: &[&str]) -> Annotation {
        Annotation {
            instance_location: NodePath::root(),
            evaluation_path,
            schema_location: SchemaLocation::document("json-schema:///"),
            keyword: Arc::from("properties"),
            value: AnnotationValue::Names(names.iter().map(|n| n.to_string()).collect()),
        }
    }

    #[test]
    fn test_adjacent_filters_by_scope() {
        let mut annotations = Annotations::default();
        let scope = NodePath::root().with_key("allOf").with_index(0);
        annotations.put(annotation(scope.with_key("properties"), &["a"]));
        annotations.put(annotation(
            NodePath::root().with_key("allOf").with_index(1).with_key("properties"),
            &["b"],
        ));

        let found: Vec<_> = annotations.adjacent(&NodePath::root(), &scope).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(annotations.len(), 2);
        assert!(annotations.at(&NodePath::root().with_key("x")).is_empty());
    }

    #[test]
    fn test_failed_schema_invalidates_nested_paths() {
        let mut results = InstanceResults::default();
        let branch = NodePath::root().with_key("anyOf").with_index(0);
        results.record_failure(&NodePath::root(), &branch);

        assert!(!results.is_valid(&NodePath::root(), &branch.with_key("properties")));
        assert!(results.is_valid(
            &NodePath::root(),
            &NodePath::root().with_key("anyOf").with_index(1).with_key("properties")
        ));
        assert!(results.is_valid(&NodePath::root().with_key("a"), &branch.with_key("properties")));
    }
}

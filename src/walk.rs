//! Walk listeners: hooks called around keyword, property and item evaluation
//! while a schema is walked.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::location::SchemaLocation;
use crate::message::ValidationMessage;
use crate::path::NodePath;
use crate::schema::SchemaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkFlow {
    Continue,
    /// Do not walk this keyword or child
    Skip,
}

/// What is about to be (or was just) walked
#[derive(Debug)]
pub struct WalkEvent<'a> {
    pub keyword: &'a str,
    pub schema: SchemaId,
    pub schema_location: &'a SchemaLocation,
    pub evaluation_path: NodePath,
    pub instance_location: &'a NodePath,
    pub instance: Option<&'a Value>,
    pub root: &'a Value,
}

pub trait WalkListener: Send + Sync {
    fn pre_walk(&self, _event: &WalkEvent<'_>) -> WalkFlow {
        WalkFlow::Continue
    }

    /// Called with the errors the walked part produced.
    fn post_walk(&self, _event: &WalkEvent<'_>, _errors: &[ValidationMessage]) {}
}

/// Listeners registered for one walk call
#[derive(Default, Clone)]
pub struct WalkConfig {
    keyword_listeners: HashMap<String, Vec<Arc<dyn WalkListener>>>,
    property_listeners: Vec<Arc<dyn WalkListener>>,
    item_listeners: Vec<Arc<dyn WalkListener>>,
}

impl WalkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every evaluation of `keyword`.
    pub fn keyword_listener(mut self, keyword: impl Into<String>, listener: Arc<dyn WalkListener>) -> Self {
        self.keyword_listeners
            .entry(keyword.into())
            .or_default()
            .push(listener);
        self
    }

    /// Listen to each property visited by `properties`, `patternProperties`
    /// and `additionalProperties`.
    pub fn property_listener(mut self, listener: Arc<dyn WalkListener>) -> Self {
        self.property_listeners.push(listener);
        self
    }

    /// Listen to each array element visited by the item applicators.
    pub fn item_listener(mut self, listener: Arc<dyn WalkListener>) -> Self {
        self.item_listeners.push(listener);
        self
    }

    pub fn keyword_listeners(&self, keyword: &str) -> &[Arc<dyn WalkListener>] {
        self.keyword_listeners
            .get(keyword)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn property_listeners(&self) -> &[Arc<dyn WalkListener>] {
        &self.property_listeners
    }

    pub fn item_listeners(&self) -> &[Arc<dyn WalkListener>] {
        &self.item_listeners
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChildKind {
    Property,
    Item,
}

/// Walk one child schema, notifying the property or item listeners around it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn walk_child(
    ctx: &mut ExecutionContext<'_>,
    kind: ChildKind,
    keyword: &str,
    schema: SchemaId,
    instance: Option<&Value>,
    root: &Value,
    instance_location: &NodePath,
    should_validate: bool,
) -> Result<()> {
    let walk = Arc::clone(ctx.walk_config());
    let listeners = match kind {
        ChildKind::Property => walk.property_listeners(),
        ChildKind::Item => walk.item_listeners(),
    };
    if listeners.is_empty() {
        return ctx.walk_schema(schema, instance, root, instance_location, should_validate);
    }

    let node = ctx.registry().node(schema);
    let event = WalkEvent {
        keyword,
        schema,
        schema_location: node.location(),
        evaluation_path: ctx.evaluation_path().clone(),
        instance_location,
        instance,
        root,
    };
    if listeners
        .iter()
        .any(|listener| listener.pre_walk(&event) == WalkFlow::Skip)
    {
        return Ok(());
    }
    let before = ctx.error_count();
    ctx.walk_schema(schema, instance, root, instance_location, should_validate)?;
    let errors = ctx.errors().get(before..).unwrap_or(&[]);
    for listener in listeners {
        listener.post_walk(&event, errors);
    }
    Ok(())
}

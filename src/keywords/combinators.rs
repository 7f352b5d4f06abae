//! `allOf`, `anyOf`, `oneOf`, `not` and `if`/`then`/`else`.

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::keywords::assertions::type_matches;
use crate::location::SchemaLocation;
use crate::message::{MessageBuilder, ValidationMessage};
use crate::path::NodePath;
use crate::registry::SchemaRegistry;
use crate::schema::SchemaId;
use crate::validator::{KeywordContext, KeywordValidator, ValidatorCommon, json_type_name};

type Compiled = Result<Option<Box<dyn KeywordValidator>>>;

/// One alternative of `anyOf`/`oneOf`
#[derive(Debug)]
struct Branch {
    schema: SchemaId,
    /// `$ref` of the alternative, matched against a discriminator mapping
    reference: Option<String>,
    /// A single `type`, with the location of that keyword
    single_type: Option<(String, SchemaLocation)>,
}

fn compile_branches(ctx: &KeywordContext<'_>) -> Result<Vec<Branch>> {
    let ids = ctx.schema_array()?;
    if ids.is_empty() {
        return Err(ctx.invalid(format!("{} must be a non-empty array", ctx.keyword)));
    }
    let location = ctx.schema_location();
    let values = ctx.value.as_array().map(Vec::as_slice).unwrap_or_default();
    Ok(ids
        .into_iter()
        .zip(values)
        .enumerate()
        .map(|(i, (schema, value))| Branch {
            schema,
            reference: value.get("$ref").and_then(Value::as_str).map(str::to_string),
            single_type: value
                .get("type")
                .and_then(Value::as_str)
                .map(|name| (name.to_string(), location.append_index(i).append_key("type"))),
        })
        .collect())
}

fn preload_schemas(registry: &SchemaRegistry, ids: impl IntoIterator<Item = SchemaId>, depth: usize) -> Result<()> {
    for id in ids {
        registry.node(id).preload(registry, depth)?;
    }
    Ok(())
}

/// Outcome of trying each alternative in isolation
#[derive(Debug, Default)]
struct Trial {
    valid: Vec<usize>,
    errors: Vec<ValidationMessage>,
    /// Errors of the alternative the discriminator selected, when it failed
    selected_errors: Option<Vec<ValidationMessage>>,
}

/// Evaluate alternatives one by one, each into its own sink.
///
/// With a discriminator in effect the alternative whose `$ref` it selects
/// decides the outcome and the loop stops there. `stop_after` ends the loop
/// once that many alternatives are valid.
#[allow(clippy::too_many_arguments)]
fn try_branches(
    branches: &[Branch],
    ctx: &mut ExecutionContext<'_>,
    instance: &Value,
    root: &Value,
    instance_location: &NodePath,
    stop_after: Option<usize>,
    type_shortcut: bool,
    keep_errors: bool,
) -> Result<Trial> {
    let discriminating =
        ctx.registry().config().discriminator && ctx.discriminator(instance_location).is_some();
    let mut trial = Trial::default();
    for (i, branch) in branches.iter().enumerate() {
        let mut scope = ctx.descend(i);
        if type_shortcut
            && let Some((expected, location)) = &branch.single_type
            && !type_matches(expected, instance)
        {
            let message = MessageBuilder::new(
                "type",
                location.clone(),
                scope.evaluation_path().with_key("type"),
                instance_location.clone(),
            )
            .argument(json_type_name(instance))
            .argument(expected)
            .path_type(scope.path_type())
            .build();
            trial.errors.push(message);
            continue;
        }

        let errors = {
            let mut sink = scope.isolate();
            sink.validate_schema(branch.schema, instance, root, instance_location)?;
            sink.finish()
        };

        if discriminating
            && let Some(reference) = &branch.reference
            && scope
                .discriminator_mut(instance_location)
                .is_some_and(|state| state.matches(reference))
        {
            if errors.is_empty() {
                trial.valid.push(i);
            } else {
                trial.selected_errors = Some(errors);
            }
            break;
        }

        if errors.is_empty() {
            trial.valid.push(i);
            if !discriminating && stop_after.is_some_and(|limit| trial.valid.len() >= limit) {
                break;
            }
        } else if keep_errors {
            trial.errors.extend(errors);
        }
    }
    Ok(trial)
}

/// Alternatives may stop early unless someone needs the annotations of the
/// ones that were skipped.
fn can_short_circuit(ctx: &ExecutionContext<'_>) -> bool {
    !ctx.config().annotation_collection && !ctx.unevaluated_in_scope()
}

/// Report the discriminator's value when no alternative was mapped to it.
fn report_unmatched_discriminator(
    common: &ValidatorCommon,
    message_key: &str,
    ctx: &mut ExecutionContext<'_>,
    instance_location: &NodePath,
) -> Result<()> {
    if !ctx.registry().config().discriminator {
        return Ok(());
    }
    let Some(state) = ctx.discriminator(instance_location) else {
        return Ok(());
    };
    let Some(value) = state.discriminating_value.clone() else {
        return Ok(());
    };
    if state.has_matched_schema() {
        return Ok(());
    }
    let message = MessageBuilder::new(
        "discriminator",
        common.schema_location().clone(),
        ctx.evaluation_path().clone(),
        instance_location.clone(),
    )
    .message_key(message_key)
    .argument(&state.property_name)
    .argument(value)
    .path_type(ctx.path_type())
    .build();
    ctx.add_error(message)
}

fn walk_branches(
    schemas: impl IntoIterator<Item = SchemaId>,
    ctx: &mut ExecutionContext<'_>,
    instance: Option<&Value>,
    root: &Value,
    instance_location: &NodePath,
    should_validate: bool,
) -> Result<()> {
    for (i, id) in schemas.into_iter().enumerate() {
        let mut scope = ctx.descend(i);
        scope.walk_schema(id, instance, root, instance_location, should_validate)?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct AllOfValidator {
    common: ValidatorCommon,
    schemas: Vec<SchemaId>,
}

impl AllOfValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let schemas = ctx.schema_array()?;
        if schemas.is_empty() {
            return Err(ctx.invalid("allOf must be a non-empty array"));
        }
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schemas,
        })))
    }
}

impl KeywordValidator for AllOfValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        for (i, id) in self.schemas.iter().enumerate() {
            let mut scope = ctx.descend(i);
            scope.validate_schema(*id, instance, root, instance_location)?;
        }
        Ok(())
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        walk_branches(self.schemas.iter().copied(), ctx, instance, root, instance_location, should_validate)
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_schemas(registry, self.schemas.iter().copied(), depth)
    }
}

#[derive(Debug)]
pub struct AnyOfValidator {
    common: ValidatorCommon,
    branches: Vec<Branch>,
    rendered: String,
}

impl AnyOfValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            branches: compile_branches(ctx)?,
            rendered: ctx.value.to_string(),
        })))
    }
}

impl KeywordValidator for AnyOfValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let stop_after = can_short_circuit(ctx).then_some(1);
        let trial = try_branches(
            &self.branches,
            ctx,
            instance,
            root,
            instance_location,
            stop_after,
            true,
            true,
        )?;
        if !trial.valid.is_empty() {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(&self.rendered)
            .build();
        ctx.add_error(message)?;
        ctx.extend_errors(trial.selected_errors.unwrap_or(trial.errors))?;
        report_unmatched_discriminator(
            &self.common,
            "discriminator.anyOf.no_match_found",
            ctx,
            instance_location,
        )
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        if let Some(instance) = instance
            && should_validate
        {
            self.validate(ctx, instance, root, instance_location)?;
        }
        walk_branches(
            self.branches.iter().map(|branch| branch.schema),
            ctx,
            instance,
            root,
            instance_location,
            false,
        )
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_schemas(registry, self.branches.iter().map(|branch| branch.schema), depth)
    }
}

#[derive(Debug)]
pub struct OneOfValidator {
    common: ValidatorCommon,
    branches: Vec<Branch>,
}

impl OneOfValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            branches: compile_branches(ctx)?,
        })))
    }
}

impl KeywordValidator for OneOfValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let stop_after = can_short_circuit(ctx).then_some(2);
        let keep_errors = !ctx.config().fail_fast;
        let trial = try_branches(
            &self.branches,
            ctx,
            instance,
            root,
            instance_location,
            stop_after,
            false,
            keep_errors,
        )?;
        if trial.valid.len() == 1 {
            return Ok(());
        }
        let message = if trial.valid.len() > 1 {
            let indexes = trial
                .valid
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.common
                .error(ctx, instance_location)
                .message_key("oneOf.indexes")
                .argument(trial.valid.len())
                .argument(indexes)
                .build()
        } else {
            self.common.error(ctx, instance_location).argument(0).build()
        };
        ctx.add_error(message)?;
        ctx.extend_errors(trial.selected_errors.unwrap_or(trial.errors))?;
        report_unmatched_discriminator(
            &self.common,
            "discriminator.oneOf.no_match_found",
            ctx,
            instance_location,
        )
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        if let Some(instance) = instance
            && should_validate
        {
            self.validate(ctx, instance, root, instance_location)?;
        }
        walk_branches(
            self.branches.iter().map(|branch| branch.schema),
            ctx,
            instance,
            root,
            instance_location,
            false,
        )
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_schemas(registry, self.branches.iter().map(|branch| branch.schema), depth)
    }
}

#[derive(Debug)]
pub struct NotValidator {
    common: ValidatorCommon,
    schema: SchemaId,
    rendered: String,
}

impl NotValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            schema: ctx.own_schema()?,
            rendered: ctx.value.to_string(),
        })))
    }
}

impl KeywordValidator for NotValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let errors = ctx.probe_schema(self.schema, instance, root, instance_location)?;
        if !errors.is_empty() {
            return Ok(());
        }
        let message = self
            .common
            .error(ctx, instance_location)
            .argument(&self.rendered)
            .build();
        ctx.add_error(message)
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        match instance {
            Some(instance) if should_validate => self.validate(ctx, instance, root, instance_location),
            _ => ctx.walk_schema(self.schema, instance, root, instance_location, false),
        }
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        registry.node(self.schema).preload(registry, depth)
    }
}

/// `if`, evaluated together with its `then` and `else` siblings.
#[derive(Debug)]
pub struct IfValidator {
    common: ValidatorCommon,
    condition: SchemaId,
    then: Option<SchemaId>,
    otherwise: Option<SchemaId>,
}

impl IfValidator {
    pub fn compile(ctx: &KeywordContext<'_>) -> Compiled {
        let branch = |keyword: &str| {
            ctx.sibling(keyword)
                .map(|value| ctx.sub_schema(ctx.parent.location().append_key(keyword), value))
                .transpose()
        };
        Ok(Some(Box::new(Self {
            common: ctx.common(),
            condition: ctx.own_schema()?,
            then: branch("then")?,
            otherwise: branch("else")?,
        })))
    }

    fn branches(&self) -> impl Iterator<Item = (&'static str, SchemaId)> + '_ {
        [("then", self.then), ("else", self.otherwise)]
            .into_iter()
            .filter_map(|(keyword, id)| id.map(|id| (keyword, id)))
    }
}

impl KeywordValidator for IfValidator {
    fn common(&self) -> &ValidatorCommon {
        &self.common
    }

    fn validate(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: &Value,
        root: &Value,
        instance_location: &NodePath,
    ) -> Result<()> {
        let errors = ctx.probe_schema(self.condition, instance, root, instance_location)?;
        let chosen = if errors.is_empty() {
            self.then.map(|id| ("then", id))
        } else {
            self.otherwise.map(|id| ("else", id))
        };
        if let Some((keyword, id)) = chosen {
            let mut scope = ctx.sibling(keyword);
            scope.validate_schema(id, instance, root, instance_location)?;
        }
        Ok(())
    }

    fn walk(
        &self,
        ctx: &mut ExecutionContext<'_>,
        instance: Option<&Value>,
        root: &Value,
        instance_location: &NodePath,
        should_validate: bool,
    ) -> Result<()> {
        if let Some(instance) = instance
            && should_validate
        {
            return self.validate(ctx, instance, root, instance_location);
        }
        ctx.walk_schema(self.condition, instance, root, instance_location, false)?;
        for (keyword, id) in self.branches() {
            let mut scope = ctx.sibling(keyword);
            scope.walk_schema(id, instance, root, instance_location, false)?;
        }
        Ok(())
    }

    fn preload(&self, registry: &SchemaRegistry, depth: usize) -> Result<()> {
        preload_schemas(
            registry,
            std::iter::once(self.condition).chain(self.branches().map(|(_, id)| id)),
            depth,
        )
    }
}

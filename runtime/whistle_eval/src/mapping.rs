//! Field-mapping execution.
//!
//! A function body is an ordered list of field mappings. Each one
//! evaluates its source expression, resolves its target, and routes the
//! value — once, or once per element when the mapping iterates over its
//! source.

use whistle_data::{Closure, ClosureArg, Data, Path};
use whistle_ir::{FieldMapping, MappingTarget, PackageRef, ValueSource, OUTPUT_VAR, WRITE_PARAM};

use crate::context::RuntimeContext;
use crate::errors::{not_iterable, overloaded_target, EvalResult};
use crate::target::{FunctionSinkTarget, SideTarget, Target, VariableTarget};

/// Execute a body's mappings in declaration order.
pub fn execute_mappings(ctx: &mut RuntimeContext, mappings: &[FieldMapping]) -> EvalResult<()> {
    for (index, mapping) in mappings.iter().enumerate() {
        execute_mapping(ctx, mapping).map_err(|err| {
            err.with_note(format!(
                "in field mapping {} of {}",
                index + 1,
                ctx.top_frame().name()
            ))
        })?;
    }
    Ok(())
}

/// Execute one field mapping.
pub fn execute_mapping(ctx: &mut RuntimeContext, mapping: &FieldMapping) -> EvalResult<()> {
    let value = ctx.evaluate(&mapping.value)?;
    let mut target = resolve_target(ctx, mapping)?;

    if mapping.iterate {
        // Per-element invocation in iteration order; each element's own
        // result is discarded. An absent source iterates zero times.
        for element in iteration_elements(&value)? {
            target.write(ctx, element)?;
        }
        return Ok(());
    }
    target.write(ctx, value)
}

/// The elements an iterated source expands into.
fn iteration_elements(value: &Data) -> EvalResult<Vec<Data>> {
    if value.is_empty_or_null() {
        return Ok(Vec::new());
    }
    match value.unwrap_all() {
        Data::Array(items) => Ok((**items).clone()),
        Data::Container(map) => Ok(map.values().cloned().collect()),
        Data::Dataset(ds) => Ok(ds.materialize()),
        other => Err(not_iterable(other.kind().name())),
    }
}

/// Resolve a mapping's target descriptor to a live target.
fn resolve_target(ctx: &mut RuntimeContext, mapping: &FieldMapping) -> EvalResult<Box<dyn Target>> {
    let mode = mapping.merge_mode;
    match &mapping.target {
        // No target: write the whole output variable.
        None => Ok(Box::new(VariableTarget::output(Path::empty(), mode))),
        Some(MappingTarget::Var { name, path }) => Ok(Box::new(VariableTarget::new(
            name.clone(),
            Path::parse(path)?,
            mode,
        ))),
        Some(MappingTarget::Field { path, side: false }) => {
            let parsed = if path == OUTPUT_VAR {
                Path::empty()
            } else {
                Path::parse(path)?
            };
            Ok(Box::new(VariableTarget::output(parsed, mode)))
        }
        Some(MappingTarget::Field { path, side: true }) => {
            Ok(Box::new(SideTarget::new(Path::parse(path)?, mode)))
        }
        Some(MappingTarget::Custom {
            package,
            name,
            args,
        }) => resolve_custom_sink(ctx, package.as_deref(), name, args),
    }
}

/// Resolve a custom sink: exactly one registered constructor wins; zero
/// matches fall back to a function call bound with a trailing free write
/// parameter; more than one is unsupported.
fn resolve_custom_sink(
    ctx: &mut RuntimeContext,
    package: Option<&str>,
    name: &str,
    args: &[ValueSource],
) -> EvalResult<Box<dyn Target>> {
    let mut ctor_args = Vec::with_capacity(args.len());
    for arg in args {
        ctor_args.push(ctx.evaluate(arg)?);
    }

    let packages: Vec<String> = match package {
        Some(package) => vec![package.to_string()],
        // Unqualified sinks resolve through the caller's visible packages.
        None => ctx.package_context().visible_packages(),
    };
    let constructors = ctx.registries().targets.lookup_in(&packages, name);
    match constructors.len() {
        0 => {
            let mut slots: Vec<ClosureArg> =
                ctor_args.into_iter().map(ClosureArg::Bound).collect();
            slots.push(ClosureArg::Free(WRITE_PARAM.to_string()));
            let closure = Closure::new(PackageRef::Named(packages), name, slots);
            Ok(Box::new(FunctionSinkTarget::new(closure)))
        }
        1 => constructors[0].construct(ctx, &ctor_args),
        count => Err(overloaded_target(name, count)),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

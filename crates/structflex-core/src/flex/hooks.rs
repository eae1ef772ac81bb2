//! Custom Hook Dispatcher
//!
//! A Tagged record type may carry an [`Expander`] (or a [`TypedExpander`],
//! which also receives the concrete target type) that replaces field-wise
//! Lower for that node and everything below it. A Plain struct type may
//! carry a [`Flattener`] doing the same for Lift.
//!
//! The dispatcher checks that the produced value fits the target before
//! writing it. A missing value is reported as `HookReturnedNil`, a value
//! of the wrong shape as `HookResultNotAssignable`.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::context::ConversionContext;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{PlainType, PlainValue, TaggedData, TaggedState, TaggedType, TaggedValue};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Custom Lower for a Tagged record type
pub trait Expander: fmt::Debug + Send + Sync {
    fn expand(&self, value: &TaggedValue) -> (Option<PlainValue>, Diagnostics);
}

/// Custom Lower that is told the concrete Plain type it must produce
pub trait TypedExpander: fmt::Debug + Send + Sync {
    fn expand_to(
        &self,
        value: &TaggedValue,
        target_type: &PlainType,
    ) -> (Option<PlainValue>, Diagnostics);
}

/// Custom Lift for a Plain struct type
pub trait Flattener: fmt::Debug + Send + Sync {
    fn flatten(
        &self,
        value: &PlainValue,
        target_type: &TaggedType,
    ) -> (Option<TaggedValue>, Diagnostics);
}

/// The Lower hook attached to an object type
#[derive(Debug, Clone)]
pub enum ExpandHook {
    Untyped(Arc<dyn Expander>),
    Typed(Arc<dyn TypedExpander>),
}

/// Run a Lower hook and assign its result to `target`
pub(crate) fn dispatch_expand(
    ctx: &ConversionContext<'_>,
    hook: &ExpandHook,
    source: &TaggedValue,
    target: &mut PlainValue,
    diags: &mut Diagnostics,
) {
    let target_type = target.plain_type();
    debug!(
        source_path = %ctx.source_path(),
        target_path = %ctx.target_path(),
        source_type = %source.ty,
        target_type = %target_type,
        "Using custom expander"
    );

    let (result, hook_diags) = match hook {
        ExpandHook::Untyped(hook) => hook.expand(source),
        ExpandHook::Typed(hook) => hook.expand_to(source, &target_type),
    };
    let failed = hook_diags.has_error();
    diags.append(hook_diags);
    if failed {
        return;
    }

    let Some(result) = result.filter(|v| !is_nil_result(v)) else {
        diags.push(ctx.diagnostic(
            DiagnosticCode::HookReturnedNil,
            format!("Expander for {} returned nil", source.ty),
        ));
        return;
    };

    match assign_plain(result, &target_type) {
        Ok(value) => *target = value,
        Err(result_type) => diags.push(
            ctx.diagnostic(
                DiagnosticCode::HookResultNotAssignable,
                format!("Expander result {result_type} is not assignable to {target_type}"),
            )
            .with_types(&result_type, &target_type),
        ),
    }
}

fn is_nil_result(value: &PlainValue) -> bool {
    matches!(
        value,
        PlainValue::Ref { value: None, .. } | PlainValue::Interface { value: None, .. }
    )
}

/// Fit a hook result to the target type, or return the result's type
fn assign_plain(result: PlainValue, target_type: &PlainType) -> Result<PlainValue, PlainType> {
    let result_type = result.plain_type();
    if result_type == *target_type {
        return Ok(result);
    }

    match target_type {
        PlainType::Interface(iface) => {
            let implements = result
                .as_struct()
                .is_some_and(|s| s.ty().implements(iface.name()));
            if implements {
                return Ok(PlainValue::Interface {
                    ty: Arc::clone(iface),
                    value: Some(Box::new(result)),
                });
            }
        }
        PlainType::Ref(elem) if **elem == result_type => {
            return Ok(PlainValue::Ref {
                elem: result_type,
                value: Some(Box::new(result)),
            });
        }
        _ => {}
    }

    match result {
        PlainValue::Ref {
            value: Some(inner), ..
        } if inner.plain_type() == *target_type => Ok(*inner),
        _ => Err(result_type),
    }
}

/// Run a Lift hook and assign its result to `target`
pub(crate) fn dispatch_flatten(
    ctx: &ConversionContext<'_>,
    hook: &Arc<dyn Flattener>,
    source: &PlainValue,
    target: &mut TaggedValue,
    diags: &mut Diagnostics,
) {
    let source_type = source.plain_type();
    debug!(
        source_path = %ctx.source_path(),
        target_path = %ctx.target_path(),
        source_type = %source_type,
        target_type = %target.ty,
        "Using custom flattener"
    );

    let (result, hook_diags) = hook.flatten(source, &target.ty);
    let failed = hook_diags.has_error();
    diags.append(hook_diags);
    if failed {
        return;
    }

    let Some(result) = result else {
        diags.push(ctx.diagnostic(
            DiagnosticCode::HookReturnedNil,
            format!("Flattener for {source_type} returned nil"),
        ));
        return;
    };

    if result.ty == target.ty {
        *target = result;
        return;
    }

    let wraps_element = target.ty.is_collection()
        && target.ty.element_type() == Some(&result.ty)
        && result.ty.object_type().is_some();
    if wraps_element {
        let elements = if result.is_null() { Vec::new() } else { vec![result] };
        target.state = TaggedState::Known(TaggedData::Elements(elements));
        return;
    }

    diags.push(
        ctx.diagnostic(
            DiagnosticCode::HookResultNotAssignable,
            format!("Flattener result {} is not assignable to {}", result.ty, target.ty),
        )
        .with_types(&result.ty, &target.ty),
    );
}

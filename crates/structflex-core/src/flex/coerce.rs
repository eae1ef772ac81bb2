//! Type Coercion Matrix
//!
//! Scalar conversions in both directions. Numeric widening is asymmetric:
//! a 64-bit Tagged number may land in a 32-bit Plain field, but a 32-bit
//! Tagged number never lands in a 64-bit one, and the same pairs are
//! rejected on Lift.
//!
//! Legacy mode collapses empty and absent: on Lower a zero scalar becomes an
//! absent reference, on Lift an absent reference becomes a present zero.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::context::ConversionContext;
use super::fields::FieldHints;
use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::model::{
    OpaqueKind, PlainType, PlainValue, TaggedData, TaggedState, TaggedType, TaggedValue,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

/// Whether a Tagged scalar type may be lowered into a Plain scalar type
///
/// `to` is the referenced type; reference optionality is handled separately.
pub fn lower_compatible(from: &TaggedType, to: &PlainType) -> bool {
    use PlainType as P;
    use TaggedType as T;
    matches!(
        (from, to),
        (T::Bool, P::Bool)
            | (T::Int64, P::Int64 | P::Int32)
            | (T::Int32, P::Int32)
            | (T::Float64, P::Float64 | P::Float32)
            | (T::Float32, P::Float32)
            | (T::String | T::Enum(_), P::String | P::Bytes | P::Enum(_))
            | (T::Opaque(OpaqueKind::Identifier), P::String)
            | (T::Opaque(OpaqueKind::Timestamp), P::Timestamp)
            | (T::Opaque(OpaqueKind::Document), P::Document)
    )
}

/// Whether a Plain scalar type may be lifted into a Tagged scalar type
pub fn lift_compatible(from: &PlainType, to: &TaggedType) -> bool {
    use PlainType as P;
    use TaggedType as T;
    matches!(
        (from, to),
        (P::Bool, T::Bool)
            | (P::Int64 | P::Int32, T::Int64)
            | (P::Int32, T::Int32)
            | (P::Float64 | P::Float32, T::Float64)
            | (P::Float32, T::Float32)
            | (P::String | P::Enum(_), T::String | T::Enum(_))
            | (P::String, T::Opaque(OpaqueKind::Identifier))
            | (P::Bytes, T::String)
            | (P::Timestamp, T::Opaque(OpaqueKind::Timestamp))
            | (P::Document, T::Opaque(OpaqueKind::Document))
    )
}

/// Lower a known Tagged scalar into `target`, a scalar or reference to one
pub(crate) fn lower_scalar(
    ctx: &ConversionContext<'_>,
    source: &TaggedValue,
    target: &mut PlainValue,
    hints: &FieldHints,
    diags: &mut Diagnostics,
) {
    let target_type = target.plain_type();
    let (value_type, by_reference) = match &target_type {
        PlainType::Ref(elem) => (elem.as_ref(), true),
        other => (other, false),
    };

    if !lower_compatible(&source.ty, value_type) {
        diags.push(ctx.incompatible(&source.ty, &target_type));
        return;
    }
    let Some(data) = source.data() else {
        return;
    };

    let value = match lower_leaf(data, value_type) {
        Ok(value) => value,
        Err(message) => {
            diags.push(ctx.diagnostic(DiagnosticCode::SourceNotConvertible, message));
            return;
        }
    };

    if !by_reference {
        *target = value;
        return;
    }
    if hints.legacy && value.is_zero() {
        debug!(
            source_path = %ctx.source_path(),
            target_path = %ctx.target_path(),
            "Legacy mode: zero value left as absent reference"
        );
        return;
    }
    *target = PlainValue::Ref {
        elem: value_type.clone(),
        value: Some(Box::new(value)),
    };
}

fn lower_leaf(data: &TaggedData, to: &PlainType) -> Result<PlainValue, String> {
    let value = match (data, to) {
        (TaggedData::Bool(b), PlainType::Bool) => PlainValue::Bool(*b),
        (TaggedData::Int64(n), PlainType::Int64) => PlainValue::Int64(*n),
        (TaggedData::Int64(n), PlainType::Int32) => PlainValue::Int32(*n as i32),
        (TaggedData::Int32(n), PlainType::Int32) => PlainValue::Int32(*n),
        (TaggedData::Float64(x), PlainType::Float64) => PlainValue::Float64(*x),
        (TaggedData::Float64(x), PlainType::Float32) => PlainValue::Float32(*x as f32),
        (TaggedData::Float32(x), PlainType::Float32) => PlainValue::Float32(*x),
        (TaggedData::Text(s), PlainType::String) => PlainValue::String(s.clone()),
        (TaggedData::Text(s), PlainType::Bytes) => PlainValue::Bytes(Some(s.as_bytes().to_vec())),
        (TaggedData::Text(s), PlainType::Enum(ty)) => PlainValue::enum_value(ty, s.clone()),
        (TaggedData::Text(s), PlainType::Timestamp) => {
            let at = DateTime::parse_from_rfc3339(s)
                .map_err(|e| format!("{s:?} is not an RFC 3339 timestamp: {e}"))?;
            PlainValue::Timestamp(at.with_timezone(&Utc))
        }
        (TaggedData::Text(s), PlainType::Document) => {
            let doc = serde_json::from_str(s)
                .map_err(|e| format!("document is not valid JSON: {e}"))?;
            PlainValue::Document(doc)
        }
        _ => return Err(format!("payload does not match target type {to}")),
    };
    Ok(value)
}

/// Lift a Plain scalar (or reference to one) into `target`
pub(crate) fn lift_scalar(
    ctx: &ConversionContext<'_>,
    source: &PlainValue,
    target: &mut TaggedValue,
    hints: &FieldHints,
    diags: &mut Diagnostics,
) {
    let source_type = source.plain_type();
    let value_type = source_type.unref();
    if !lift_compatible(value_type, &target.ty) {
        diags.push(ctx.incompatible(&source_type, &target.ty));
        return;
    }

    let value = match source {
        PlainValue::Ref { value: None, .. } => None,
        PlainValue::Ref { value: Some(inner), .. } => Some(inner.as_ref()),
        other => Some(other),
    };
    let Some(value) = value else {
        if hints.legacy {
            debug!(
                source_path = %ctx.source_path(),
                target_path = %ctx.target_path(),
                "Legacy mode: absent reference lifted as zero value"
            );
            target.state = zero_state(&target.ty);
        } else {
            target.state = TaggedState::Null;
        }
        return;
    };

    let data = match lift_leaf(value, &target.ty) {
        Ok(data) => data,
        Err(message) => {
            diags.push(ctx.diagnostic(DiagnosticCode::SourceNotConvertible, message));
            return;
        }
    };

    let empty_text = matches!(&data, TaggedData::Text(s) if s.is_empty());
    if empty_text
        && !hints.legacy
        && (matches!(target.ty, TaggedType::Enum(_)) || hints.omit_empty)
    {
        target.state = TaggedState::Null;
        return;
    }
    target.state = TaggedState::Known(data);
}

fn lift_leaf(value: &PlainValue, to: &TaggedType) -> Result<TaggedData, String> {
    let data = match (value, to) {
        (PlainValue::Bool(b), _) => TaggedData::Bool(*b),
        (PlainValue::Int32(n), TaggedType::Int32) => TaggedData::Int32(*n),
        (PlainValue::Int32(n), _) => TaggedData::Int64(i64::from(*n)),
        (PlainValue::Int64(n), _) => TaggedData::Int64(*n),
        (PlainValue::Float32(x), TaggedType::Float32) => TaggedData::Float32(*x),
        (PlainValue::Float32(x), _) => TaggedData::Float64(widen_f32(*x)),
        (PlainValue::Float64(x), _) => TaggedData::Float64(*x),
        (PlainValue::String(s), _) => TaggedData::Text(s.clone()),
        (PlainValue::Enum { value, .. }, _) => TaggedData::Text(value.clone()),
        (PlainValue::Bytes(bytes), _) => {
            let bytes = bytes.as_deref().unwrap_or_default();
            let text = std::str::from_utf8(bytes)
                .map_err(|e| format!("byte slice is not UTF-8: {e}"))?;
            TaggedData::Text(text.to_string())
        }
        (PlainValue::Timestamp(at), _) => {
            TaggedData::Text(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        (PlainValue::Document(doc), _) => TaggedData::Text(doc.to_string()),
        _ => return Err(format!("value does not match target type {to}")),
    };
    Ok(data)
}

/// Widen through the shortest decimal form so 0.1f32 lifts as 0.1
fn widen_f32(x: f32) -> f64 {
    x.to_string().parse().unwrap_or_else(|_| f64::from(x))
}

/// Known zero payload for a scalar type
pub(crate) fn zero_state(ty: &TaggedType) -> TaggedState {
    let data = match ty {
        TaggedType::Bool => TaggedData::Bool(false),
        TaggedType::Int32 => TaggedData::Int32(0),
        TaggedType::Int64 => TaggedData::Int64(0),
        TaggedType::Float32 => TaggedData::Float32(0.0),
        TaggedType::Float64 => TaggedData::Float64(0.0),
        TaggedType::String | TaggedType::Enum(_) | TaggedType::Opaque(_) => {
            TaggedData::Text(String::new())
        }
        _ => return TaggedState::Null,
    };
    TaggedState::Known(data)
}

//! Reflective conversion between the Tagged and Plain models
//!
//! [`lower`] walks a Tagged value and writes the matching Plain value;
//! [`lift`] goes the other way. Both match record fields by name (exactly,
//! case-insensitively, by plural form, then with the configured prefix),
//! coerce scalars along a fixed compatibility matrix, and report every
//! problem as a diagnostic instead of stopping.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

pub mod coerce;
pub mod context;
pub mod fields;
pub mod hooks;
pub mod names;
pub mod options;

mod collections;
mod expand;
mod flatten;
mod wrapper;

pub use coerce::{lift_compatible, lower_compatible};
pub use context::{ConversionContext, Direction};
pub use expand::lower;
pub use fields::{FieldDescriptor, FieldHints, FieldResolver, Side};
pub use flatten::lift;
pub use hooks::{ExpandHook, Expander, Flattener, TypedExpander};
pub use names::{pluralize, singularize, NameMatcher};
pub use options::{FlexOption, FlexOptions};

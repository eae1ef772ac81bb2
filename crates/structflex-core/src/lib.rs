//! Structflex Core - reflective conversion between infrastructure-provider
//! schema models and back-end API models
//!
//! A provider describes resources with a dynamic, nullable Tagged Model
//! (every attribute null, unknown or known). The service it manages speaks a
//! concrete Plain Model of structs, references, slices and maps. This crate
//! converts values between the two without per-type mapping code.
//!
//! # Main Components
//!
//! - **Models**: [`TaggedValue`] and [`PlainValue`] with runtime record
//!   descriptors built by [`ObjectType::builder`] and [`StructType::builder`]
//! - **Conversion**: [`lower`] (Tagged to Plain) and [`lift`] (Plain to Tagged)
//! - **Customization**: per-call [`FlexOptions`] and per-type [`Expander`],
//!   [`TypedExpander`] and [`Flattener`] hooks
//! - **Diagnostics**: every problem is accumulated in [`Diagnostics`]
//!
//! # Example
//!
//! ```
//! use structflex_core::{lift, lower, FlexOptions, ObjectType, PlainType, PlainValue,
//!     StructType, StructValue, TaggedType, TaggedValue};
//!
//! # fn main() -> structflex_core::Result<()> {
//! let model = ObjectType::builder("QueueModel")
//!     .field("Name", TaggedType::String)
//!     .field("Tags", TaggedType::map(TaggedType::String))
//!     .build()?;
//! let api = StructType::builder("Queue")
//!     .field("Name", PlainType::reference(PlainType::String))
//!     .build()?;
//!
//! let options = FlexOptions::default();
//! let source = TaggedValue::object(&model, [("Name", TaggedValue::string("jobs"))])?;
//! let mut plain = PlainValue::some(StructValue::zero(&api).into());
//! assert!(lower(Some(&source), Some(&mut plain), &options).is_empty());
//!
//! let mut back = TaggedValue::null(TaggedType::object(&model));
//! assert!(lift(Some(&plain), Some(&mut back), &options).is_empty());
//! assert_eq!(back.field("Name"), Some(&TaggedValue::string("jobs")));
//! # Ok(())
//! # }
//! ```

pub mod diagnostics;
pub mod error;
pub mod flex;
pub mod model;

// Re-export main types for convenience
pub use error::{Error, Result, Severity};
pub use model::{
    // Shared
    EnumType, Path, PathStep,

    // Tagged Model
    ObjectField, ObjectType, ObjectTypeBuilder, OpaqueKind, TaggedData, TaggedKind, TaggedState,
    TaggedType, TaggedValue,

    // Plain Model
    InterfaceType, Optionality, PlainKind, PlainType, PlainValue, StructField, StructType,
    StructTypeBuilder, StructValue,
};

pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSummary, Diagnostics};
pub use flex::{
    lift, lower, ExpandHook, Expander, FieldHints, FlexOption, FlexOptions, Flattener,
    TypedExpander,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

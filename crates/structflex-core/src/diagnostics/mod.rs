//! Diagnostics produced by a conversion
//!
//! A conversion never stops at the first problem. Each issue is recorded as a
//! [`Diagnostic`] in a [`Diagnostics`] accumulator, the affected field is left
//! at its zero value, and the walk continues with sibling fields and elements.
//!
//! # Examples
//!
//! ```
//! use structflex_core::{Diagnostic, DiagnosticCode, Diagnostics, Path};
//!
//! let mut diags = Diagnostics::new();
//! diags.push(
//!     Diagnostic::error(DiagnosticCode::IncompatibleTypes, "Int32 cannot be lowered to i64")
//!         .at(Path::root().at_name("Count"), Path::root().at_name("Count")),
//! );
//!
//! assert!(diags.has_error());
//! assert_eq!(diags.summary().errors, 1);
//! println!("{}", diags.report());
//! ```
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

pub mod collection;
pub mod reporting;
pub mod types;


pub use collection::Diagnostics;
pub use reporting::DiagnosticSummary;
pub use types::{Diagnostic, DiagnosticCode};

//! Name Matcher
//!
//! Resolves a driving-side field against the candidate fields of the other
//! side, in order:
//!
//! 1. exact canonical name
//! 2. case-insensitive name
//! 3. singular/plural correspondence, when either field is a collection
//! 4. the configured prefix, stripped when present and prepended otherwise,
//!    re-matched once through the first three stages
//!
//! Stages 2 and later skip a candidate whose name the driving side also
//! declares exactly; that candidate belongs to the other driving field.
//!
//! Copyright (c) 2025 Structflex Team
//! Licensed under the Apache-2.0 license

use super::fields::FieldDescriptor;
use super::options::FlexOptions;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::trace;

/// Singular to plural exceptions
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("city", "cities"),
    ("coach", "coaches"),
    ("tomato", "tomatoes"),
    ("vertex", "vertices"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("hive", "hives"),
];

static PLURALS: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
static SINGULARS: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn plurals() -> &'static HashMap<&'static str, &'static str> {
    PLURALS.get_or_init(|| IRREGULAR_PLURALS.iter().copied().collect())
}

fn singulars() -> &'static HashMap<&'static str, &'static str> {
    SINGULARS.get_or_init(|| IRREGULAR_PLURALS.iter().map(|(s, p)| (*p, *s)).collect())
}

/// Split `CamelCase` names before their final word
fn split_last_word(name: &str) -> (&str, &str) {
    let at = name
        .char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_ascii_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0);
    name.split_at(at)
}

fn with_case_of(word: &str, replacement: &str) -> String {
    if word.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

fn is_sibilant(word: &str) -> bool {
    ["s", "x", "z", "ch", "sh"].iter().any(|end| word.ends_with(end))
}

/// Plural form of a field name; only the final word is inflected
pub fn pluralize(name: &str) -> String {
    let (head, word) = split_last_word(name);
    let lower = word.to_ascii_lowercase();
    if let Some(plural) = plurals().get(lower.as_str()) {
        return format!("{head}{}", with_case_of(word, plural));
    }
    if is_sibilant(&lower) {
        format!("{name}es")
    } else {
        format!("{name}s")
    }
}

/// Singular forms of a field name, when it looks plural
///
/// A sibilant `-es` ending is ambiguous (`Boxes`, `Databases`), so both the
/// `-es` and the `-s` stems are returned, most specific first.
pub fn singularize(name: &str) -> Vec<String> {
    let (head, word) = split_last_word(name);
    let lower = word.to_ascii_lowercase();
    if let Some(singular) = singulars().get(lower.as_str()) {
        return vec![format!("{head}{}", with_case_of(word, singular))];
    }

    let mut forms = Vec::new();
    if let Some(stem) = name.strip_suffix("es") {
        if is_sibilant(&stem.to_ascii_lowercase()) {
            forms.push(stem.to_string());
        }
    }
    if let Some(stem) = name.strip_suffix('s') {
        if !stem.is_empty() && !stem.ends_with('s') {
            forms.push(stem.to_string());
        }
    }
    forms
}

/// Matches driving fields to candidate fields
#[derive(Debug, Clone, Copy)]
pub struct NameMatcher<'a> {
    options: &'a FlexOptions,
}

impl<'a> NameMatcher<'a> {
    pub fn new(options: &'a FlexOptions) -> Self {
        Self { options }
    }

    /// Find the candidate corresponding to `driving`
    ///
    /// `driving_fields` is the full field set of the driving side, used to
    /// keep fuzzy stages from stealing a candidate another field names
    /// exactly.
    pub fn find<'c>(
        &self,
        driving: &FieldDescriptor,
        driving_fields: &[FieldDescriptor],
        candidates: &'c [FieldDescriptor],
    ) -> Option<&'c FieldDescriptor> {
        let name = driving.canonical_name.as_str();
        if let Some(found) = self.find_by_name(name, driving, driving_fields, candidates) {
            return Some(found);
        }

        let prefix = self.options.field_name_prefix()?;
        let composed = match strip_prefix_ignore_case(name, prefix) {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => format!("{prefix}{name}"),
        };
        trace!(field = name, composed = %composed, "Retrying match with field name prefix");
        self.find_by_name(&composed, driving, driving_fields, candidates)
    }

    fn find_by_name<'c>(
        &self,
        name: &str,
        driving: &FieldDescriptor,
        driving_fields: &[FieldDescriptor],
        candidates: &'c [FieldDescriptor],
    ) -> Option<&'c FieldDescriptor> {
        if let Some(found) = candidates.iter().find(|c| c.canonical_name == name) {
            return Some(found);
        }

        let claimed = |c: &FieldDescriptor| {
            driving_fields
                .iter()
                .any(|d| d.canonical_name == c.canonical_name && d.index != driving.index)
        };
        let fuzzy = |target: &str, require_collection: bool| {
            candidates.iter().find(|c| {
                c.canonical_name.eq_ignore_ascii_case(target)
                    && (!require_collection || c.is_collection())
                    && !claimed(c)
            })
        };

        if let Some(found) = fuzzy(name, false) {
            return Some(found);
        }

        let plural_only_for_collections = !driving.is_collection();
        let mut forms = vec![pluralize(name)];
        forms.extend(singularize(name));
        forms
            .iter()
            .find_map(|form| fuzzy(form, plural_only_for_collections))
    }
}

fn strip_prefix_ignore_case<'n>(name: &'n str, prefix: &str) -> Option<&'n str> {
    let head = name.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &name[prefix.len()..])
}

// This file is part of the terraform-provider-fastly project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;

use crate::client::{ClientHandle, FastlyClient};

use tf_provider::{
    schema::{Attribute, AttributeConstraint, AttributeType, Description, Schema},
    value::{Value, ValueBool, ValueNumber, ValueString},
    AttributePath, Diagnostics,
};

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

pub(crate) trait WithValidate {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath);
}

pub(crate) trait WithNormalize {
    fn normalize(&mut self, diags: &mut Diagnostics);
}

impl<T: WithValidate> WithValidate for Value<T> {
    fn validate(&self, diags: &mut Diagnostics, attr_path: AttributePath) {
        if let Value::Value(value) = self {
            value.validate(diags, attr_path);
        }
    }
}

/// Build a schema attribute
pub(crate) fn attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &str,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        ..Default::default()
    }
}

pub(crate) fn sensitive(attribute: Attribute) -> Attribute {
    Attribute {
        sensitive: true,
        ..attribute
    }
}

/// String value from an API field, empty strings being treated as unset
pub(crate) fn string_value(value: Option<String>) -> ValueString<'static> {
    match value {
        Some(value) if !value.is_empty() => Value::Value(Cow::Owned(value)),
        _ => Value::Null,
    }
}

/// String value from an API field, keeping empty strings
pub(crate) fn raw_string_value(value: Option<String>) -> ValueString<'static> {
    value.map(Cow::Owned).into()
}

pub(crate) fn number_value(value: Option<i64>) -> ValueNumber {
    value.into()
}

pub(crate) fn bool_value(value: Option<bool>) -> ValueBool {
    value.into()
}

/// Borrow a known string, or an empty string otherwise
pub(crate) fn as_str<'a>(value: &'a ValueString<'_>) -> &'a str {
    value.as_deref_option().unwrap_or_default()
}

/// Fill an optional+computed attribute left unset by the configuration
pub(crate) fn default_value<T>(value: &mut Value<T>, default: T) {
    if value.is_null() {
        *value = Value::Value(default);
    }
}

pub(crate) fn default_str(value: &mut ValueString<'static>, default: &'static str) {
    default_value(value, Cow::Borrowed(default));
}

/// Report an error if a known string is not one of `allowed`
pub(crate) fn check_one_of(
    diags: &mut Diagnostics,
    attr_path: AttributePath,
    value: &ValueString<'_>,
    allowed: &[&str],
) {
    if let Value::Value(value) = value {
        let value: &str = value;
        if !allowed.contains(&value) {
            diags.error(
                format!("Invalid value `{value}`"),
                format!("Expected one of: {}", allowed.iter().join_with(", ")),
                attr_path,
            );
        }
    }
}

/// Report an error for every key defined more than once
pub(crate) fn check_unique_keys<'a, I>(diags: &mut Diagnostics, attr_path: AttributePath, keys: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            diags.error(
                format!("Duplicate `{key}`"),
                "Each block must have a unique name",
                attr_path.clone(),
            );
        }
    }
}

/// Client of the configured provider, reporting an error when it is not configured
pub(crate) async fn configured_client(
    handle: &ClientHandle,
    diags: &mut Diagnostics,
) -> Option<FastlyClient> {
    match handle.get().await {
        Ok(client) => Some(client),
        Err(err) => {
            diags.root_error_short(err.to_string());
            None
        }
    }
}

/// Split a `parent/child` identifier as used by import
pub(crate) fn split_id(id: &str) -> Option<(&str, &str)> {
    let (parent, child) = id.split_once('/')?;
    if parent.is_empty() || child.is_empty() || child.contains('/') {
        return None;
    }
    Some((parent, child))
}

pub struct DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    iter: RefCell<T>,
    sep: &'a str,
}

pub trait DisplayJoinable {
    type Joiner<'a>;
    fn join_with(self, sep: &str) -> Self::Joiner<'_>;
}

impl<T, I> DisplayJoinable for T
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    type Joiner<'a> = DisplayJoiner<'a, T, I>;

    fn join_with(self, sep: &str) -> Self::Joiner<'_> {
        DisplayJoiner {
            iter: RefCell::new(self),
            sep,
        }
    }
}

impl<'a, T, I> std::fmt::Display for DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        let mut iter = self.iter.try_borrow_mut().or(Err(std::fmt::Error))?;
        for elt in iter.by_ref() {
            f.write_str(sep)?;
            f.write_fmt(format_args!("{elt}"))?;
            sep = self.sep;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_ids_have_two_parts() {
        assert_eq!(split_id("sid/aid"), Some(("sid", "aid")));
        assert_eq!(split_id("sid"), None);
        assert_eq!(split_id("sid/"), None);
        assert_eq!(split_id("sid/a/b"), None);
    }

    #[test]
    fn empty_strings_are_unset() {
        assert_eq!(string_value(Some(String::new())), Value::Null);
        assert_eq!(string_value(None), Value::Null);
        assert_eq!(string_value(Some("a".into())), ValueString::from("a"));
        assert_eq!(raw_string_value(Some(String::new())), ValueString::from(""));
    }

    #[test]
    fn defaults_only_replace_null() {
        let mut port: ValueNumber = Value::Null;
        default_value(&mut port, 80);
        assert_eq!(port, Value::Value(80));

        let mut port: ValueNumber = Value::Value(443);
        default_value(&mut port, 80);
        assert_eq!(port, Value::Value(443));

        let mut port: ValueNumber = Value::Unknown;
        default_value(&mut port, 80);
        assert_eq!(port, Value::Unknown);
    }

    #[test]
    fn one_of_reports_allowed_values() {
        let mut diags = Diagnostics::default();
        check_one_of(
            &mut diags,
            AttributePath::new("condition"),
            &ValueString::from("REQUEST"),
            &["REQUEST", "RESPONSE"],
        );
        assert!(diags.errors.is_empty());

        check_one_of(
            &mut diags,
            AttributePath::new("condition"),
            &ValueString::from("request"),
            &["REQUEST", "RESPONSE"],
        );
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].detail, "Expected one of: REQUEST, RESPONSE");
    }

    #[test]
    fn duplicate_keys_are_reported_once_per_duplicate() {
        let mut diags = Diagnostics::default();
        check_unique_keys(
            &mut diags,
            AttributePath::new("backend"),
            ["a", "b", "a", "c", "b"],
        );
        assert_eq!(diags.errors.len(), 2);
    }
}

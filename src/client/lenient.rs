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

//! Deserializers for API fields that are returned either as JSON scalars or as strings
//!
//! Depending on the endpoint, Fastly encodes numbers as `10` or `"10"`,
//! and booleans as `true`, `1` or `"1"`.

use serde::{de::Error, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(i)) => Ok(Some(i)),
        Some(Scalar::Float(f)) => Ok(Some(f as i64)),
        Some(Scalar::Bool(b)) => Ok(Some(b as i64)),
        Some(Scalar::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid integer: {s:?}"))),
    }
}

pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Bool(b)) => Ok(Some(b)),
        Some(Scalar::Int(i)) => Ok(Some(i != 0)),
        Some(Scalar::Float(f)) => Ok(Some(f != 0.0)),
        Some(Scalar::Str(s)) => match s.trim() {
            "" => Ok(None),
            "1" | "true" | "t" => Ok(Some(true)),
            "0" | "false" | "f" => Ok(Some(false)),
            _ => Err(D::Error::custom(format!("invalid boolean: {s:?}"))),
        },
    }
}

/// Strings that may also come back as numbers (e.g. `http_version`)
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Str(s)) => Some(s),
        Some(Scalar::Int(i)) => Some(i.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
        Some(Scalar::Bool(b)) => Some(b.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "super::opt_i64")]
        priority: Option<i64>,
        #[serde(default, deserialize_with = "super::opt_bool")]
        force_miss: Option<bool>,
        #[serde(default, deserialize_with = "super::opt_string")]
        http_version: Option<String>,
    }

    fn parse(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numbers_as_strings() {
        assert_eq!(parse(r#"{"priority":"10"}"#).priority, Some(10));
        assert_eq!(parse(r#"{"priority":10}"#).priority, Some(10));
        assert_eq!(parse(r#"{"priority":""}"#).priority, None);
        assert_eq!(parse(r#"{"priority":null}"#).priority, None);
        assert_eq!(parse(r#"{}"#).priority, None);
        assert!(serde_json::from_str::<Sample>(r#"{"priority":"high"}"#).is_err());
    }

    #[test]
    fn booleans_as_strings_or_numbers() {
        assert_eq!(parse(r#"{"force_miss":"1"}"#).force_miss, Some(true));
        assert_eq!(parse(r#"{"force_miss":"0"}"#).force_miss, Some(false));
        assert_eq!(parse(r#"{"force_miss":1}"#).force_miss, Some(true));
        assert_eq!(parse(r#"{"force_miss":false}"#).force_miss, Some(false));
        assert_eq!(parse(r#"{"force_miss":null}"#).force_miss, None);
    }

    #[test]
    fn strings_from_numbers() {
        assert_eq!(
            parse(r#"{"http_version":1.1}"#).http_version.as_deref(),
            Some("1.1")
        );
        assert_eq!(
            parse(r#"{"http_version":"1.1"}"#).http_version.as_deref(),
            Some("1.1")
        );
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::discover::GroupFilter;
use super::error::ExportError;
use super::target::{destination_key, KeyStyle};
use super::types::ExportTarget;
use crate::config::ExportConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    Single,
    Discover,
    Fixed,
}

impl ExportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Discover => "discover",
            Self::Fixed => "fixed",
        }
    }
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "discover" | "discovery" => Ok(Self::Discover),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown export mode '{other}'")),
        }
    }
}

/// Trigger parameters. Every field is optional and falls back to [`ExportConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportRequest {
    pub mode: Option<ExportMode>,
    #[serde(alias = "log_group_name")]
    pub log_group_name: Option<String>,
    #[serde(alias = "s3_key")]
    pub destination_key: Option<String>,
    #[serde(alias = "s3_bucket")]
    pub bucket: Option<String>,
    #[serde(alias = "region_name")]
    pub region: Option<String>,
    pub hours: Option<i64>,
    pub naming_prefix: Option<String>,
    pub deny_list_substr: Option<String>,
    pub fixed_group_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Single(ExportTarget),
    Discover(GroupFilter),
    Fixed(Vec<String>),
}

impl TargetSpec {
    /// Targets known without listing groups. `None` in discover mode.
    pub fn static_targets(&self) -> Option<Vec<ExportTarget>> {
        match self {
            Self::Single(target) => Some(vec![target.clone()]),
            Self::Fixed(groups) => Some(
                groups
                    .iter()
                    .map(|group| {
                        let key = destination_key(group, KeyStyle::SanitizedGroup);
                        ExportTarget::new(group.clone(), key)
                    })
                    .collect(),
            ),
            Self::Discover(_) => None,
        }
    }
}

/// A validated request. Window bounds are still computed at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub bucket: String,
    pub region: String,
    pub hours: i64,
    pub targets: TargetSpec,
}

impl ExportPlan {
    pub fn mode(&self) -> ExportMode {
        match self.targets {
            TargetSpec::Single(_) => ExportMode::Single,
            TargetSpec::Discover(_) => ExportMode::Discover,
            TargetSpec::Fixed(_) => ExportMode::Fixed,
        }
    }
}

fn required(value: Option<String>, fallback: &str, field: &str) -> Result<String, ExportError> {
    let value = value.unwrap_or_else(|| fallback.to_string());
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ExportError::config(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Region names look like `us-east-1` or `us-gov-west-1`: a two letter area, one or more
/// lowercase words, then a number.
fn is_region_name(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    let [area, words @ .., number] = parts.as_slice() else {
        return false;
    };
    area.len() == 2
        && area.bytes().all(|b| b.is_ascii_lowercase())
        && !words.is_empty()
        && words
            .iter()
            .all(|w| !w.is_empty() && w.bytes().all(|b| b.is_ascii_lowercase()))
        && !number.is_empty()
        && number.len() <= 2
        && number.bytes().all(|b| b.is_ascii_digit())
}

impl ExportRequest {
    fn inferred_mode(&self, default: ExportMode) -> ExportMode {
        if let Some(mode) = self.mode {
            mode
        } else if self.fixed_group_list.is_some() {
            ExportMode::Fixed
        } else if self.naming_prefix.is_some() || self.deny_list_substr.is_some() {
            ExportMode::Discover
        } else if self.log_group_name.is_some() || self.destination_key.is_some() {
            ExportMode::Single
        } else {
            default
        }
    }

    pub fn resolve(self, defaults: &ExportConfig) -> Result<ExportPlan, ExportError> {
        let mode = self.inferred_mode(defaults.mode);
        let bucket = required(self.bucket, &defaults.bucket, "bucket")?;
        let region = required(self.region, &defaults.region, "region")?;
        if !is_region_name(&region) {
            return Err(ExportError::config(format!(
                "region '{region}' is not a valid AWS region name"
            )));
        }
        let hours = self.hours.unwrap_or(defaults.hours);

        let targets = match mode {
            ExportMode::Single => TargetSpec::Single(ExportTarget::new(
                required(self.log_group_name, &defaults.log_group, "logGroupName")?,
                required(
                    self.destination_key,
                    &defaults.destination_key,
                    "destinationKey",
                )?,
            )),
            ExportMode::Discover => TargetSpec::Discover(GroupFilter {
                prefix: self
                    .naming_prefix
                    .unwrap_or_else(|| defaults.naming_prefix.clone()),
                deny_substring: self
                    .deny_list_substr
                    .unwrap_or_else(|| defaults.deny_substring.clone()),
            }),
            ExportMode::Fixed => {
                let groups = self
                    .fixed_group_list
                    .unwrap_or_else(|| defaults.fixed_groups.clone());
                let groups: Vec<String> = groups
                    .into_iter()
                    .map(|g| g.trim().to_string())
                    .collect();
                if groups.is_empty() {
                    return Err(ExportError::config("fixedGroupList must not be empty"));
                }
                if groups.iter().any(String::is_empty) {
                    return Err(ExportError::config(
                        "fixedGroupList must not contain empty names",
                    ));
                }
                TargetSpec::Fixed(groups)
            }
        };

        Ok(ExportPlan {
            bucket,
            region,
            hours,
            targets,
        })
    }
}

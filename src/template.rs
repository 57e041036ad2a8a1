//! Asset name templates.
//!
//! An asset name template such as `build-$$.zip` carries exactly one `$$`
//! placeholder. The placeholder is replaced by `<YYYYMMDD>-<short hash>` when a
//! new asset is published, and the text around it (the prefix and suffix) is
//! what identifies earlier assets produced from the same template.

use std::fmt;
use thiserror::Error;
use time::Date;

/// Placeholder marker that splits a template into prefix and suffix.
pub const PLACEHOLDER: &str = "$$";

/// Validation failures for an asset name template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("asset name '{0}' must contain the placeholder '$$'")]
    MissingPlaceholder(String),

    #[error("asset name '{0}' must contain the placeholder '$$' exactly once")]
    RepeatedPlaceholder(String),
}

/// A validated asset name template, split around its placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    prefix: String,
    suffix: String,
}

impl NameTemplate {
    /// Parse a template string, requiring exactly one `$$`.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let Some((prefix, suffix)) = raw.split_once(PLACEHOLDER) else {
            return Err(TemplateError::MissingPlaceholder(raw.to_string()));
        };
        if suffix.contains(PLACEHOLDER) {
            return Err(TemplateError::RepeatedPlaceholder(raw.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns true when `name` could have been produced from this template.
    ///
    /// The prefix and suffix must not overlap inside `name`, so a template like
    /// `a$$a` does not match the single-character name `a`.
    pub fn matches(&self, name: &str) -> bool {
        name.len() >= self.prefix.len() + self.suffix.len()
            && name.starts_with(&self.prefix)
            && name.ends_with(&self.suffix)
    }

    /// Returns true when `name` is this template's asset for `short_hash`,
    /// i.e. it ends with `-<short_hash><suffix>`.
    pub fn matches_commit(&self, name: &str, short_hash: &str) -> bool {
        self.matches(name) && name.ends_with(&format!("-{short_hash}{}", self.suffix))
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PLACEHOLDER}{}", self.prefix, self.suffix)
    }
}

/// Formats a calendar date as `YYYYMMDD` with a 1-based, zero-padded month.
pub fn format_date_stamp(date: Date) -> String {
    format!(
        "{:04}{:02}{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Builds the name of a new asset: `prefix + YYYYMMDD + "-" + hash + suffix`.
pub fn generate_asset_name(template: &NameTemplate, date: Date, short_hash: &str) -> String {
    format!(
        "{}{}-{short_hash}{}",
        template.prefix,
        format_date_stamp(date),
        template.suffix
    )
}

//! Product descriptor (`PRODUCT.yaml`) parsing and field validation.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::Value;
use url::Url;

use crate::domain::{Result, Submission, VerifyError};

/// Flat string-keyed view of a product descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDescriptor {
    file: String,
    fields: BTreeMap<String, String>,
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

impl ProductDescriptor {
    /// Parse a descriptor. `file` names the source in error messages.
    pub fn parse(yaml: &str, file: &str) -> Result<Self> {
        let invalid = |reason: String| VerifyError::FieldInvalid {
            file: file.to_string(),
            reason,
        };

        let mapping: BTreeMap<String, Value> =
            serde_yaml::from_str(yaml).map_err(|e| invalid(format!("unreadable: {e}")))?;

        let mut fields = BTreeMap::new();
        for (key, value) in mapping {
            let text = scalar_to_string(&value)
                .ok_or_else(|| invalid(format!("field '{key}' must be a plain value")))?;
            fields.insert(key, text.trim().to_string());
        }

        Ok(Self {
            file: file.to_string(),
            fields,
        })
    }

    /// Load the named descriptor file from a submission.
    pub fn from_submission(submission: &Submission, file: &str) -> Result<Self> {
        let descriptor = submission
            .file_by_name(file)
            .ok_or_else(|| VerifyError::FileMissing(file.to_string()))?;
        Self::parse(&descriptor.content, file)
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// A field's value, if present and non-empty.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn invalid(&self, reason: String) -> VerifyError {
        VerifyError::FieldInvalid {
            file: self.file.clone(),
            reason,
        }
    }

    pub fn require_non_empty(&self, field: &str) -> Result<()> {
        self.get(field)
            .map(|_| ())
            .ok_or_else(|| self.invalid(format!("field '{field}' is missing or empty")))
    }

    /// Check that a present field holds an absolute http(s) URL.
    pub fn require_url(&self, field: &str, value: &str) -> Result<()> {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
            _ => Err(self.invalid(format!("field '{field}' is not a valid URL: '{value}'"))),
        }
    }

    pub fn require_email(&self, field: &str, value: &str) -> Result<()> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("email pattern is a valid regex")
        });
        if re.is_match(value) {
            Ok(())
        } else {
            Err(self.invalid(format!("field '{field}' is not a valid email address: '{value}'")))
        }
    }

    pub fn require_one_of(&self, field: &str, value: &str, allowed: &[String]) -> Result<()> {
        if allowed.iter().any(|a| a == value) {
            Ok(())
        } else {
            Err(self.invalid(format!(
                "field '{field}' must be one of [{}], found '{value}'",
                allowed.join(", ")
            )))
        }
    }
}

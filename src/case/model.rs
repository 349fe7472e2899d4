use crate::validation::{check_text, require, FieldError};
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use thiserror::Error;

pub const FEATURE_NAME_MAX_CHARS: usize = 255;
pub const TITLE_MAX_CHARS: usize = 500;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, FromRow)]
pub struct TestCase {
    pub id: i64,
    pub feature_name: String,
    pub title: String,
    pub steps: String,
    pub expected_result: String,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Draft,
    Ready,
    Automated,
}

#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Low" => Ok(Priority::Low),
            "Medium" => Ok(Priority::Medium),
            "High" => Ok(Priority::High),
            _ => Err(UnknownVariant { kind: "priority", value }),
        }
    }
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::Ready => "Ready",
            Status::Automated => "Automated",
        }
    }
}

impl TryFrom<String> for Status {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Draft" => Ok(Status::Draft),
            "Ready" => Ok(Status::Ready),
            "Automated" => Ok(Status::Automated),
            _ => Err(UnknownVariant { kind: "status", value }),
        }
    }
}

/// A test case that passed validation and has not been stored yet.
#[derive(Clone, Debug, Builder)]
pub struct NewTestCase {
    #[builder(into)]
    pub feature_name: String,
    #[builder(into)]
    pub title: String,
    #[builder(into)]
    pub steps: String,
    #[builder(into)]
    pub expected_result: String,
    #[builder(default)]
    pub priority: Priority,
    #[builder(default)]
    pub status: Status,
}

/// Validated subset of fields to overwrite on an existing test case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestCaseChanges {
    pub feature_name: Option<String>,
    pub title: Option<String>,
    pub steps: Option<String>,
    pub expected_result: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl TestCaseChanges {
    pub fn apply_to(self, test_case: &mut TestCase) {
        if let Some(feature_name) = self.feature_name {
            test_case.feature_name = feature_name;
        }
        if let Some(title) = self.title {
            test_case.title = title;
        }
        if let Some(steps) = self.steps {
            test_case.steps = steps;
        }
        if let Some(expected_result) = self.expected_result {
            test_case.expected_result = expected_result;
        }
        if let Some(priority) = self.priority {
            test_case.priority = priority;
        }
        if let Some(status) = self.status {
            test_case.status = status;
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct CreateTestCasePayload {
    pub feature_name: Option<String>,
    pub title: Option<String>,
    pub steps: Option<String>,
    pub expected_result: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl CreateTestCasePayload {
    pub fn validate(self) -> Result<NewTestCase, Vec<FieldError>> {
        let mut errors = vec![];
        let feature_name = require("feature_name", self.feature_name, &mut errors);
        let title = require("title", self.title, &mut errors);
        let steps = require("steps", self.steps, &mut errors);
        let expected_result = require("expected_result", self.expected_result, &mut errors);

        if let Some(value) = &feature_name {
            check_text("feature_name", value, Some(FEATURE_NAME_MAX_CHARS), &mut errors);
        }
        if let Some(value) = &title {
            check_text("title", value, Some(TITLE_MAX_CHARS), &mut errors);
        }
        if let Some(value) = &steps {
            check_text("steps", value, None, &mut errors);
        }
        if let Some(value) = &expected_result {
            check_text("expected_result", value, None, &mut errors);
        }

        match (feature_name, title, steps, expected_result) {
            (Some(feature_name), Some(title), Some(steps), Some(expected_result)) if errors.is_empty() => {
                Ok(NewTestCase {
                    feature_name,
                    title,
                    steps,
                    expected_result,
                    priority: self.priority.unwrap_or_default(),
                    status: self.status.unwrap_or_default(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Partial update body. The outer `Option` records whether the key was sent at all,
/// the inner one whether it was `null`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct UpdateTestCasePayload {
    #[serde(default, deserialize_with = "present")]
    pub feature_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub steps: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub expected_result: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub priority: Option<Option<Priority>>,
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<Status>>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn non_null<T>(field: &str, value: Option<Option<T>>, errors: &mut Vec<FieldError>) -> Option<T> {
    match value {
        Some(None) => {
            errors.push(FieldError::new(field, "must not be null"));
            None
        }
        Some(Some(value)) => Some(value),
        None => None,
    }
}

impl UpdateTestCasePayload {
    pub fn validate(self) -> Result<TestCaseChanges, Vec<FieldError>> {
        let mut errors = vec![];
        let changes = TestCaseChanges {
            feature_name: non_null("feature_name", self.feature_name, &mut errors),
            title: non_null("title", self.title, &mut errors),
            steps: non_null("steps", self.steps, &mut errors),
            expected_result: non_null("expected_result", self.expected_result, &mut errors),
            priority: non_null("priority", self.priority, &mut errors),
            status: non_null("status", self.status, &mut errors),
        };

        if let Some(value) = &changes.feature_name {
            check_text("feature_name", value, Some(FEATURE_NAME_MAX_CHARS), &mut errors);
        }
        if let Some(value) = &changes.title {
            check_text("title", value, Some(TITLE_MAX_CHARS), &mut errors);
        }
        if let Some(value) = &changes.steps {
            check_text("steps", value, None, &mut errors);
        }
        if let Some(value) = &changes.expected_result {
            check_text("expected_result", value, None, &mut errors);
        }

        if errors.is_empty() {
            Ok(changes)
        } else {
            Err(errors)
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default, Builder)]
pub struct TestCaseFilter {
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    #[builder(into)]
    pub search: Option<String>,
}

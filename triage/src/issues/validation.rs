//! Input validation for create and update requests
//!
//! Clients hand in loosely typed input ([`IssueDraft`] for create,
//! [`IssuePatch`] for update). The [`IssueValidator`] turns it into the
//! strongly typed [`NewIssue`] / [`IssueChanges`] that the service accepts,
//! or fails with [`TriageError::Validation`] naming the offending field.
//!
//! Status, priority and due date arrive as text on purpose: an unknown
//! status must be reported as a validation error on `status`, not as a
//! decoding failure of the whole request.

use crate::config::Config;
use crate::error::{Result, TriageError};
use crate::issues::{IssuePriority, IssueStatus};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One field of a partial update
///
/// Deserializes from an optional JSON value: a missing key is [`Keep`],
/// an explicit `null` is [`Clear`], anything else is [`Set`]. Fields using
/// it must be marked `#[serde(default)]` so that missing keys are accepted.
///
/// [`Keep`]: FieldUpdate::Keep
/// [`Clear`]: FieldUpdate::Clear
/// [`Set`]: FieldUpdate::Set
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value untouched
    #[default]
    Keep,
    /// Remove the stored value
    Clear,
    /// Replace the stored value
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Whether the field was absent from the request
    pub fn is_keep(&self) -> bool {
        matches!(self, FieldUpdate::Keep)
    }

    /// Transform the carried value, keeping the tri-state
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldUpdate<U> {
        match self {
            FieldUpdate::Keep => FieldUpdate::Keep,
            FieldUpdate::Clear => FieldUpdate::Clear,
            FieldUpdate::Set(value) => FieldUpdate::Set(f(value)),
        }
    }

    /// Apply to a field that cannot be empty. `Clear` is rejected during
    /// validation and leaves the value untouched here.
    pub fn apply_required(self, target: &mut T) {
        if let FieldUpdate::Set(value) = self {
            *target = value;
        }
    }

    /// Apply to an optional field
    pub fn apply_optional(self, target: &mut Option<T>) {
        match self {
            FieldUpdate::Keep => {}
            FieldUpdate::Clear => *target = None,
            FieldUpdate::Set(value) => *target = Some(value),
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldUpdate::Set(v),
            None => FieldUpdate::Clear,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(FieldUpdate::from)
    }
}

/// Raw input for creating an issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDraft {
    /// Required; trimmed before storage
    pub title: Option<String>,
    /// Optional long text
    pub description: Option<String>,
    /// One of the status wire names; defaults to `open`
    pub status: Option<String>,
    /// One of the priority wire names; defaults to `medium`
    pub priority: Option<String>,
    /// Must contain `@` when non-empty
    pub assignee: Option<String>,
    /// Must contain `@` when non-empty
    pub reporter: Option<String>,
    /// Defaults to no labels
    pub labels: Option<Vec<String>>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    #[serde(alias = "due_date")]
    pub due_date: Option<String>,
    /// Non-negative number of hours
    #[serde(alias = "estimated_hours")]
    pub estimated_hours: Option<f64>,
}

/// Raw input for a partial update
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePatch {
    /// New title
    #[serde(default)]
    pub title: FieldUpdate<String>,
    /// New description; null or empty clears it
    #[serde(default)]
    pub description: FieldUpdate<String>,
    /// New status
    #[serde(default)]
    pub status: FieldUpdate<String>,
    /// New priority
    #[serde(default)]
    pub priority: FieldUpdate<String>,
    /// New assignee; null or empty clears it
    #[serde(default)]
    pub assignee: FieldUpdate<String>,
    /// New reporter; null or empty clears it
    #[serde(default)]
    pub reporter: FieldUpdate<String>,
    /// New label list; null resets to no labels
    #[serde(default)]
    pub labels: FieldUpdate<Vec<String>>,
    /// New due date; null or empty clears it
    #[serde(default, alias = "due_date")]
    pub due_date: FieldUpdate<String>,
    /// New estimate; null clears it
    #[serde(default, alias = "estimated_hours")]
    pub estimated_hours: FieldUpdate<f64>,
}

/// Validated input for creating an issue
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    /// Trimmed, non-empty title
    pub title: String,
    /// Optional long text
    pub description: Option<String>,
    /// Initial status
    pub status: IssueStatus,
    /// Initial priority
    pub priority: IssuePriority,
    /// Assignee handle
    pub assignee: Option<String>,
    /// Reporter handle
    pub reporter: Option<String>,
    /// Labels in client order
    pub labels: Vec<String>,
    /// Due date
    pub due_date: Option<DateTime<Utc>>,
    /// Effort estimate in hours
    pub estimated_hours: Option<f64>,
}

impl NewIssue {
    /// A new issue with the given title and every other field defaulted.
    ///
    /// The title is taken as-is; use [`IssueValidator`] for client input.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: IssueStatus::default(),
            priority: IssuePriority::default(),
            assignee: None,
            reporter: None,
            labels: Vec::new(),
            due_date: None,
            estimated_hours: None,
        }
    }
}

/// Validated partial update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueChanges {
    /// Title; never `Clear`
    pub title: FieldUpdate<String>,
    /// Description
    pub description: FieldUpdate<String>,
    /// Status; never `Clear`
    pub status: FieldUpdate<IssueStatus>,
    /// Priority; never `Clear`
    pub priority: FieldUpdate<IssuePriority>,
    /// Assignee
    pub assignee: FieldUpdate<String>,
    /// Reporter
    pub reporter: FieldUpdate<String>,
    /// Labels; `Clear` empties the list
    pub labels: FieldUpdate<Vec<String>>,
    /// Due date
    pub due_date: FieldUpdate<DateTime<Utc>>,
    /// Effort estimate
    pub estimated_hours: FieldUpdate<f64>,
}

impl IssueChanges {
    /// Whether the update names no field at all
    pub fn is_empty(&self) -> bool {
        self.title.is_keep()
            && self.description.is_keep()
            && self.status.is_keep()
            && self.priority.is_keep()
            && self.assignee.is_keep()
            && self.reporter.is_keep()
            && self.labels.is_keep()
            && self.due_date.is_keep()
            && self.estimated_hours.is_keep()
    }
}

/// Applies the field constraints configured in [`Config`]
#[derive(Debug, Clone, Copy)]
pub struct IssueValidator<'a> {
    config: &'a Config,
}

impl<'a> IssueValidator<'a> {
    /// Create a validator bound to the given limits
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Validate input for a new issue
    pub fn validate_draft(&self, draft: IssueDraft) -> Result<NewIssue> {
        let title = match draft.title {
            Some(title) => self.title(&title)?,
            None => return Err(TriageError::validation("title", "is required")),
        };

        Ok(NewIssue {
            title,
            description: self.description(draft.description)?,
            status: match draft.status {
                Some(status) => status.parse()?,
                None => IssueStatus::default(),
            },
            priority: match draft.priority {
                Some(priority) => priority.parse()?,
                None => IssuePriority::default(),
            },
            assignee: self.person("assignee", draft.assignee)?,
            reporter: self.person("reporter", draft.reporter)?,
            labels: draft.labels.unwrap_or_default(),
            due_date: match draft.due_date {
                Some(raw) => parse_due_date(&raw)?,
                None => None,
            },
            estimated_hours: match draft.estimated_hours {
                Some(hours) => Some(estimated_hours(hours)?),
                None => None,
            },
        })
    }

    /// Validate a partial update. Absent fields stay [`FieldUpdate::Keep`].
    pub fn validate_patch(&self, patch: IssuePatch) -> Result<IssueChanges> {
        Ok(IssueChanges {
            title: match patch.title {
                FieldUpdate::Keep => FieldUpdate::Keep,
                FieldUpdate::Clear => return Err(not_nullable("title")),
                FieldUpdate::Set(title) => FieldUpdate::Set(self.title(&title)?),
            },
            description: match patch.description {
                FieldUpdate::Set(text) => self.description(Some(text))?.into(),
                other => other,
            },
            status: match patch.status {
                FieldUpdate::Keep => FieldUpdate::Keep,
                FieldUpdate::Clear => return Err(not_nullable("status")),
                FieldUpdate::Set(status) => FieldUpdate::Set(status.parse()?),
            },
            priority: match patch.priority {
                FieldUpdate::Keep => FieldUpdate::Keep,
                FieldUpdate::Clear => return Err(not_nullable("priority")),
                FieldUpdate::Set(priority) => FieldUpdate::Set(priority.parse()?),
            },
            assignee: match patch.assignee {
                FieldUpdate::Set(value) => self.person("assignee", Some(value))?.into(),
                other => other,
            },
            reporter: match patch.reporter {
                FieldUpdate::Set(value) => self.person("reporter", Some(value))?.into(),
                other => other,
            },
            labels: patch.labels,
            due_date: match patch.due_date {
                FieldUpdate::Keep => FieldUpdate::Keep,
                FieldUpdate::Clear => FieldUpdate::Clear,
                FieldUpdate::Set(raw) => parse_due_date(&raw)?.into(),
            },
            estimated_hours: match patch.estimated_hours {
                FieldUpdate::Set(hours) => FieldUpdate::Set(estimated_hours(hours)?),
                other => other,
            },
        })
    }

    /// The length limit applies to the title as sent, before trimming
    fn title(&self, raw: &str) -> Result<String> {
        let length = raw.chars().count();
        if length > self.config.max_title_length {
            return Err(TriageError::validation(
                "title",
                format!(
                    "is {} characters long, the maximum is {}",
                    length, self.config.max_title_length
                ),
            ));
        }
        let title = raw.trim();
        if title.is_empty() {
            return Err(TriageError::validation("title", "cannot be empty"));
        }
        Ok(title.to_string())
    }

    fn description(&self, raw: Option<String>) -> Result<Option<String>> {
        let Some(text) = raw.filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };
        let length = text.chars().count();
        if length > self.config.max_description_length {
            return Err(TriageError::validation(
                "description",
                format!(
                    "is {} characters long, the maximum is {}",
                    length, self.config.max_description_length
                ),
            ));
        }
        Ok(Some(text))
    }

    fn person(&self, field: &str, raw: Option<String>) -> Result<Option<String>> {
        let Some(value) = raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        if !value.contains('@') {
            return Err(TriageError::validation(field, "must be a valid email address"));
        }
        if value.chars().count() > self.config.max_person_length {
            return Err(TriageError::validation(
                field,
                format!(
                    "must be at most {} characters long",
                    self.config.max_person_length
                ),
            ));
        }
        Ok(Some(value))
    }
}

fn not_nullable(field: &str) -> TriageError {
    TriageError::validation(field, "cannot be null")
}

fn estimated_hours(hours: f64) -> Result<f64> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(TriageError::validation(
            "estimatedHours",
            "must be a non-negative number",
        ));
    }
    Ok(hours)
}

/// Parse a due date. Blank input means "no due date".
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC) or a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<Option<DateTime<Utc>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Some(Utc.from_utc_datetime(&naive)));
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(Utc.from_utc_datetime(&midnight)));
    }
    Err(TriageError::validation(
        "dueDate",
        format!("'{raw}' is not a valid date or timestamp"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn draft(title: &str) -> IssueDraft {
        IssueDraft {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn field_of(err: TriageError) -> String {
        match err {
            TriageError::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_draft_defaults() {
        let config = Config::default();
        let new = IssueValidator::new(&config)
            .validate_draft(draft("  Bug A  "))
            .unwrap();

        assert_eq!(new.title, "Bug A");
        assert_eq!(new.status, IssueStatus::Open);
        assert_eq!(new.priority, IssuePriority::Medium);
        assert!(new.labels.is_empty());
        assert_eq!(new.assignee, None);
    }

    #[test]
    fn test_draft_requires_title() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        assert_eq!(
            field_of(validator.validate_draft(IssueDraft::default()).unwrap_err()),
            "title"
        );
        assert_eq!(field_of(validator.validate_draft(draft("   ")).unwrap_err()), "title");
    }

    #[test]
    fn test_title_length_limit_counts_characters() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        assert!(validator.validate_draft(draft(&"é".repeat(200))).is_ok());
        assert_eq!(
            field_of(validator.validate_draft(draft(&"x".repeat(201))).unwrap_err()),
            "title"
        );
    }

    #[test]
    fn test_title_length_counts_surrounding_whitespace() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let padded = format!(" {} ", "x".repeat(199));
        assert_eq!(field_of(validator.validate_draft(draft(&padded)).unwrap_err()), "title");

        let fits = format!(" {} ", "x".repeat(198));
        assert_eq!(
            validator.validate_draft(draft(&fits)).unwrap().title,
            "x".repeat(198)
        );
    }

    #[test]
    fn test_description_length_limit() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);
        let mut input = draft("Long");
        input.description = Some("d".repeat(2001));

        assert_eq!(
            field_of(validator.validate_draft(input).unwrap_err()),
            "description"
        );
    }

    #[test]
    fn test_assignee_must_look_like_email() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let mut bad = draft("Bug");
        bad.assignee = Some("not-an-email".to_string());
        assert_eq!(field_of(validator.validate_draft(bad).unwrap_err()), "assignee");

        let mut good = draft("Bug");
        good.assignee = Some("a@b.com".to_string());
        assert_eq!(
            validator.validate_draft(good).unwrap().assignee.as_deref(),
            Some("a@b.com")
        );
    }

    #[test]
    fn test_reporter_length_and_empty_value() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let mut long = draft("Bug");
        long.reporter = Some(format!("{}@example.com", "r".repeat(100)));
        assert_eq!(field_of(validator.validate_draft(long).unwrap_err()), "reporter");

        let mut empty = draft("Bug");
        empty.reporter = Some(String::new());
        assert_eq!(validator.validate_draft(empty).unwrap().reporter, None);
    }

    #[test]
    fn test_unknown_status_and_priority_are_rejected() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let mut bad_status = draft("Bug");
        bad_status.status = Some("archived".to_string());
        assert_eq!(field_of(validator.validate_draft(bad_status).unwrap_err()), "status");

        let mut bad_priority = draft("Bug");
        bad_priority.priority = Some("blocker".to_string());
        assert_eq!(
            field_of(validator.validate_draft(bad_priority).unwrap_err()),
            "priority"
        );
    }

    #[test]
    fn test_status_and_priority_must_match_wire_names_exactly() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let mut shouting = draft("Bug");
        shouting.status = Some(" OPEN ".to_string());
        assert_eq!(field_of(validator.validate_draft(shouting).unwrap_err()), "status");

        let mut capitalized = draft("Bug");
        capitalized.priority = Some("HIGH".to_string());
        assert_eq!(
            field_of(validator.validate_draft(capitalized).unwrap_err()),
            "priority"
        );

        let patch: IssuePatch = serde_json::from_str(r#"{"status": "Closed"}"#).unwrap();
        assert_eq!(field_of(validator.validate_patch(patch).unwrap_err()), "status");
    }

    #[test]
    fn test_estimated_hours_must_be_non_negative() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let mut negative = draft("Bug");
        negative.estimated_hours = Some(-1.0);
        assert_eq!(
            field_of(validator.validate_draft(negative).unwrap_err()),
            "estimatedHours"
        );

        let mut zero = draft("Bug");
        zero.estimated_hours = Some(0.0);
        assert_eq!(validator.validate_draft(zero).unwrap().estimated_hours, Some(0.0));
    }

    #[test]
    fn test_labels_are_kept_verbatim() {
        let config = Config::default();
        let mut input = draft("Bug");
        input.labels = Some(vec!["ui".into(), "UI".into(), "ui".into()]);

        let new = IssueValidator::new(&config).validate_draft(input).unwrap();
        assert_eq!(new.labels, vec!["ui", "UI", "ui"]);
    }

    #[test]
    fn test_due_date_formats() {
        let rfc = parse_due_date("2024-03-01T12:30:00+02:00").unwrap().unwrap();
        assert_eq!(rfc.to_rfc3339(), "2024-03-01T10:30:00+00:00");

        let naive = parse_due_date("2024-03-01T12:30:00").unwrap().unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-03-01T12:30:00+00:00");

        let date = parse_due_date("2024-03-01").unwrap().unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 1));

        assert_eq!(parse_due_date("  ").unwrap(), None);
        assert_eq!(field_of(parse_due_date("next tuesday").unwrap_err()), "dueDate");
    }

    #[test]
    fn test_patch_deserialization_distinguishes_null_from_missing() {
        let patch: IssuePatch =
            serde_json::from_str(r#"{"status": "resolved", "assignee": null}"#).unwrap();

        assert_eq!(patch.status, FieldUpdate::Set("resolved".to_string()));
        assert_eq!(patch.assignee, FieldUpdate::Clear);
        assert_eq!(patch.title, FieldUpdate::Keep);
        assert_eq!(patch.labels, FieldUpdate::Keep);
    }

    #[test]
    fn test_patch_accepts_snake_case_aliases() {
        let patch: IssuePatch =
            serde_json::from_str(r#"{"estimated_hours": 4, "dueDate": null}"#).unwrap();
        assert_eq!(patch.estimated_hours, FieldUpdate::Set(4.0));
        assert_eq!(patch.due_date, FieldUpdate::Clear);
    }

    #[test]
    fn test_patch_validation() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let patch: IssuePatch = serde_json::from_str(
            r#"{"title": "  Renamed ", "status": "in-progress", "description": "", "labels": null}"#,
        )
        .unwrap();
        let changes = validator.validate_patch(patch).unwrap();

        assert_eq!(changes.title, FieldUpdate::Set("Renamed".to_string()));
        assert_eq!(changes.status, FieldUpdate::Set(IssueStatus::InProgress));
        assert_eq!(changes.description, FieldUpdate::Clear);
        assert_eq!(changes.labels, FieldUpdate::Clear);
        assert_eq!(changes.priority, FieldUpdate::Keep);
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_patch_rejects_null_required_fields() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        for field in ["title", "status", "priority"] {
            let json = format!(r#"{{"{field}": null}}"#);
            let patch: IssuePatch = serde_json::from_str(&json).unwrap();
            assert_eq!(field_of(validator.validate_patch(patch).unwrap_err()), field);
        }
    }

    #[test]
    fn test_patch_rejects_blank_title_and_bad_assignee() {
        let config = Config::default();
        let validator = IssueValidator::new(&config);

        let patch = IssuePatch {
            title: FieldUpdate::Set("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(field_of(validator.validate_patch(patch).unwrap_err()), "title");

        let patch = IssuePatch {
            assignee: FieldUpdate::Set("bob".to_string()),
            ..Default::default()
        };
        assert_eq!(field_of(validator.validate_patch(patch).unwrap_err()), "assignee");
    }

    #[test]
    fn test_empty_patch_is_empty() {
        let config = Config::default();
        let changes = IssueValidator::new(&config)
            .validate_patch(IssuePatch::default())
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_validator_honors_configured_limits() {
        let config = Config {
            max_title_length: 5,
            ..Config::default()
        };
        let validator = IssueValidator::new(&config);
        assert!(validator.validate_draft(draft("short")).is_ok());
        assert!(validator.validate_draft(draft("longer")).is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::NormalizeError;

/// Placeholder shown for absent optional fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// One harvested repository, as shared by the normalizer, the sink and the
/// query layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub language: Option<String>,
    pub last_updated: Option<String>,
    pub collected_at: DateTime<Utc>,
}

/// Maps a raw GitHub repository object onto a [`RepositoryRecord`] owned by
/// `owner`. Metrics are required: absent or non-integer counts are rejected
/// instead of being read as zero.
pub fn normalize(raw: &Value, owner: &str) -> Result<RepositoryRecord, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let id = required_u64(obj, "id")?;
    let id = i64::try_from(id).map_err(|_| NormalizeError::InvalidField {
        field: "id",
        reason: format!("{id} does not fit a signed 64-bit key"),
    })?;

    Ok(RepositoryRecord {
        id,
        owner: owner.to_string(),
        name: required_str(obj, "name")?,
        description: optional_str(obj, "description")?,
        url: required_str(obj, "html_url")?,
        stars: required_u64(obj, "stargazers_count")?,
        forks: required_u64(obj, "forks_count")?,
        language: optional_str(obj, "language")?,
        last_updated: optional_str(obj, "updated_at")?,
        collected_at: Utc::now(),
    })
}

fn required_u64(obj: &Map<String, Value>, field: &'static str) -> Result<u64, NormalizeError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(NormalizeError::MissingField(field)),
        Some(value) => value.as_u64().ok_or_else(|| NormalizeError::InvalidField {
            field,
            reason: format!("expected a non-negative integer, got {value}"),
        }),
    }
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, NormalizeError> {
    optional_str(obj, field)?.ok_or(NormalizeError::MissingField(field))
}

fn optional_str(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, NormalizeError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(NormalizeError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": 1296269,
            "name": "Hello-World",
            "description": "This your first repo!",
            "html_url": "https://github.com/octocat/Hello-World",
            "stargazers_count": 80,
            "forks_count": 9,
            "language": "Rust",
            "updated_at": "2011-01-26T19:14:43Z",
            "owner": { "login": "octocat" }
        })
    }

    #[test]
    fn normalize_maps_all_fields() {
        let before = Utc::now();
        let record = normalize(&sample(), "octocat").unwrap();

        assert_eq!(record.id, 1296269);
        assert_eq!(record.owner, "octocat");
        assert_eq!(record.name, "Hello-World");
        assert_eq!(record.description.as_deref(), Some("This your first repo!"));
        assert_eq!(record.url, "https://github.com/octocat/Hello-World");
        assert_eq!(record.stars, 80);
        assert_eq!(record.forks, 9);
        assert_eq!(record.language.as_deref(), Some("Rust"));
        assert_eq!(record.last_updated.as_deref(), Some("2011-01-26T19:14:43Z"));
        assert!(record.collected_at >= before);
    }

    #[test]
    fn normalize_maps_null_optionals_to_none() {
        let mut raw = sample();
        raw["description"] = Value::Null;
        raw.as_object_mut().unwrap().remove("language");

        let record = normalize(&raw, "octocat").unwrap();
        assert_eq!(record.description, None);
        assert_eq!(record.language, None);
        assert_eq!(record.last_updated.as_deref(), Some("2011-01-26T19:14:43Z"));
    }

    #[test]
    fn normalize_rejects_missing_metrics() {
        let mut raw = sample();
        raw.as_object_mut().unwrap().remove("forks_count");

        let err = normalize(&raw, "octocat").unwrap_err();
        assert_eq!(err, NormalizeError::MissingField("forks_count"));
    }

    #[test]
    fn normalize_rejects_malformed_metrics() {
        for bad in [json!("80"), json!(-1), json!(1.5)] {
            let mut raw = sample();
            raw["stargazers_count"] = bad;
            let err = normalize(&raw, "octocat").unwrap_err();
            assert!(
                matches!(
                    err,
                    NormalizeError::InvalidField {
                        field: "stargazers_count",
                        ..
                    }
                ),
                "unexpected error {err:?}"
            );
        }
    }

    #[test]
    fn normalize_rejects_missing_identity() {
        let mut raw = sample();
        raw.as_object_mut().unwrap().remove("html_url");
        assert_eq!(
            normalize(&raw, "octocat").unwrap_err(),
            NormalizeError::MissingField("html_url")
        );

        assert_eq!(
            normalize(&json!([1, 2]), "octocat").unwrap_err(),
            NormalizeError::NotAnObject
        );
    }

    #[test]
    fn normalize_rejects_wrongly_typed_optional() {
        let mut raw = sample();
        raw["language"] = json!(42);
        let err = normalize(&raw, "octocat").unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::InvalidField {
                field: "language",
                ..
            }
        ));
    }
}

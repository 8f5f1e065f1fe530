use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Stable identifier of a scholar record.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScholarId(pub String);

impl ScholarId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScholarId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ScholarId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ScholarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Funded project attached to a scholar, active or expired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Full scholar document as stored. Unknown fields are carried through `extra` so exports keep
/// whatever the dataset provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScholarRecord {
    pub id: ScholarId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relevance_score: u32,
    /// Stored as text; datasets that carry a JSON boolean read as "Yes" / "No".
    #[serde(default, deserialize_with = "email_flag")]
    pub should_email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_grants_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_grants: Vec<Grant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub expired_grants: Vec<Grant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub publications: Vec<Publication>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reasoning: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmailFlag {
    Flag(bool),
    Text(String),
}

fn email_flag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<EmailFlag>::deserialize(deserializer)? {
        Some(EmailFlag::Flag(true)) => "Yes".to_string(),
        Some(EmailFlag::Flag(false)) => "No".to_string(),
        Some(EmailFlag::Text(text)) => text,
        None => String::new(),
    })
}

impl ScholarRecord {
    pub fn is_good_match(&self) -> bool {
        self.should_email.trim().eq_ignore_ascii_case("yes")
    }

    /// Department string as compared by the sub-department filter.
    pub fn full_department(&self) -> &str {
        self.department.as_deref().unwrap_or_default().trim()
    }

    pub fn summary(&self) -> ScholarSummary {
        ScholarSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            title: self.title.clone(),
            department: self.department.clone(),
            position: self.position.clone(),
            relevance_score: self.relevance_score,
            should_email: self.should_email.clone(),
            active_grants_count: self.active_grants_count,
            requirements: self.requirements.clone(),
            publications_count: self.publications.len(),
        }
    }
}

/// Card-level projection returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScholarSummary {
    pub id: ScholarId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    pub relevance_score: u32,
    pub should_email: String,
    pub active_grants_count: u32,
    pub requirements: Vec<String>,
    pub publications_count: usize,
}

/// Stable sort by descending relevance; equal scores keep their incoming order.
pub fn sort_by_relevance<T: std::borrow::Borrow<ScholarRecord>>(records: &mut [T]) {
    records.sort_by(|a, b| b.borrow().relevance_score.cmp(&a.borrow().relevance_score));
}

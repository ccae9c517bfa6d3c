//! Render context and its construction from domain entities
//!
//! A `Context` is the read-only nested mapping placeholders resolve
//! against. `ContextBuilder` assembles one from a medical record
//! aggregate and its loaded relations; it performs no I/O of its own.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Nested read-only mapping available for placeholder substitution.
///
/// Built once per render call and never mutated during rendering.
#[derive(Debug, Clone, Default)]
pub struct Context {
    map: Map<String, Value>,
}

impl Context {
    pub fn new(map: Map<String, Value>) -> Self {
        Self { map }
    }

    /// Wrap a JSON value. Anything but an object yields an empty
    /// context, since placeholder paths start with a key lookup.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self { map },
            _ => Self::default(),
        }
    }

    /// Look up a dot-separated path. Intermediate segments traverse
    /// objects by key and arrays by numeric index; anything else ends
    /// the traversal with `None`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.map.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

/// Clinic or hospital that owns the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Patient demographics as loaded from the patient registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub uuid: Uuid,
    pub mrn: String,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whole years between date of birth and `today`.
    fn age_at(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| today.years_since(dob))
    }
}

/// The visit a record was written during.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Visit {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub visit_type: String,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub status: String,
}

/// Clinician who authored the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub role: String,
    pub email: Option<String>,
}

/// A medical record aggregate with whatever relations the caller has
/// loaded. Absent relations produce empty context maps, not errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub record_type: String,
    pub title: String,
    pub summary: Option<String>,
    /// Structured payload of the record, surfaced as `data_json`.
    #[serde(default)]
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub patient: Option<Patient>,
    #[serde(default)]
    pub visit: Option<Visit>,
    #[serde(default)]
    pub authored_by: Option<Author>,
}

/// Assembles the nested context map consumed by the resolver.
pub struct ContextBuilder;

impl ContextBuilder {
    /// Build a context from a record and its loaded relations.
    ///
    /// `now` and `date` are stamped here, at build time. If rendering
    /// is deferred the timestamps go stale with the context, which is
    /// the intended behavior.
    pub fn from_record(record: &MedicalRecord) -> Context {
        let now = Utc::now();
        let today = now.date_naive();

        let mut map = Map::new();
        map.insert(
            "organization".to_string(),
            record
                .organization
                .as_ref()
                .map(organization_map)
                .unwrap_or_else(|| json!({})),
        );
        map.insert(
            "patient".to_string(),
            record
                .patient
                .as_ref()
                .map(|p| patient_map(p, today))
                .unwrap_or_else(|| json!({})),
        );
        map.insert(
            "visit".to_string(),
            record
                .visit
                .as_ref()
                .map(visit_map)
                .unwrap_or_else(|| json!({})),
        );
        map.insert("record".to_string(), record_map(record));
        map.insert(
            "authored_by".to_string(),
            record
                .authored_by
                .as_ref()
                .map(author_map)
                .unwrap_or_else(|| json!({"name": "Unknown"})),
        );
        map.insert(
            "now".to_string(),
            json!(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        map.insert("date".to_string(), json!(today.format("%Y-%m-%d").to_string()));
        map.insert("uuid".to_string(), json!(record.uuid.to_string()));
        map.insert("data_json".to_string(), Value::Object(record.data.clone()));

        Context::new(map)
    }
}

fn organization_map(org: &Organization) -> Value {
    json!({
        "name": org.name,
        "code": org.code,
        "address": org.address,
        "phone": org.phone,
        "email": org.email,
    })
}

fn patient_map(patient: &Patient, today: NaiveDate) -> Value {
    json!({
        "id": patient.id,
        "uuid": patient.uuid.to_string(),
        "mrn": patient.mrn,
        "full_name": patient.full_name(),
        "first_name": patient.first_name,
        "last_name": patient.last_name,
        "sex": patient.sex,
        "date_of_birth": patient.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
        "age": patient.age_at(today),
        "national_id": patient.national_id,
        "email": patient.email,
        "phone": patient.phone,
        "address": patient.address,
        "emergency_contact": patient.emergency_contact,
        "notes": patient.notes,
        "is_active": patient.is_active,
    })
}

fn visit_map(visit: &Visit) -> Value {
    json!({
        "date": visit.date.format("%Y-%m-%d").to_string(),
        "type": visit.visit_type,
        "diagnosis": visit.diagnosis,
        "notes": visit.notes,
        "status": visit.status,
    })
}

/// Flattened scalar attributes of the record entity itself. Relations
/// are surfaced under their own top-level keys, not here.
fn record_map(record: &MedicalRecord) -> Value {
    json!({
        "id": record.id,
        "uuid": record.uuid.to_string(),
        "record_type": record.record_type,
        "title": record.title,
        "summary": record.summary,
        "created_at": record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

fn author_map(author: &Author) -> Value {
    json!({
        "name": author.name,
        "role": author.role,
        "email": author.email,
    })
}

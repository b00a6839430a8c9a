//! Meetings and their resolved references

use chrono::DateTime;
use chrono::Utc;
use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::contacts::Contact;
use crate::leads::Lead;

/// Top-level keys owned by the server
///
/// Never taken from a payload, on create nor on update
pub const SERVER_MANAGED_FIELDS: &[&str] = &[
    "id",
    "_id",
    "createBy",
    "timestamp",
    "deleted",
    "createdByName",
];

#[derive(Clone, Debug)]
pub struct Meeting {
    pub id: Uuid,
    pub create_by: Uuid,
    pub attendes: Vec<Uuid>,
    pub attendes_lead: Vec<Uuid>,
    pub attributes: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,
}

impl Meeting {
    /// Is the given ID one of the attendees
    pub fn has_attendee(&self, id: &Uuid) -> bool {
        self.attendes.contains(id)
    }

    /// Is the given ID one of the attending leads
    pub fn has_attendee_lead(&self, id: &Uuid) -> bool {
        self.attendes_lead.contains(id)
    }

    /// Compare an open attribute with the textual value of a filter
    pub fn attribute_equals(&self, key: &str, expected: &str) -> bool {
        self.attributes
            .get(key)
            .and_then(attribute_text)
            .is_some_and(|text| text == expected)
    }
}

/// A meeting with its creator, contacts and leads resolved
#[derive(Clone, Debug)]
pub struct MeetingDetails {
    pub meeting: Meeting,

    /// First and last name of the creator, `None` without a creator record
    pub created_by_name: Option<String>,

    pub attendes: Vec<Contact>,
    pub attendes_lead: Vec<Lead>,
}

/// Remove the server managed keys from open attributes
pub fn strip_server_managed_fields(attributes: &mut Map<String, Value>) {
    for field in SERVER_MANAGED_FIELDS {
        attributes.remove(*field);
    }
}

/// Textual form of a scalar attribute, the way it is compared against query parameters
///
/// Arrays, objects and `null` have no textual form
fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(boolean) => Some(boolean.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn meeting_with(attributes: Value) -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            create_by: Uuid::new_v4(),
            attendes: Vec::new(),
            attendes_lead: Vec::new(),
            attributes: attributes.as_object().cloned().unwrap(),
            timestamp: Utc::now(),
            deleted: false,
        }
    }

    #[test]
    fn test_attribute_equals() {
        let meeting = meeting_with(json!({
            "agenda": "Quarterly review",
            "duration": 45,
            "online": true,
            "notes": null,
            "related": ["a"],
        }));

        assert!(meeting.attribute_equals("agenda", "Quarterly review"));
        assert!(meeting.attribute_equals("duration", "45"));
        assert!(meeting.attribute_equals("online", "true"));

        assert!(!meeting.attribute_equals("agenda", "quarterly review"));
        assert!(!meeting.attribute_equals("notes", "null"));
        assert!(!meeting.attribute_equals("related", "a"));
        assert!(!meeting.attribute_equals("location", ""));
    }

    #[test]
    fn test_strip_server_managed_fields() {
        let mut attributes = json!({
            "_id": "abc",
            "id": "abc",
            "createBy": "someone",
            "timestamp": "2020-01-01T00:00:00Z",
            "deleted": true,
            "createdByName": "Some One",
            "agenda": "Kick-off",
        })
        .as_object()
        .cloned()
        .unwrap();

        strip_server_managed_fields(&mut attributes);

        assert_eq!(1, attributes.len());
        assert_eq!(Some(&json!("Kick-off")), attributes.get("agenda"));
    }
}

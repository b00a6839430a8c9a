use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

/// A contact that can attend meetings
///
/// Everything but the identity is an open document
#[derive(Clone, Debug)]
pub struct Contact {
    pub id: Uuid,
    pub document: Map<String, Value>,
    pub deleted: bool,
}

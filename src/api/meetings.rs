//! Meeting API management
//!
//! Every failure other than a missing meeting is answered with a generic message per operation,
//! the cause only ends up in the logs.

use std::collections::HashMap;

use axum::Extension;
use axum::extract::Query;
use axum::extract::rejection::QueryRejection;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::contacts::Contact;
use crate::leads::Lead;
use crate::meetings::Meeting;
use crate::meetings::MeetingDetails;
use crate::meetings::strip_server_managed_fields;
use crate::policy::MeetingFilter;
use crate::storage::CreateMeetingValues;
use crate::storage::Storage;
use crate::storage::UpdateMeetingValues;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::Success;
use super::response::failed;

const FETCH_MEETINGS_FAILED: &str = "Failed to fetch meetings";
const CREATE_MEETING_FAILED: &str = "Failed to create meeting";
const FETCH_MEETING_FAILED: &str = "Failed to fetch meeting";
const UPDATE_MEETING_FAILED: &str = "Failed to update meeting";
const DELETE_MEETING_FAILED: &str = "Failed to delete meeting";
const DELETE_MEETINGS_FAILED: &str = "Failed to delete meetings";

const MEETING_NOT_FOUND: &str = "Meeting not found";

/// A stored meeting, its open attributes next to the known fields
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingResponse {
    pub id: Uuid,
    pub create_by: Uuid,
    pub attendes: Vec<Uuid>,
    pub attendes_lead: Vec<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl From<Meeting> for MeetingResponse {
    fn from(meeting: Meeting) -> Self {
        Self {
            id: meeting.id,
            create_by: meeting.create_by,
            attendes: meeting.attendes,
            attendes_lead: meeting.attendes_lead,
            timestamp: meeting.timestamp,
            deleted: meeting.deleted,
            attributes: meeting.attributes,
        }
    }
}

/// A meeting with the name of its creator, and its contacts and leads embedded
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingDetailsResponse {
    pub id: Uuid,
    pub create_by: Uuid,
    pub created_by_name: Option<String>,
    pub attendes: Vec<Map<String, Value>>,
    pub attendes_lead: Vec<Map<String, Value>>,
    pub timestamp: DateTime<Utc>,
    pub deleted: bool,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// An embedded contact or lead: the open document with its identity on top
fn embedded(id: Uuid, deleted: bool, mut document: Map<String, Value>) -> Map<String, Value> {
    document.insert("id".to_string(), Value::String(id.to_string()));
    document.insert("deleted".to_string(), Value::Bool(deleted));

    document
}

impl From<Contact> for Map<String, Value> {
    fn from(contact: Contact) -> Self {
        embedded(contact.id, contact.deleted, contact.document)
    }
}

impl From<Lead> for Map<String, Value> {
    fn from(lead: Lead) -> Self {
        embedded(lead.id, lead.deleted, lead.document)
    }
}

impl From<MeetingDetails> for MeetingDetailsResponse {
    fn from(details: MeetingDetails) -> Self {
        let meeting = details.meeting;

        Self {
            id: meeting.id,
            create_by: meeting.create_by,
            created_by_name: details.created_by_name,
            attendes: details.attendes.into_iter().map(Map::from).collect(),
            attendes_lead: details.attendes_lead.into_iter().map(Map::from).collect(),
            timestamp: meeting.timestamp,
            deleted: meeting.deleted,
            attributes: meeting.attributes,
        }
    }
}

/// Response of a single soft-delete
#[derive(Debug, Serialize)]
pub struct DeleteMeetingResponse {
    pub message: &'static str,
    pub result: MeetingResponse,
}

/// Response of a batch soft-delete
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMeetingsResponse {
    pub message: &'static str,

    /// Meetings that actually changed
    pub deleted_count: u64,
}

/// Meeting form, used to create and to update
///
/// Every key that is not a reference set ends up in the open attributes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingForm {
    attendes: Option<Vec<Uuid>>,
    attendes_lead: Option<Vec<Uuid>>,

    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl MeetingForm {
    /// Drop everything the server owns
    fn into_allowed(mut self) -> Self {
        strip_server_managed_fields(&mut self.attributes);

        self
    }
}

/// List the meetings visible to the current user
///
/// Query parameters filter the list, `createBy` is only honored for super admins
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:6000/api/meetings?agenda=Kick-off'
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Success<Vec<MeetingDetailsResponse>>, Error> {
    let Query(query) = query.map_err(failed(FETCH_MEETINGS_FAILED))?;

    let filter =
        MeetingFilter::from_query(&current_user, query).map_err(failed(FETCH_MEETINGS_FAILED))?;

    tracing::debug!("Listing meetings for `{}`: {filter:?}", current_user.username);

    let meetings = storage
        .find_all_meetings(&filter)
        .await
        .map_err(failed(FETCH_MEETINGS_FAILED))?;

    Ok(Success::ok(
        meetings
            .into_iter()
            .map(MeetingDetailsResponse::from)
            .collect(),
    ))
}

/// Create a meeting, owned by the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "agenda": "Kick-off", "attendes": ["<uuid>"] }' \
///     http://localhost:6000/api/meetings
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    form: Result<Form<MeetingForm>, Error>,
) -> Result<Success<MeetingResponse>, Error> {
    let Form(form) = form.map_err(failed(CREATE_MEETING_FAILED))?;
    let form = form.into_allowed();

    let values = CreateMeetingValues {
        user: &current_user,
        attendes: form.attendes.as_deref().unwrap_or_default(),
        attendes_lead: form.attendes_lead.as_deref().unwrap_or_default(),
        attributes: &form.attributes,
    };

    let meeting = storage
        .create_meeting(&values)
        .await
        .map_err(failed(CREATE_MEETING_FAILED))?;

    tracing::debug!("Meeting {} created by `{}`", meeting.id, current_user.username);

    Ok(Success::ok(MeetingResponse::from(meeting)))
}

/// Get a single meeting
///
/// Any meeting can be fetched by its ID, soft-deleted ones included
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/meetings/<uuid>
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser<S>,
    meeting_id: Result<PathParameters<Uuid>, Error>,
) -> Result<Success<MeetingDetailsResponse>, Error> {
    let PathParameters(meeting_id) = meeting_id.map_err(failed(FETCH_MEETING_FAILED))?;

    let details = storage
        .find_single_meeting_by_id(&meeting_id)
        .await
        .map_err(failed(FETCH_MEETING_FAILED))?
        .ok_or_else(|| Error::not_found(MEETING_NOT_FOUND))?;

    Ok(Success::ok(MeetingDetailsResponse::from(details)))
}

/// Update a meeting
///
/// Given attributes are set, `attendes` and `attendesLead` are replaced when given
///
/// Request:
/// ```sh
/// curl -v -XPUT -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "location": "Room 1" }' \
///     http://localhost:6000/api/meetings/<uuid>
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    meeting_id: Result<PathParameters<Uuid>, Error>,
    form: Result<Form<MeetingForm>, Error>,
) -> Result<Success<MeetingResponse>, Error> {
    let PathParameters(meeting_id) = meeting_id.map_err(failed(UPDATE_MEETING_FAILED))?;
    let Form(form) = form.map_err(failed(UPDATE_MEETING_FAILED))?;
    let form = form.into_allowed();

    let values = UpdateMeetingValues {
        attendes: form.attendes.as_deref(),
        attendes_lead: form.attendes_lead.as_deref(),
        attributes: &form.attributes,
    };

    let meeting = storage
        .update_meeting(&meeting_id, &values)
        .await
        .map_err(failed(UPDATE_MEETING_FAILED))?
        .ok_or_else(|| Error::not_found(MEETING_NOT_FOUND))?;

    tracing::debug!("Meeting {} updated by `{}`", meeting.id, current_user.username);

    Ok(Success::ok(MeetingResponse::from(meeting)))
}

/// Soft-delete a meeting
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/meetings/<uuid>
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    meeting_id: Result<PathParameters<Uuid>, Error>,
) -> Result<Success<DeleteMeetingResponse>, Error> {
    let PathParameters(meeting_id) = meeting_id.map_err(failed(DELETE_MEETING_FAILED))?;

    let meeting = storage
        .delete_meeting(&meeting_id)
        .await
        .map_err(failed(DELETE_MEETING_FAILED))?
        .ok_or_else(|| Error::not_found(MEETING_NOT_FOUND))?;

    tracing::debug!("Meeting {} deleted by `{}`", meeting.id, current_user.username);

    Ok(Success::ok(DeleteMeetingResponse {
        message: "Meeting deleted successfully",
        result: MeetingResponse::from(meeting),
    }))
}

/// Soft-delete multiple meetings at once
///
/// Unknown and already deleted meetings are skipped
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '["<uuid>", "<uuid>"]' \
///     http://localhost:6000/api/meetings/delete-many
/// ```
pub async fn delete_many<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    form: Result<Form<Vec<Uuid>>, Error>,
) -> Result<Success<DeleteMeetingsResponse>, Error> {
    let Form(meeting_ids) = form.map_err(failed(DELETE_MEETINGS_FAILED))?;

    let deleted_count = storage
        .delete_meetings(&meeting_ids)
        .await
        .map_err(failed(DELETE_MEETINGS_FAILED))?;

    tracing::debug!(
        "{deleted_count} of {} meetings deleted by `{}`",
        meeting_ids.len(),
        current_user.username
    );

    Ok(Success::ok(DeleteMeetingsResponse {
        message: "Meetings deleted successfully",
        deleted_count,
    }))
}

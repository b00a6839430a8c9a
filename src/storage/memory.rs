//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Map;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::contacts::Contact;
use crate::leads::Lead;
use crate::meetings::Meeting;
use crate::meetings::MeetingDetails;
use crate::policy::MeetingFilter;
use crate::users::User;

use super::CreateMeetingValues;
use super::CreateUserValues;
use super::Result;
use super::Storage;
use super::UpdateMeetingValues;

/// An in-memory storage
///
/// Will be destroyed on system shutdown. Clones share the same collections.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// All users in storage
    users: Arc<Mutex<HashMap<Uuid, User>>>,

    /// All contacts in storage
    contacts: Arc<Mutex<HashMap<Uuid, Contact>>>,

    /// All leads in storage
    leads: Arc<Mutex<HashMap<Uuid, Lead>>>,

    /// All meetings in storage
    meetings: Arc<Mutex<HashMap<Uuid, Meeting>>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolve the references of a meeting
///
/// Attendees without a stored record are left out
fn resolve(
    meeting: &Meeting,
    creator: Option<&User>,
    contacts: &HashMap<Uuid, Contact>,
    leads: &HashMap<Uuid, Lead>,
) -> MeetingDetails {
    MeetingDetails {
        meeting: meeting.clone(),
        created_by_name: creator.map(User::display_name),
        attendes: meeting
            .attendes
            .iter()
            .filter_map(|id| contacts.get(id).cloned())
            .collect(),
        attendes_lead: meeting
            .attendes_lead
            .iter()
            .filter_map(|id| leads.get(id).cloned())
            .collect(),
    }
}

impl Storage for Memory {
    async fn find_any_single_user(&self) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| !user.deleted)
            .cloned())
    }

    async fn find_single_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .get(id)
            .filter(|user| !user.deleted)
            .cloned())
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            session_id: *values.session_id,
            username: values.username.to_string(),
            hashed_password: values.hashed_password.to_string(),
            first_name: values.first_name.to_string(),
            last_name: values.last_name.to_string(),
            role: values.role,
            deleted: false,
        };

        self.users.lock().await.insert(user.id, user.clone());

        Ok(user)
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        if let Some(user) = self.users.lock().await.get_mut(&user.id) {
            user.deleted = true;
        }

        Ok(())
    }

    async fn create_contact(&self, document: &Map<String, Value>) -> Result<Contact> {
        let contact = Contact {
            id: Uuid::new_v4(),
            document: document.clone(),
            deleted: false,
        };

        self.contacts
            .lock()
            .await
            .insert(contact.id, contact.clone());

        Ok(contact)
    }

    async fn create_lead(&self, document: &Map<String, Value>) -> Result<Lead> {
        let lead = Lead {
            id: Uuid::new_v4(),
            document: document.clone(),
            deleted: false,
        };

        self.leads.lock().await.insert(lead.id, lead.clone());

        Ok(lead)
    }

    async fn find_all_meetings(&self, filter: &MeetingFilter) -> Result<Vec<MeetingDetails>> {
        // always users, contacts, leads, meetings: the only place holding multiple locks
        let users = self.users.lock().await;
        let contacts = self.contacts.lock().await;
        let leads = self.leads.lock().await;
        let meetings = self.meetings.lock().await;

        let mut found = meetings
            .values()
            .filter(|meeting| filter.matches(meeting))
            .filter_map(|meeting| {
                let creator = users.get(&meeting.create_by).filter(|user| !user.deleted)?;

                Some(resolve(meeting, Some(creator), &contacts, &leads))
            })
            .collect::<Vec<MeetingDetails>>();

        found.sort_by(|a, b| {
            a.meeting
                .timestamp
                .cmp(&b.meeting.timestamp)
                .then_with(|| a.meeting.id.cmp(&b.meeting.id))
        });

        Ok(found)
    }

    async fn find_single_meeting_by_id(&self, id: &Uuid) -> Result<Option<MeetingDetails>> {
        let users = self.users.lock().await;
        let contacts = self.contacts.lock().await;
        let leads = self.leads.lock().await;
        let meetings = self.meetings.lock().await;

        Ok(meetings.get(id).map(|meeting| {
            resolve(meeting, users.get(&meeting.create_by), &contacts, &leads)
        }))
    }

    async fn create_meeting(&self, values: &CreateMeetingValues<'_>) -> Result<Meeting> {
        let meeting = Meeting {
            id: Uuid::new_v4(),
            create_by: values.user.id,
            attendes: values.attendes.to_vec(),
            attendes_lead: values.attendes_lead.to_vec(),
            attributes: values.attributes.clone(),
            timestamp: Utc::now(),
            deleted: false,
        };

        self.meetings
            .lock()
            .await
            .insert(meeting.id, meeting.clone());

        Ok(meeting)
    }

    async fn update_meeting(
        &self,
        id: &Uuid,
        values: &UpdateMeetingValues<'_>,
    ) -> Result<Option<Meeting>> {
        Ok(self.meetings.lock().await.get_mut(id).map(|meeting| {
            if let Some(attendes) = values.attendes {
                meeting.attendes = attendes.to_vec();
            }

            if let Some(attendes_lead) = values.attendes_lead {
                meeting.attendes_lead = attendes_lead.to_vec();
            }

            for (key, value) in values.attributes {
                meeting.attributes.insert(key.clone(), value.clone());
            }

            meeting.timestamp = Utc::now();

            meeting.clone()
        }))
    }

    async fn delete_meeting(&self, id: &Uuid) -> Result<Option<Meeting>> {
        Ok(self.meetings.lock().await.get_mut(id).map(|meeting| {
            meeting.deleted = true;

            meeting.clone()
        }))
    }

    async fn delete_meetings(&self, ids: &[Uuid]) -> Result<u64> {
        let mut meetings = self.meetings.lock().await;

        let mut changed = 0;

        for id in ids {
            if let Some(meeting) = meetings.get_mut(id) {
                if !meeting.deleted {
                    meeting.deleted = true;
                    changed += 1;
                }
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::policy::MeetingCriteria;
    use crate::users::Role;

    async fn user(storage: &Memory, role: Role) -> User {
        let username = Uuid::new_v4().to_string();

        storage
            .create_user(&CreateUserValues {
                session_id: &Uuid::new_v4(),
                role,
                username: &username,
                first_name: "Ada",
                last_name: "Lovelace",
                hashed_password: "",
            })
            .await
            .unwrap()
    }

    async fn meeting(storage: &Memory, user: &User, attendes: &[Uuid]) -> Meeting {
        storage
            .create_meeting(&CreateMeetingValues {
                user,
                attendes,
                attendes_lead: &[],
                attributes: json!({ "agenda": "Sync" }).as_object().unwrap(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_find_single_meeting_resolves_references() {
        let storage = Memory::new();
        let user = user(&storage, Role::User).await;

        let contact = storage
            .create_contact(json!({ "firstName": "Grace" }).as_object().unwrap())
            .await
            .unwrap();

        let meeting = meeting(&storage, &user, &[contact.id, Uuid::new_v4()]).await;

        let details = storage
            .find_single_meeting_by_id(&meeting.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(Some("Ada Lovelace".to_string()), details.created_by_name);
        assert_eq!(1, details.attendes.len());
        assert_eq!(contact.id, details.attendes[0].id);
        assert!(details.attendes_lead.is_empty());
    }

    #[tokio::test]
    async fn test_find_all_meetings_skips_deleted_creators() {
        let storage = Memory::new();
        let super_admin = user(&storage, Role::SuperAdmin).await;
        let creator = user(&storage, Role::User).await;

        let meeting = meeting(&storage, &creator, &[]).await;

        let filter = MeetingFilter::for_user(&super_admin, MeetingCriteria::default());
        assert_eq!(1, storage.find_all_meetings(&filter).await.unwrap().len());

        storage.delete_user(&creator).await.unwrap();
        assert!(storage.find_all_meetings(&filter).await.unwrap().is_empty());

        // still reachable by ID, including the name of the deleted creator
        let details = storage
            .find_single_meeting_by_id(&meeting.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Some("Ada Lovelace".to_string()), details.created_by_name);
    }

    #[tokio::test]
    async fn test_update_meeting_merges_attributes() {
        let storage = Memory::new();
        let user = user(&storage, Role::User).await;
        let meeting = meeting(&storage, &user, &[]).await;

        let attributes = json!({ "location": "Room 1" });
        let updated = storage
            .update_meeting(
                &meeting.id,
                &UpdateMeetingValues {
                    attendes: None,
                    attendes_lead: None,
                    attributes: attributes.as_object().unwrap(),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(Some(&json!("Sync")), updated.attributes.get("agenda"));
        assert_eq!(Some(&json!("Room 1")), updated.attributes.get("location"));
        assert!(updated.timestamp >= meeting.timestamp);

        let missing = storage
            .update_meeting(
                &Uuid::new_v4(),
                &UpdateMeetingValues {
                    attendes: None,
                    attendes_lead: None,
                    attributes: attributes.as_object().unwrap(),
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_meetings_counts_changes() {
        let storage = Memory::new();
        let user = user(&storage, Role::User).await;

        let first = meeting(&storage, &user, &[]).await;
        let second = meeting(&storage, &user, &[]).await;

        storage.delete_meeting(&second.id).await.unwrap();

        let changed = storage
            .delete_meetings(&[first.id, second.id, Uuid::new_v4()])
            .await
            .unwrap();

        assert_eq!(1, changed);
    }
}

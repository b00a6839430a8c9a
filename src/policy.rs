//! Meeting visibility policy
//!
//! Turns the filter criteria of a caller into a declarative [`MeetingFilter`]. Storage backends
//! only translate the filter, they never look at roles.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::meetings::Meeting;
use crate::users::User;

/// Criteria key for the creator of a meeting
const CREATE_BY: &str = "createBy";

/// Criteria key for an attending contact
const ATTENDES: &str = "attendes";

/// Criteria key for an attending lead
const ATTENDES_LEAD: &str = "attendesLead";

/// Criteria key for the soft-delete flag, always forced to `false`
const DELETED: &str = "deleted";

/// Filter criteria supplied by the caller
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeetingCriteria {
    /// Only meetings created by this user
    pub create_by: Option<Uuid>,

    /// Only meetings attended by this contact
    pub attendee: Option<Uuid>,

    /// Only meetings attended by this lead
    pub attendee_lead: Option<Uuid>,

    /// Open attributes compared by their textual value
    pub attributes: BTreeMap<String, String>,
}

/// Criteria that could not be understood
#[derive(Debug, PartialEq, Eq)]
pub enum CriteriaError {
    /// A reference criteria is not a valid ID
    InvalidId {
        /// Criteria key
        field: &'static str,

        /// The offending value
        value: String,
    },
}

impl std::error::Error for CriteriaError {}

impl fmt::Display for CriteriaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CriteriaError::InvalidId { field, value } => {
                write!(f, r#"Invalid ID for "{field}": {value}"#)
            }
        }
    }
}

impl MeetingCriteria {
    /// Interpret raw query parameters
    ///
    /// A `deleted` criteria is dropped, the soft-delete filter is not up to the caller
    pub fn from_query(query: HashMap<String, String>) -> Result<Self, CriteriaError> {
        let mut criteria = Self::default();

        for (key, value) in query {
            match key.as_str() {
                CREATE_BY => criteria.create_by = Some(parse_id(CREATE_BY, value)?),
                ATTENDES => criteria.attendee = Some(parse_id(ATTENDES, value)?),
                ATTENDES_LEAD => criteria.attendee_lead = Some(parse_id(ATTENDES_LEAD, value)?),
                DELETED => {}
                _ => {
                    criteria.attributes.insert(key, value);
                }
            }
        }

        Ok(criteria)
    }
}

fn parse_id(field: &'static str, value: String) -> Result<Uuid, CriteriaError> {
    Uuid::parse_str(&value).map_err(|_| CriteriaError::InvalidId { field, value })
}

/// Which meetings a caller may see
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// No restriction
    Everything,

    /// Only meetings created by this user, or with this ID among the attendees
    CreatorOrAttendee(Uuid),
}

/// Declarative filter for listing meetings
///
/// Soft-deleted meetings never match
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeetingFilter {
    pub criteria: MeetingCriteria,
    pub visibility: Visibility,
}

impl MeetingFilter {
    /// Apply the visibility rules of a user to the criteria
    ///
    /// Callers without a privileged role lose their `createBy` criteria, it is replaced by
    /// the creator-or-attendee restriction
    pub fn for_user(user: &User, mut criteria: MeetingCriteria) -> Self {
        let visibility = if user.role.is_privileged() {
            Visibility::Everything
        } else {
            criteria.create_by = None;
            Visibility::CreatorOrAttendee(user.id)
        };

        Self {
            criteria,
            visibility,
        }
    }

    /// Interpret raw query parameters for a user
    ///
    /// The `createBy` of a caller without a privileged role is dropped before anything is
    /// parsed, a malformed one can not fail the request
    pub fn from_query(
        user: &User,
        mut query: HashMap<String, String>,
    ) -> Result<Self, CriteriaError> {
        if !user.role.is_privileged() {
            query.remove(CREATE_BY);
        }

        Ok(Self::for_user(user, MeetingCriteria::from_query(query)?))
    }

    /// Evaluate the filter against a single meeting
    pub fn matches(&self, meeting: &Meeting) -> bool {
        if meeting.deleted {
            return false;
        }

        if let Visibility::CreatorOrAttendee(id) = self.visibility {
            if meeting.create_by != id && !meeting.has_attendee(&id) {
                return false;
            }
        }

        let criteria = &self.criteria;

        criteria
            .create_by
            .is_none_or(|create_by| meeting.create_by == create_by)
            && criteria
                .attendee
                .is_none_or(|attendee| meeting.has_attendee(&attendee))
            && criteria
                .attendee_lead
                .is_none_or(|attendee_lead| meeting.has_attendee_lead(&attendee_lead))
            && criteria
                .attributes
                .iter()
                .all(|(key, value)| meeting.attribute_equals(key, value))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Map;
    use serde_json::Value;

    use super::*;
    use crate::users::Role;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            username: "someone".to_string(),
            hashed_password: String::new(),
            first_name: "Some".to_string(),
            last_name: "One".to_string(),
            role,
            deleted: false,
        }
    }

    fn meeting(create_by: Uuid, attendes: Vec<Uuid>) -> Meeting {
        let mut attributes = Map::new();
        attributes.insert("agenda".to_string(), Value::String("Demo".to_string()));

        Meeting {
            id: Uuid::new_v4(),
            create_by,
            attendes,
            attendes_lead: Vec::new(),
            attributes,
            timestamp: Utc::now(),
            deleted: false,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_criteria_from_query() {
        let creator = Uuid::new_v4();
        let contact = Uuid::new_v4();

        let criteria = MeetingCriteria::from_query(query(&[
            ("createBy", &creator.to_string()),
            ("attendes", &contact.to_string()),
            ("deleted", "true"),
            ("agenda", "Demo"),
        ]))
        .unwrap();

        assert_eq!(Some(creator), criteria.create_by);
        assert_eq!(Some(contact), criteria.attendee);
        assert_eq!(None, criteria.attendee_lead);
        assert_eq!(1, criteria.attributes.len());
        assert_eq!(Some(&"Demo".to_string()), criteria.attributes.get("agenda"));
    }

    #[test]
    fn test_criteria_from_query_with_invalid_id() {
        let error = MeetingCriteria::from_query(query(&[("createBy", "not-an-id")])).unwrap_err();

        assert_eq!(
            CriteriaError::InvalidId {
                field: "createBy",
                value: "not-an-id".to_string()
            },
            error
        );
    }

    #[test]
    fn test_super_admin_keeps_create_by() {
        let super_admin = user(Role::SuperAdmin);
        let creator = Uuid::new_v4();

        let criteria = MeetingCriteria {
            create_by: Some(creator),
            ..MeetingCriteria::default()
        };

        let filter = MeetingFilter::for_user(&super_admin, criteria);

        assert_eq!(Visibility::Everything, filter.visibility);
        assert_eq!(Some(creator), filter.criteria.create_by);

        assert!(filter.matches(&meeting(creator, Vec::new())));
        assert!(!filter.matches(&meeting(super_admin.id, Vec::new())));
    }

    #[test]
    fn test_user_loses_create_by() {
        let regular = user(Role::User);
        let someone_else = Uuid::new_v4();

        let criteria = MeetingCriteria {
            create_by: Some(someone_else),
            ..MeetingCriteria::default()
        };

        let filter = MeetingFilter::for_user(&regular, criteria);

        assert_eq!(Visibility::CreatorOrAttendee(regular.id), filter.visibility);
        assert_eq!(None, filter.criteria.create_by);

        assert!(filter.matches(&meeting(regular.id, Vec::new())));
        assert!(filter.matches(&meeting(someone_else, vec![regular.id])));
        assert!(!filter.matches(&meeting(someone_else, Vec::new())));
    }

    #[test]
    fn test_malformed_create_by_only_fails_privileged_users() {
        let regular = user(Role::User);
        let super_admin = user(Role::SuperAdmin);

        let filter =
            MeetingFilter::from_query(&regular, query(&[("createBy", "not-an-id")])).unwrap();
        assert_eq!(None, filter.criteria.create_by);
        assert_eq!(Visibility::CreatorOrAttendee(regular.id), filter.visibility);

        let error = MeetingFilter::from_query(&super_admin, query(&[("createBy", "not-an-id")]))
            .unwrap_err();
        assert_eq!(
            CriteriaError::InvalidId {
                field: "createBy",
                value: "not-an-id".to_string()
            },
            error
        );
    }

    #[test]
    fn test_deleted_never_matches() {
        let super_admin = user(Role::SuperAdmin);
        let filter = MeetingFilter::for_user(&super_admin, MeetingCriteria::default());

        let mut deleted = meeting(super_admin.id, Vec::new());
        deleted.deleted = true;

        assert!(!filter.matches(&deleted));
    }

    #[test]
    fn test_attribute_criteria() {
        let super_admin = user(Role::SuperAdmin);

        let criteria = MeetingCriteria::from_query(query(&[("agenda", "Demo")])).unwrap();
        let filter = MeetingFilter::for_user(&super_admin, criteria);
        assert!(filter.matches(&meeting(super_admin.id, Vec::new())));

        let criteria = MeetingCriteria::from_query(query(&[("agenda", "Other")])).unwrap();
        let filter = MeetingFilter::for_user(&super_admin, criteria);
        assert!(!filter.matches(&meeting(super_admin.id, Vec::new())));
    }
}

//! Postgres storage
//!
//! Open documents live in `JSONB` columns, references in `UUID[]` columns

use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::QueryBuilder;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use crate::contacts::Contact;
use crate::leads::Lead;
use crate::meetings::Meeting;
use crate::meetings::MeetingDetails;
use crate::policy::MeetingFilter;
use crate::policy::Visibility;
use crate::users::Role;
use crate::users::User;

use super::CreateMeetingValues;
use super::CreateUserValues;
use super::Error;
use super::Result;
use super::Storage;
use super::UpdateMeetingValues;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Columns of a user
const USER_COLUMNS: &str = r"
    id,
    session_id,
    username,
    hashed_password,
    first_name,
    last_name,
    role,
    deleted
";

/// Columns of a meeting, for `RETURNING` clauses
const MEETING_COLUMNS: &str = r#"
    id,
    create_by,
    attendes,
    attendes_lead,
    attributes,
    "timestamp",
    deleted
"#;

/// A meeting joined with its creator, contacts and leads
///
/// Contacts and leads are aggregated into `JSONB` arrays, ordered by their position in the
/// reference arrays
const SELECT_MEETING_DETAILS: &str = r#"
    SELECT
        m.id,
        m.create_by,
        m.attendes,
        m.attendes_lead,
        m.attributes,
        m."timestamp",
        m.deleted,
        u.first_name || ' ' || u.last_name AS created_by_name,
        COALESCE(
            (
                SELECT jsonb_agg(
                    jsonb_build_object('id', c.id, 'deleted', c.deleted, 'document', c.document)
                    ORDER BY array_position(m.attendes, c.id)
                )
                FROM contacts c
                WHERE c.id = ANY(m.attendes)
            ),
            '[]'::jsonb
        ) AS attendes_contacts,
        COALESCE(
            (
                SELECT jsonb_agg(
                    jsonb_build_object('id', l.id, 'deleted', l.deleted, 'document', l.document)
                    ORDER BY array_position(m.attendes_lead, l.id)
                )
                FROM leads l
                WHERE l.id = ANY(m.attendes_lead)
            ),
            '[]'::jsonb
        ) AS attendes_leads
    FROM meetings m
    LEFT JOIN users u ON u.id = m.create_by
"#;

/// Postgres type for user role
#[derive(PartialEq, Debug, sqlx::Type)]
#[sqlx(type_name = "user_role_type")]
#[sqlx(rename_all = "kebab-case")]
enum UserRoleType {
    /// Super admin
    SuperAdmin,

    /// User
    User,
}

impl UserRoleType {
    /// Create user role type from role
    fn from_role(role: Role) -> Self {
        match role {
            Role::SuperAdmin => UserRoleType::SuperAdmin,
            Role::User => UserRoleType::User,
        }
    }

    /// Create role from user role type
    fn to_role(&self) -> Role {
        match self {
            UserRoleType::SuperAdmin => Role::SuperAdmin,
            UserRoleType::User => Role::User,
        }
    }
}

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Connect to Postgres
    ///
    /// Migrations will be run
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Self::with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn with_pool(connection_pool: PgPool) -> anyhow::Result<Self> {
        MIGRATOR.run(&connection_pool).await?;

        Ok(Self { connection_pool })
    }
}

/// Postgres version of user
#[derive(sqlx::FromRow)]
struct PostgresUser {
    id: Uuid,
    session_id: Uuid,
    username: String,
    hashed_password: String,
    first_name: String,
    last_name: String,
    role: UserRoleType,
    deleted: bool,
}

impl User {
    /// Create user from postgres version
    fn from_postgres_user(user: PostgresUser) -> Self {
        Self {
            id: user.id,
            session_id: user.session_id,
            username: user.username,
            hashed_password: user.hashed_password,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.to_role(),
            deleted: user.deleted,
        }
    }
}

/// Postgres version of contacts and leads
#[derive(sqlx::FromRow, Deserialize)]
struct PostgresDocument {
    id: Uuid,
    deleted: bool,
    document: Json<Map<String, Value>>,
}

impl Contact {
    fn from_postgres_document(document: PostgresDocument) -> Self {
        Self {
            id: document.id,
            document: document.document.0,
            deleted: document.deleted,
        }
    }
}

impl Lead {
    fn from_postgres_document(document: PostgresDocument) -> Self {
        Self {
            id: document.id,
            document: document.document.0,
            deleted: document.deleted,
        }
    }
}

/// Postgres version of meeting
#[derive(sqlx::FromRow)]
struct PostgresMeeting {
    id: Uuid,
    create_by: Uuid,
    attendes: Vec<Uuid>,
    attendes_lead: Vec<Uuid>,
    attributes: Json<Map<String, Value>>,
    timestamp: DateTime<Utc>,
    deleted: bool,
}

impl Meeting {
    /// Create meeting from postgres version
    fn from_postgres_meeting(meeting: PostgresMeeting) -> Self {
        Self {
            id: meeting.id,
            create_by: meeting.create_by,
            attendes: meeting.attendes,
            attendes_lead: meeting.attendes_lead,
            attributes: meeting.attributes.0,
            timestamp: meeting.timestamp,
            deleted: meeting.deleted,
        }
    }
}

/// Postgres version of a meeting with its references resolved
#[derive(sqlx::FromRow)]
struct PostgresMeetingDetails {
    #[sqlx(flatten)]
    meeting: PostgresMeeting,
    created_by_name: Option<String>,
    attendes_contacts: Json<Vec<PostgresDocument>>,
    attendes_leads: Json<Vec<PostgresDocument>>,
}

impl MeetingDetails {
    /// Create meeting details from postgres version
    fn from_postgres_meeting_details(details: PostgresMeetingDetails) -> Self {
        Self {
            meeting: Meeting::from_postgres_meeting(details.meeting),
            created_by_name: details.created_by_name,
            attendes: details
                .attendes_contacts
                .0
                .into_iter()
                .map(Contact::from_postgres_document)
                .collect(),
            attendes_lead: details
                .attendes_leads
                .0
                .into_iter()
                .map(Lead::from_postgres_document)
                .collect(),
        }
    }
}

impl Storage for Postgres {
    async fn find_any_single_user(&self) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE NOT deleted LIMIT 1"
        ))
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from_postgres_user))
    }

    async fn find_single_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 LIMIT 1"
        ))
        .bind(username)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from_postgres_user))
    }

    async fn find_single_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE NOT deleted AND id = $1 LIMIT 1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(user.map(User::from_postgres_user))
    }

    async fn create_user(&self, values: &CreateUserValues<'_>) -> Result<User> {
        let user = sqlx::query_as::<_, PostgresUser>(&format!(
            r"
            INSERT INTO users (id, session_id, username, hashed_password, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(Uuid::new_v4())
        .bind(values.session_id)
        .bind(values.username)
        .bind(values.hashed_password)
        .bind(values.first_name)
        .bind(values.last_name)
        .bind(UserRoleType::from_role(values.role))
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(User::from_postgres_user(user))
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        sqlx::query("UPDATE users SET deleted = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(())
    }

    async fn create_contact(&self, document: &Map<String, Value>) -> Result<Contact> {
        let contact = sqlx::query_as::<_, PostgresDocument>(
            r"
            INSERT INTO contacts (id, document)
            VALUES ($1, $2)
            RETURNING id, deleted, document
            ",
        )
        .bind(Uuid::new_v4())
        .bind(Json(document))
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(Contact::from_postgres_document(contact))
    }

    async fn create_lead(&self, document: &Map<String, Value>) -> Result<Lead> {
        let lead = sqlx::query_as::<_, PostgresDocument>(
            r"
            INSERT INTO leads (id, document)
            VALUES ($1, $2)
            RETURNING id, deleted, document
            ",
        )
        .bind(Uuid::new_v4())
        .bind(Json(document))
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(Lead::from_postgres_document(lead))
    }

    async fn find_all_meetings(&self, filter: &MeetingFilter) -> Result<Vec<MeetingDetails>> {
        let mut query = QueryBuilder::<sqlx::Postgres>::new(SELECT_MEETING_DETAILS);

        // an inner join on non-deleted creators, without a creator there is no `createdByName`
        query.push(" WHERE NOT m.deleted AND u.deleted = FALSE");

        if let Visibility::CreatorOrAttendee(id) = filter.visibility {
            query
                .push(" AND (m.create_by = ")
                .push_bind(id)
                .push(" OR ")
                .push_bind(id)
                .push(" = ANY(m.attendes))");
        }

        let criteria = &filter.criteria;

        if let Some(create_by) = criteria.create_by {
            query.push(" AND m.create_by = ").push_bind(create_by);
        }

        if let Some(attendee) = criteria.attendee {
            query
                .push(" AND ")
                .push_bind(attendee)
                .push(" = ANY(m.attendes)");
        }

        if let Some(attendee_lead) = criteria.attendee_lead {
            query
                .push(" AND ")
                .push_bind(attendee_lead)
                .push(" = ANY(m.attendes_lead)");
        }

        // only scalars have a textual value
        for (key, value) in &criteria.attributes {
            query
                .push(" AND jsonb_typeof(m.attributes -> ")
                .push_bind(key.clone())
                .push(") IN ('string', 'number', 'boolean')")
                .push(" AND m.attributes ->> ")
                .push_bind(key.clone())
                .push(" = ")
                .push_bind(value.clone());
        }

        query.push(r#" ORDER BY m."timestamp", m.id"#);

        let meetings = query
            .build_query_as::<PostgresMeetingDetails>()
            .fetch_all(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok(meetings
            .into_iter()
            .map(MeetingDetails::from_postgres_meeting_details)
            .collect())
    }

    async fn find_single_meeting_by_id(&self, id: &Uuid) -> Result<Option<MeetingDetails>> {
        let meeting = sqlx::query_as::<_, PostgresMeetingDetails>(&format!(
            "{SELECT_MEETING_DETAILS} WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(meeting.map(MeetingDetails::from_postgres_meeting_details))
    }

    async fn create_meeting(&self, values: &CreateMeetingValues<'_>) -> Result<Meeting> {
        let meeting = sqlx::query_as::<_, PostgresMeeting>(&format!(
            r#"
            INSERT INTO meetings (id, create_by, attendes, attendes_lead, attributes, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(values.user.id)
        .bind(values.attendes)
        .bind(values.attendes_lead)
        .bind(Json(values.attributes))
        .bind(Utc::now())
        .fetch_one(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(Meeting::from_postgres_meeting(meeting))
    }

    async fn update_meeting(
        &self,
        id: &Uuid,
        values: &UpdateMeetingValues<'_>,
    ) -> Result<Option<Meeting>> {
        let meeting = sqlx::query_as::<_, PostgresMeeting>(&format!(
            r#"
            UPDATE meetings
            SET
                attendes = COALESCE($2, attendes),
                attendes_lead = COALESCE($3, attendes_lead),
                attributes = attributes || $4,
                "timestamp" = $5
            WHERE id = $1
            RETURNING {MEETING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(values.attendes)
        .bind(values.attendes_lead)
        .bind(Json(values.attributes))
        .bind(Utc::now())
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(meeting.map(Meeting::from_postgres_meeting))
    }

    async fn delete_meeting(&self, id: &Uuid) -> Result<Option<Meeting>> {
        let meeting = sqlx::query_as::<_, PostgresMeeting>(&format!(
            r"
            UPDATE meetings
            SET deleted = TRUE
            WHERE id = $1
            RETURNING {MEETING_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(meeting.map(Meeting::from_postgres_meeting))
    }

    async fn delete_meetings(&self, ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE meetings
            SET deleted = TRUE
            WHERE id = ANY($1)
                AND NOT deleted
            ",
        )
        .bind(ids)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected())
    }
}

/// Utility function for mapping any error into a storage error
fn connection_error(err: sqlx::Error) -> Error {
    Error::Connection(err.to_string())
}

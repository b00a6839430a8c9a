//! All things related to the storage of meetings and their references

use std::fmt;
use std::future::Future;

use serde_json::Map;
use serde_json::Value;
use uuid::Uuid;

use crate::contacts::Contact;
use crate::leads::Lead;
use crate::meetings::Meeting;
use crate::meetings::MeetingDetails;
use crate::policy::MeetingFilter;
use crate::users::Role;
use crate::users::User;

pub use memory::Memory;
pub use postgres::Postgres;

mod memory;
mod postgres;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// A connection error with the storage
    Connection(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Connection(error) => write!(f, "Connection error: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Storage configuration
pub enum Config {
    /// Postgres when `DATABASE_URL` is set, memory otherwise
    DetectConfig(Option<String>),

    /// Use an existing memory storage
    ExistingMemory(Memory),
}

/// The storage backend picked by the configuration
pub enum Backend {
    Memory(Memory),
    Postgres(Postgres),
}

/// Setup the storage
///
/// # Errors
///
/// Will return `Err` when the database can not be reached or migrated
pub async fn setup(config: Config) -> anyhow::Result<Backend> {
    let backend = match config {
        Config::DetectConfig(Some(database_url)) => {
            tracing::info!("Using Postgres storage");
            Backend::Postgres(Postgres::connect(&database_url).await?)
        }
        Config::DetectConfig(None) => {
            tracing::info!("`DATABASE_URL` is not set, using memory storage");
            Backend::Memory(Memory::new())
        }
        Config::ExistingMemory(memory) => Backend::Memory(memory),
    };

    Ok(backend)
}

/// Values to create a User
pub struct CreateUserValues<'a> {
    /// The initial session ID for the user
    pub session_id: &'a Uuid,

    /// The role of the user
    pub role: Role,

    /// The username
    pub username: &'a str,

    pub first_name: &'a str,
    pub last_name: &'a str,

    /// The hashed password
    pub hashed_password: &'a str,
}

/// Values to create a Meeting
pub struct CreateMeetingValues<'a> {
    /// The user creating the meeting, becomes `createBy`
    pub user: &'a User,

    /// Attending contacts
    pub attendes: &'a [Uuid],

    /// Attending leads
    pub attendes_lead: &'a [Uuid],

    /// Open attributes, without server managed fields
    pub attributes: &'a Map<String, Value>,
}

/// Values to merge into a Meeting
///
/// Fields that are `None` are not touched, attributes are set key by key
pub struct UpdateMeetingValues<'a> {
    /// New attending contacts
    pub attendes: Option<&'a [Uuid]>,

    /// New attending leads
    pub attendes_lead: Option<&'a [Uuid]>,

    /// Attributes to set, without server managed fields
    pub attributes: &'a Map<String, Value>,
}

/// Storage with all supported operations
///
/// All methods return `Send` futures, the handlers run on a multi-threaded runtime
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find any single user
    ///
    /// Respects the soft-delete
    fn find_any_single_user(&self) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds a single user by its username
    ///
    /// DOES NOT respect the soft-delete, usernames stay taken
    fn find_single_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Finds a single user by its ID
    ///
    /// Respects the soft-delete
    fn find_single_user_by_id(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Create a single user
    fn create_user(&self, values: &CreateUserValues) -> impl Future<Output = Result<User>> + Send;

    /// Soft-delete a user
    fn delete_user(&self, user: &User) -> impl Future<Output = Result<()>> + Send;

    /// Create a contact from an open document
    fn create_contact(
        &self,
        document: &Map<String, Value>,
    ) -> impl Future<Output = Result<Contact>> + Send;

    /// Create a lead from an open document
    fn create_lead(&self, document: &Map<String, Value>)
    -> impl Future<Output = Result<Lead>> + Send;

    /// Find all meetings matching the filter, with their references resolved
    ///
    /// Respects the soft-delete, also drops meetings of missing or soft-deleted creators
    fn find_all_meetings(
        &self,
        filter: &MeetingFilter,
    ) -> impl Future<Output = Result<Vec<MeetingDetails>>> + Send;

    /// Find a single meeting by ID, with its references resolved
    ///
    /// DOES NOT respect the soft-delete
    fn find_single_meeting_by_id(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<MeetingDetails>>> + Send;

    /// Create a meeting, `timestamp` is set to now
    fn create_meeting(
        &self,
        values: &CreateMeetingValues,
    ) -> impl Future<Output = Result<Meeting>> + Send;

    /// Merge values into a meeting, `timestamp` is set to now
    ///
    /// Returns `None` when there is no meeting with this ID
    fn update_meeting(
        &self,
        id: &Uuid,
        values: &UpdateMeetingValues,
    ) -> impl Future<Output = Result<Option<Meeting>>> + Send;

    /// Soft-delete a meeting
    ///
    /// Returns `None` when there is no meeting with this ID
    fn delete_meeting(&self, id: &Uuid) -> impl Future<Output = Result<Option<Meeting>>> + Send;

    /// Soft-delete all meetings with these IDs
    ///
    /// Returns the number of meetings that changed, already deleted or missing meetings are
    /// not counted
    fn delete_meetings(&self, ids: &[Uuid]) -> impl Future<Output = Result<u64>> + Send;
}

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

/// Result alias for MongoDB store operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures of the MongoDB store, each naming what it was doing.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable is not set.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Rejected connection string.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver rejected the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A periodic health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection name.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a game failed.
    #[error("failed to save game `{id}`")]
    SaveGame {
        /// Game id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a game failed.
    #[error("failed to load game `{key}`")]
    LoadGame {
        /// Game id or join code.
        key: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a user failed.
    #[error("failed to save user `{id}`")]
    SaveUser {
        /// User id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading a user failed.
    #[error("failed to load user `{key}`")]
    LoadUser {
        /// User id or username.
        key: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Updating played-game counters failed.
    #[error("failed to update statistics for {count} user(s)")]
    UpdateUsers {
        /// Users in the update.
        count: usize,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing an audit log entry failed.
    #[error("failed to write log entry for game `{game_id}`")]
    AppendLog {
        /// Game the entry belongs to.
        game_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading the audit log failed.
    #[error("failed to list log entries for game `{game_id}`")]
    ListLogs {
        /// Game whose log was read.
        game_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a snapshot failed.
    #[error("failed to save snapshot `{id}`")]
    SaveSnapshot {
        /// Snapshot id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading snapshots failed.
    #[error("failed to load snapshots for game `{game_id}`")]
    LoadSnapshot {
        /// Game the snapshots belong to.
        game_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing or deleting a custom script failed.
    #[error("failed to write script `{id}`")]
    WriteScript {
        /// Script id.
        id: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading custom scripts or the games that use them failed.
    #[error("failed to load scripts")]
    LoadScripts {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing an action or its undo flag failed.
    #[error("failed to write action for game `{game_id}`")]
    WriteAction {
        /// Game the action belongs to.
        game_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading or counting actions failed.
    #[error("failed to load actions for game `{game_id}`")]
    LoadActions {
        /// Game the actions belong to.
        game_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Writing a finished-game summary failed.
    #[error("failed to save summary of game `{game_id}`")]
    SaveSummary {
        /// Finished game.
        game_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading finished-game summaries failed.
    #[error("failed to load game summaries for `{key}`")]
    LoadSummary {
        /// Game or user id used for the lookup.
        key: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    /// Whether the failure comes from a unique index rejecting the write.
    pub fn is_duplicate_key(&self) -> bool {
        let source = match self {
            MongoDaoError::SaveGame { source, .. } | MongoDaoError::SaveUser { source, .. } => {
                source
            }
            _ => return false,
        };
        matches!(
            source.kind.as_ref(),
            ErrorKind::Write(WriteFailure::WriteError(err)) if err.code == DUPLICATE_KEY_CODE
        )
    }
}

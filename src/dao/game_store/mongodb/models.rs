use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    GameActionEntity, GameEntity, GameLogEntity, GameSummaryEntity, ScriptEntity, SnapshotEntity,
    UserEntity,
};

/// Game document. Lookup keys are duplicated as plain strings so they can be indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub join_code: String,
    pub updated_at: DateTime,
    pub game: GameEntity,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            join_code: value.join_code.clone(),
            updated_at: DateTime::from_system_time(value.updated_at),
            game: value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub user: UserEntity,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            username: value.username.clone(),
            user: value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLogDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub created_at: DateTime,
    pub entry: GameLogEntity,
}

impl From<GameLogEntity> for MongoLogDocument {
    fn from(value: GameLogEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id.to_string(),
            created_at: DateTime::from_system_time(value.created_at),
            entry: value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSnapshotDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub created_at: DateTime,
    pub snapshot: SnapshotEntity,
}

impl From<SnapshotEntity> for MongoSnapshotDocument {
    fn from(value: SnapshotEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id.to_string(),
            created_at: DateTime::from_system_time(value.created_at),
            snapshot: value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScriptDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub updated_at: DateTime,
    pub script: ScriptEntity,
}

impl From<ScriptEntity> for MongoScriptDocument {
    fn from(value: ScriptEntity) -> Self {
        Self {
            id: value.id.clone(),
            updated_at: DateTime::from_system_time(value.updated_at),
            script: value,
        }
    }
}

/// Action document. `is_undone` is mirrored at the top level for filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoActionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub action_type: String,
    pub is_undone: bool,
    pub performed_at: DateTime,
    pub action: GameActionEntity,
}

impl From<GameActionEntity> for MongoActionDocument {
    fn from(value: GameActionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id.to_string(),
            action_type: value.action_type.clone(),
            is_undone: value.is_undone,
            performed_at: DateTime::from_system_time(value.performed_at),
            action: value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSummaryDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub participants: Vec<String>,
    pub ended_at: DateTime,
    pub summary: GameSummaryEntity,
}

impl From<GameSummaryEntity> for MongoSummaryDocument {
    fn from(value: GameSummaryEntity) -> Self {
        Self {
            id: value.game_id.to_string(),
            participants: value.participants.iter().map(Uuid::to_string).collect(),
            ended_at: DateTime::from_system_time(value.ended_at),
            summary: value,
        }
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

pub fn by_game(game_id: Uuid) -> Document {
    doc! {"game_id": game_id.to_string()}
}

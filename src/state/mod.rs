/// Random role dealing.
pub mod assignment;
/// Roles and scripts.
pub mod catalog;
/// Team counts per table size.
pub mod distribution;
mod error;
/// Notifications and action records of a mutation.
pub mod events;
/// The game aggregate.
pub mod game;
/// Nominations and votes.
pub mod ledger;
mod sse;
/// Lobby, night, day and ended phases.
pub mod state_machine;
/// Commit pipeline for game mutations.
pub mod transitions;
/// Win condition.
pub mod win;

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::game_store::GameStore,
    error::ServiceError,
    state::{
        catalog::{RoleCatalog, ScriptDefinition},
        game::GameSession,
    },
};

pub use self::error::EngineError;
pub use self::sse::{GameHubs, SseHub};
pub use self::state_machine::{GameStatus, PhaseEvent};

/// Handle to the application state shared by every request.
pub type SharedState = Arc<AppState>;
/// How long a game mutation waits for storage before giving up.
pub const DEFAULT_MUTATION_TIMEOUT: Duration = Duration::from_secs(5);
const HUB_CAPACITY: usize = 64;

/// Central application state: storage handle, reference data and the live games.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    catalog: RoleCatalog,
    config: AppConfig,
    /// Games touched since startup. Each game has its own lock so
    /// operations on one game are applied one at a time, in call order.
    /// Ended games are evicted and never cached again.
    games: DashMap<Uuid, Arc<Mutex<GameSession>>>,
    hubs: GameHubs,
    /// Serializes custom script writes so name checks and inserts do not interleave.
    script_writes: Mutex<()>,
    degraded: watch::Sender<bool>,
    mutation_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let catalog = RoleCatalog::builtin();
        for definition in config.scripts.iter().cloned() {
            register_script(&catalog, definition);
        }

        Arc::new(Self {
            game_store: RwLock::new(None),
            catalog,
            config,
            games: DashMap::new(),
            hubs: GameHubs::new(HUB_CAPACITY),
            script_writes: Mutex::new(()),
            degraded: degraded_tx,
            mutation_timeout: Some(DEFAULT_MUTATION_TIMEOUT),
        })
    }

    /// Build a state with `store` already installed.
    pub async fn with_store(config: AppConfig, store: Arc<dyn GameStore>) -> SharedState {
        let state = Self::new(config);
        state.set_game_store(store).await;
        state
    }

    /// Obtain a handle to the current game store, failing in degraded mode.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        let guard = self.game_store.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation, load its custom scripts and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        match store.list_scripts().await {
            Ok(scripts) => {
                for entity in scripts {
                    register_script(&self.catalog, entity.into());
                }
            }
            Err(err) => warn!(error = %err, "failed to load custom scripts"),
        }
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Roles and scripts known to the service.
    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Held while a custom script is created, edited or deleted.
    pub async fn lock_scripts(&self) -> MutexGuard<'_, ()> {
        self.script_writes.lock().await
    }

    /// Configuration the state was built with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Broadcast hubs of every game.
    pub fn hubs(&self) -> &GameHubs {
        &self.hubs
    }

    /// Storage deadline applied to game mutations, `None` to wait forever.
    pub fn mutation_timeout(&self) -> Option<Duration> {
        self.mutation_timeout
    }

    /// Number of games currently held in memory.
    pub fn active_games(&self) -> usize {
        self.games.len()
    }

    /// Drop a game from memory along with its idle broadcast hub.
    pub fn evict_game(&self, game_id: Uuid) {
        if self.games.remove(&game_id).is_some() {
            debug!(%game_id, "evicted game from memory");
        }
        self.hubs.release_if_idle(game_id);
    }

    /// Register a freshly created game.
    pub fn insert_game(&self, game: GameSession) {
        self.games.insert(game.id, Arc::new(Mutex::new(game)));
    }

    /// Shared slot for a game, loading it from storage on first access.
    ///
    /// Ended games are served from a private slot that is not cached.
    pub async fn game_slot(
        &self,
        game_id: Uuid,
    ) -> Result<Arc<Mutex<GameSession>>, ServiceError> {
        if let Some(slot) = self.games.get(&game_id) {
            return Ok(slot.clone());
        }

        let store = self.require_game_store().await?;
        let entity = store
            .find_game(game_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))?;
        let session = GameSession::restore(entity, &self.catalog)?;
        if session.status() == GameStatus::Ended {
            return Ok(Arc::new(Mutex::new(session)));
        }

        let slot = self
            .games
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(session)))
            .clone();
        Ok(slot)
    }

    /// Exclusive access to a game until the guard is dropped.
    pub async fn lock_game(
        &self,
        game_id: Uuid,
    ) -> Result<OwnedMutexGuard<GameSession>, ServiceError> {
        let slot = self.game_slot(game_id).await?;
        Ok(slot.lock_owned().await)
    }

    /// Clone of the current game state.
    pub async fn read_game(&self, game_id: Uuid) -> Result<GameSession, ServiceError> {
        let slot = self.game_slot(game_id).await?;
        let guard = slot.lock().await;
        Ok(guard.clone())
    }
}

/// Add a configured or stored script to the catalog, skipping invalid ones.
fn register_script(catalog: &RoleCatalog, definition: ScriptDefinition) {
    let id = definition.id.clone();
    match catalog.add_script(definition) {
        Ok(script) => info!(script = %script.id, roles = script.role_count(), "registered script"),
        Err(err) => warn!(script = %id, error = %err, "ignoring invalid script"),
    }
}

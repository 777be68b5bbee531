use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::{MongoDaoError, MongoResult};

const MAX_ATTEMPTS: u32 = 8;
const INITIAL_DELAY: Duration = Duration::from_millis(200);
const MAX_DELAY: Duration = Duration::from_secs(4);

/// Build a client and wait until the database answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut delay = INITIAL_DELAY;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                debug!(database = database_name, attempt, "mongodb ping succeeded");
                return Ok((client, database));
            }
            Err(source) if attempt >= MAX_ATTEMPTS => {
                return Err(MongoDaoError::InitialPing {
                    attempts: attempt,
                    source,
                });
            }
            Err(err) => {
                warn!(
                    database = database_name,
                    attempt,
                    error = %err,
                    "mongodb ping failed, retrying"
                );
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

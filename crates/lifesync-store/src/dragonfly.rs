//! `Dragonfly` (Redis-compatible) record store backend.
//!
//! Incidents live as JSON values with change notification over Redis
//! pub/sub, so every connected node observes the same fan-out as the
//! in-memory backend.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `emergencies:{id}` | JSON | Full incident record |
//! | `emergencies:index` | List | Incident ids in insertion order |
//! | `emergencies:changes` | Channel | Pub/sub channel carrying the full record after each commit |
//!
//! Mutations that touch an existing record run as Lua scripts, so the
//! read-modify-write and the publish commit atomically and the per-incident
//! notification order equals the commit order.

use std::sync::{Arc, Weak};
use std::time::Duration;

use fred::prelude::*;
use lifesync_types::{Incident, IncidentId, IncidentPatch, NewIncident};
use rand::Rng;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::assign_record;
use crate::error::StoreError;
use crate::event::ChangeEvent;
use crate::memory::BROADCAST_CAPACITY;

/// Pub/sub channel carrying a full incident record per commit.
const CHANGES_CHANNEL: &str = "emergencies:changes";

/// List key holding incident ids in insertion order.
const INDEX_KEY: &str = "emergencies:index";

/// How often an idle forwarder checks that its owning store is still
/// alive.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(30);

/// Atomic merge-write: patch the targeted fields, persist, publish.
///
/// `ARGV[1]` = new status (empty string = leave unchanged),
/// `ARGV[2]` = new acceptedAt (empty string = leave unchanged),
/// `ARGV[3]` = pub/sub channel. Returns the updated record, or `nil` when
/// the key does not exist.
const MERGE_SCRIPT: &str = r"
local raw = redis.call('GET', KEYS[1])
if not raw then return nil end
local obj = cjson.decode(raw)
if ARGV[1] ~= '' then obj['status'] = ARGV[1] end
if ARGV[2] ~= '' then obj['acceptedAt'] = ARGV[2] end
local out = cjson.encode(obj)
redis.call('SET', KEYS[1], out)
redis.call('PUBLISH', ARGV[3], out)
return out
";

/// Conditional claim: commit pending to accepted only if the record is
/// still pending.
///
/// `ARGV[1]` = acceptedAt timestamp, `ARGV[2]` = pub/sub channel.
/// Returns `nil` when the key does not exist, the empty string when the
/// record is no longer pending, and the updated record on success.
const CLAIM_SCRIPT: &str = r"
local raw = redis.call('GET', KEYS[1])
if not raw then return nil end
local obj = cjson.decode(raw)
if obj['status'] ~= 'pending' then return '' end
obj['status'] = 'accepted'
obj['acceptedAt'] = ARGV[1]
local out = cjson.encode(obj)
redis.call('SET', KEYS[1], out)
redis.call('PUBLISH', ARGV[2], out)
return out
";

/// `Dragonfly`-backed record store.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
    events: Arc<broadcast::Sender<ChangeEvent>>,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL and start the change
    /// forwarder.
    ///
    /// The URL follows the Redis URL scheme: `redis://host:port` or
    /// `redis://host:port/db`. The forwarder task subscribes to
    /// [`CHANGES_CHANNEL`] and re-broadcasts each message locally; on
    /// connectivity loss it resubscribes with exponential backoff.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config.clone()).build()?;
        client.init().await?;
        info!("connected to Dragonfly record store");

        let (events, _) = broadcast::channel(BROADCAST_CAPACITY);
        let events = Arc::new(events);
        tokio::spawn(forward_changes(config, Arc::downgrade(&events)));

        Ok(Self { client, events })
    }

    /// Persist a new incident with `status = pending` and a store-assigned
    /// id and creation timestamp.
    pub async fn create(&self, new: NewIncident) -> Result<Incident, StoreError> {
        let incident = assign_record(new);
        let json = serde_json::to_string(&incident)?;
        let key = incident_key(incident.id);

        let _: () = self.client.set(&key, json.as_str(), None, None, false).await?;
        let _: u64 = self
            .client
            .rpush(INDEX_KEY, incident.id.to_string().as_str())
            .await?;
        let _: u64 = self.client.publish(CHANGES_CHANNEL, json.as_str()).await?;

        info!(incident_id = %incident.id, "incident created");
        Ok(incident)
    }

    /// Merge-write the given patch into an existing incident.
    pub async fn update(
        &self,
        id: IncidentId,
        patch: IncidentPatch,
    ) -> Result<Incident, StoreError> {
        let status_arg = patch.status.map(|s| s.as_str().to_owned()).unwrap_or_default();
        let accepted_arg = patch
            .accepted_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        let result: Option<String> = self
            .client
            .eval(
                MERGE_SCRIPT,
                vec![incident_key(id)],
                vec![status_arg, accepted_arg, CHANGES_CHANNEL.to_owned()],
            )
            .await?;

        let raw = result.ok_or(StoreError::NotFound(id))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Atomically commit pending to accepted via [`CLAIM_SCRIPT`].
    pub async fn accept_if_pending(&self, id: IncidentId) -> Result<Incident, StoreError> {
        let accepted_at = chrono::Utc::now().to_rfc3339();

        let result: Option<String> = self
            .client
            .eval(
                CLAIM_SCRIPT,
                vec![incident_key(id)],
                vec![accepted_at, CHANGES_CHANNEL.to_owned()],
            )
            .await?;

        match result.as_deref() {
            None => Err(StoreError::NotFound(id)),
            Some("") => Err(StoreError::AlreadyAccepted(id)),
            Some(raw) => {
                info!(incident_id = %id, "incident accepted");
                Ok(serde_json::from_str(raw)?)
            }
        }
    }

    /// Read a single incident.
    pub async fn get(&self, id: IncidentId) -> Result<Incident, StoreError> {
        let raw: Option<String> = self.client.get(incident_key(id)).await?;
        let raw = raw.ok_or(StoreError::NotFound(id))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Read all incidents in insertion order (oldest first).
    ///
    /// Entries that are missing or fail to decode are skipped with a
    /// warning rather than failing the whole snapshot.
    pub async fn list(&self) -> Result<Vec<Incident>, StoreError> {
        let ids: Vec<String> = self.client.lrange(INDEX_KEY, 0, -1).await?;
        let mut incidents = Vec::with_capacity(ids.len());

        for id in &ids {
            let raw: Option<String> = self.client.get(format!("emergencies:{id}")).await?;
            match raw.as_deref().and_then(decode_incident) {
                Some(incident) => incidents.push(incident),
                None => warn!(incident_id = id, "skipping missing or malformed record"),
            }
        }

        Ok(incidents)
    }

    /// Subscribe to the raw change-event stream.
    pub(crate) fn subscribe_events(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// Number of live change-event subscriptions.
    pub(crate) fn watcher_count(&self) -> usize {
        self.events.receiver_count()
    }
}

/// Storage key for a single incident.
fn incident_key(id: IncidentId) -> String {
    format!("emergencies:{id}")
}

/// Decode a stored record, returning `None` on malformed JSON.
pub(crate) fn decode_incident(raw: &str) -> Option<Incident> {
    match serde_json::from_str(raw) {
        Ok(incident) => Some(incident),
        Err(e) => {
            warn!(error = %e, "malformed incident record");
            None
        }
    }
}

/// Backoff delay before resubscribe attempt `attempt` (0-based), with
/// jitter so restarting nodes do not reconnect in lockstep.
fn resubscribe_delay(attempt: u32) -> Duration {
    let base_ms: u64 = 500_u64
        .saturating_mul(2_u64.saturating_pow(attempt.min(6)))
        .min(30_000);
    let jitter_ms: u64 = rand::rng().random_range(0..250);
    Duration::from_millis(base_ms.saturating_add(jitter_ms))
}

/// Forward pub/sub messages from [`CHANGES_CHANNEL`] into the local
/// broadcast channel, resubscribing with backoff on connectivity loss.
///
/// Holds only a weak handle to the store's broadcast sender, so the task
/// exits once every clone of the owning store has dropped instead of
/// keeping the subscription alive forever.
async fn forward_changes(config: Config, events: Weak<broadcast::Sender<ChangeEvent>>) {
    let mut attempt: u32 = 0;

    loop {
        match subscribe_and_forward(&config, &events).await {
            Ok(()) => {
                debug!("record store dropped, change forwarder stopping");
                return;
            }
            Err(e) => {
                if events.upgrade().is_none() {
                    debug!("record store dropped, change forwarder stopping");
                    return;
                }
                let delay = resubscribe_delay(attempt);
                warn!(
                    error = %e,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "change subscription lost, resubscribing"
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// One subscription session: connect, subscribe, forward until the stream
/// breaks or the owning store goes away.
///
/// Returns `Ok(())` only when the store is gone; every broken-stream path
/// is an error so [`forward_changes`] resubscribes.
async fn subscribe_and_forward(
    config: &Config,
    events: &Weak<broadcast::Sender<ChangeEvent>>,
) -> Result<(), StoreError> {
    let subscriber = Builder::from_config(config.clone()).build_subscriber_client()?;
    subscriber.init().await?;
    subscriber.subscribe(CHANGES_CHANNEL).await?;
    debug!(channel = CHANGES_CHANNEL, "change subscription established");

    let mut rx = subscriber.message_rx();
    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(message) => {
                    let Some(events) = events.upgrade() else {
                        return Ok(());
                    };
                    let raw: String = match message.value.convert() {
                        Ok(raw) => raw,
                        Err(e) => {
                            warn!(error = %e, "non-text change message, skipping");
                            continue;
                        }
                    };
                    if let Some(incident) = decode_incident(&raw) {
                        let _ = events.send(ChangeEvent { incident });
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped = skipped, "change forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(StoreError::Closed);
                }
            },
            // Quiet channels never wake the recv arm, so poll liveness.
            () = tokio::time::sleep(LIVENESS_INTERVAL) => {
                if events.upgrade().is_none() {
                    return Ok(());
                }
            }
        }
    }
}

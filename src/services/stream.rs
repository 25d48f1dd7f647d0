//! Real-time entity detection stream.
//!
//! Transport-agnostic session logic for the editor's live extraction
//! channel: per-connection settings, a debounce buffer that runs extraction
//! after a quiet period, deduplication against the codex and pending
//! suggestions, and a per-manuscript connection cap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::db::connection::PlumeDb;
use crate::models::entity::{find_entity_by_name, list_entities};
use crate::models::suggestion::find_suggestion_by_name;
use crate::models::{record_key, EntityType};
use crate::nlp::NlpService;
use crate::services::codex::CodexService;
use crate::services::extractor::{EntityExtractor, KnownEntity};
use crate::PlumeError;

/// Default quiet period before extraction runs.
pub const DEFAULT_DEBOUNCE_SECS: f64 = 2.0;
/// Connections allowed per manuscript; excess connections are refused.
pub const MAX_CONNECTIONS_PER_MANUSCRIPT: usize = 3;

/// Per-connection detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    pub enabled: bool,
    /// Seconds of silence before extraction runs.
    pub debounce_delay: f64,
    pub confidence_threshold: f64,
    pub entity_types: Vec<EntityType>,
}

/// Named confidence presets: low 0.3, medium 0.4, high 0.7. Medium admits
/// heuristic proper-noun candidates while filtering weak pattern noise.
pub const CONFIDENCE_PRESETS: [(&str, f64); 3] = [("low", 0.3), ("medium", 0.4), ("high", 0.7)];

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_delay: DEFAULT_DEBOUNCE_SECS,
            confidence_threshold: 0.4,
            entity_types: vec![
                EntityType::Character,
                EntityType::Location,
                EntityType::Item,
                EntityType::Lore,
            ],
        }
    }
}

/// Partial settings update from a config message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamSettingsPatch {
    pub enabled: Option<bool>,
    pub debounce_delay: Option<f64>,
    pub confidence_threshold: Option<f64>,
    pub entity_types: Option<Vec<EntityType>>,
}

impl StreamSettings {
    pub fn apply(&mut self, patch: StreamSettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(delay) = patch.debounce_delay {
            self.debounce_delay = delay.clamp(0.1, 30.0);
        }
        if let Some(threshold) = patch.confidence_threshold {
            self.confidence_threshold = threshold.clamp(0.0, 1.0);
        }
        if let Some(types) = patch.entity_types {
            self.entity_types = types;
        }
    }
}

/// Messages a client may send. Text deltas arrive bare
/// (`{"text_delta": "…"}`); control messages carry a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    TextDelta { text_delta: String },
    Control(ControlMessage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Ping,
    Config { settings: StreamSettingsPatch },
}

/// A freshly detected entity pushed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub context: String,
    pub confidence: f64,
    pub suggestion_id: Option<String>,
}

/// Messages the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Pong,
    ConfigAck {
        settings: StreamSettings,
    },
    Entities {
        new_entities: Vec<DetectedEntity>,
        timestamp: String,
    },
}

/// Why a connection was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Per-manuscript connection cap reached (policy violation).
    TooManyConnections,
}

/// Tracks live connections per manuscript and enforces the cap.
#[derive(Default)]
pub struct RealtimeHub {
    connections: RwLock<HashMap<String, usize>>,
}

impl RealtimeHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a connection; refused past the per-manuscript cap.
    pub async fn register(
        self: &Arc<Self>,
        manuscript_id: &str,
    ) -> Result<ConnectionGuard, ConnectError> {
        let mut connections = self.connections.write().await;
        let count = connections.entry(manuscript_id.to_string()).or_insert(0);
        if *count >= MAX_CONNECTIONS_PER_MANUSCRIPT {
            return Err(ConnectError::TooManyConnections);
        }
        *count += 1;
        Ok(ConnectionGuard {
            hub: self.clone(),
            manuscript_id: manuscript_id.to_string(),
        })
    }

    pub async fn active_connections(&self, manuscript_id: &str) -> usize {
        *self
            .connections
            .read()
            .await
            .get(manuscript_id)
            .unwrap_or(&0)
    }

    async fn release(&self, manuscript_id: &str) {
        let mut connections = self.connections.write().await;
        if let Some(count) = connections.get_mut(manuscript_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                connections.remove(manuscript_id);
            }
        }
    }
}

/// RAII handle releasing the connection slot on drop.
pub struct ConnectionGuard {
    hub: Arc<RealtimeHub>,
    manuscript_id: String,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let hub = self.hub.clone();
        let manuscript_id = self.manuscript_id.clone();
        tokio::spawn(async move {
            hub.release(&manuscript_id).await;
        });
    }
}

/// Bridge a client-message stream into a running session, yielding server
/// messages. Transport adapters (a WebSocket handler, a test harness) plug
/// their socket in here; the session owns debounce and detection.
pub fn drive<S>(
    session: DetectionSession,
    client: S,
) -> impl tokio_stream::Stream<Item = ServerMessage>
where
    S: tokio_stream::Stream<Item = ClientMessage> + Send + 'static,
{
    use tokio_stream::StreamExt;

    let (in_tx, in_rx) = mpsc::channel(64);
    let (out_tx, mut out_rx) = mpsc::channel(64);

    tokio::spawn(async move {
        tokio::pin!(client);
        while let Some(message) = client.next().await {
            if in_tx.send(message).await.is_err() {
                break;
            }
        }
    });
    tokio::spawn(session.run(in_rx, out_tx));

    async_stream::stream! {
        while let Some(message) = out_rx.recv().await {
            yield message;
        }
    }
}

/// One live detection session for a manuscript.
pub struct DetectionSession {
    db: PlumeDb,
    extractor: EntityExtractor,
    manuscript_id: String,
    settings: StreamSettings,
    buffer: String,
}

impl DetectionSession {
    pub fn new(db: PlumeDb, nlp: Arc<dyn NlpService>, manuscript_id: &str) -> Self {
        Self {
            db,
            extractor: EntityExtractor::new(nlp),
            manuscript_id: manuscript_id.to_string(),
            settings: StreamSettings::default(),
            buffer: String::new(),
        }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Apply a config patch outside the message loop (the loop calls this
    /// for `config` messages).
    pub fn apply_settings(&mut self, patch: StreamSettingsPatch) {
        self.settings.apply(patch);
    }

    /// Drive the session: consume client messages, debounce text deltas,
    /// emit detections. Returns when the client channel closes.
    pub async fn run(
        mut self,
        mut incoming: mpsc::Receiver<ClientMessage>,
        outgoing: mpsc::Sender<ServerMessage>,
    ) {
        let mut deadline: Option<Instant> = None;

        loop {
            let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                message = incoming.recv() => {
                    match message {
                        Some(ClientMessage::Control(ControlMessage::Ping)) => {
                            if outgoing.send(ServerMessage::Pong).await.is_err() {
                                break;
                            }
                        }
                        Some(ClientMessage::Control(ControlMessage::Config { settings })) => {
                            self.settings.apply(settings);
                            let ack = ServerMessage::ConfigAck {
                                settings: self.settings.clone(),
                            };
                            if outgoing.send(ack).await.is_err() {
                                break;
                            }
                        }
                        Some(ClientMessage::TextDelta { text_delta }) => {
                            if self.settings.enabled {
                                self.buffer.push_str(&text_delta);
                                deadline = Some(
                                    Instant::now()
                                        + Duration::from_secs_f64(self.settings.debounce_delay),
                                );
                            }
                        }
                        None => break,
                    }
                }
                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    deadline = None;
                    let text = std::mem::take(&mut self.buffer);
                    if text.trim().is_empty() {
                        continue;
                    }
                    match self.detect(&text).await {
                        Ok(new_entities) if !new_entities.is_empty() => {
                            let message = ServerMessage::Entities {
                                new_entities,
                                timestamp: chrono::Utc::now().to_rfc3339(),
                            };
                            if outgoing.send(message).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => warn!("realtime detection failed: {e}"),
                    }
                }
            }
        }

        info!(manuscript_id = %self.manuscript_id, "detection session closed");
    }

    /// Run extraction over buffered text; persist each genuinely new
    /// candidate as a pending suggestion and return only those.
    pub async fn detect(&self, text: &str) -> Result<Vec<DetectedEntity>, PlumeError> {
        let known: Vec<KnownEntity> = list_entities(&self.db, &self.manuscript_id)
            .await?
            .iter()
            .map(|e| KnownEntity {
                id: Some(record_key(&e.id)),
                name: e.name.clone(),
                aliases: e.aliases.clone(),
            })
            .collect();

        let result = self.extractor.extract(text, &known).await;
        let mut detected = Vec::new();

        for candidate in result.candidates {
            if !self.settings.entity_types.contains(&candidate.entity_type) {
                continue;
            }
            if candidate.confidence < self.settings.confidence_threshold {
                continue;
            }
            // Drop duplicates against the codex and pending suggestions.
            if find_entity_by_name(&self.db, &self.manuscript_id, &candidate.name)
                .await?
                .is_some()
            {
                continue;
            }
            if find_suggestion_by_name(
                &self.db,
                &self.manuscript_id,
                &candidate.name,
                candidate.entity_type,
            )
            .await?
            .is_some()
            {
                continue;
            }

            let suggestion =
                CodexService::create_suggestion_from_candidate(&self.db, &self.manuscript_id, &candidate)
                    .await?;

            detected.push(DetectedEntity {
                name: candidate.name,
                entity_type: candidate.entity_type,
                context: candidate.context,
                confidence: candidate.confidence,
                suggestion_id: suggestion.map(|s| record_key(&s.id)),
            });
        }

        Ok(detected)
    }
}

//! Background scan coordinator.
//!
//! An in-memory registry keyed by world tracks long-running full-manuscript
//! scans: one non-terminal task per world, per-stage progress, reconnection
//! by world id, and cooperative cancellation (stages observe a failed status
//! and abort). Scan state lives only in the registry, never on the task.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::connection::PlumeDb;
use crate::models::change::{ChangeStatus, ChangeType, ProposedEntry, WikiChangeCreate};
use crate::models::entity::list_entities;
use crate::models::manuscript::{get_manuscript, list_chapters, list_manuscripts_for_world, Manuscript};
use crate::models::relationship::{create_relationship, RelationshipCreate, RelationshipContext};
use crate::models::timeline::{list_events, max_order_index};
use crate::models::record_key;
use crate::nlp::NlpService;
use crate::services::codex::CodexService;
use crate::services::extractor::{EntityExtractor, KnownEntity};
use crate::services::progress::{noop_progress, ScanProgress, ScanProgressReporter};
use crate::services::queue::ChangeQueueService;
use crate::services::timeline::{NewEvent, TimelineService};
use crate::PlumeError;

/// The per-manuscript scan stages, in order. Progress within a manuscript is
/// `stage_index / STAGES.len()`.
pub const STAGES: [&str; 5] = [
    "entities",
    "relationships",
    "descriptions",
    "world_rules",
    "timeline_events",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

/// Full scan task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTask {
    pub task_id: String,
    pub world_id: String,
    pub status: ScanStatus,
    pub total_manuscripts: usize,
    pub manuscripts_completed: usize,
    pub current_manuscript_title: String,
    pub current_stage: String,
    pub progress_percent: f64,
    pub total_changes: usize,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Result of asking to start a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartOutcome {
    Started { task_id: String },
    AlreadyRunning { task_id: String },
}

impl StartOutcome {
    pub fn task_id(&self) -> &str {
        match self {
            StartOutcome::Started { task_id } | StartOutcome::AlreadyRunning { task_id } => task_id,
        }
    }
}

/// Reconnection view for a world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveScanInfo {
    pub active: bool,
    pub task_id: Option<String>,
    pub progress_percent: Option<f64>,
    pub current_stage: Option<String>,
    pub current_manuscript_title: Option<String>,
}

/// In-memory registry of scan tasks, keyed by task id with a world index.
/// Writes are serialized per registry; progress is monotonic within a task.
#[derive(Default)]
pub struct ScanRegistry {
    tasks: RwLock<HashMap<String, ScanTask>>,
}

impl ScanRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a task for a world, or return the existing non-terminal task.
    pub async fn create_task(&self, world_id: &str, total_manuscripts: usize) -> StartOutcome {
        let mut tasks = self.tasks.write().await;

        if let Some(existing) = tasks
            .values()
            .find(|t| t.world_id == world_id && t.status == ScanStatus::Running)
        {
            return StartOutcome::AlreadyRunning {
                task_id: existing.task_id.clone(),
            };
        }

        let task_id = Uuid::new_v4().to_string();
        tasks.insert(
            task_id.clone(),
            ScanTask {
                task_id: task_id.clone(),
                world_id: world_id.to_string(),
                status: ScanStatus::Running,
                total_manuscripts,
                manuscripts_completed: 0,
                current_manuscript_title: String::new(),
                current_stage: String::new(),
                progress_percent: 0.0,
                total_changes: 0,
                error: None,
                started_at: Utc::now(),
            },
        );
        StartOutcome::Started { task_id }
    }

    /// Record per-stage progress:
    /// `(manuscript_index + stage_index/STAGES) / total × 100`.
    /// Progress never decreases within a task.
    pub async fn update_progress(
        &self,
        task_id: &str,
        manuscript_index: usize,
        manuscript_title: &str,
        stage_index: usize,
    ) {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(task_id) else {
            return;
        };
        if task.status != ScanStatus::Running {
            return;
        }

        let total = task.total_manuscripts.max(1) as f64;
        let stage_fraction = stage_index as f64 / STAGES.len() as f64;
        let percent = 100.0 * (manuscript_index as f64 + stage_fraction) / total;

        task.manuscripts_completed = manuscript_index;
        task.current_manuscript_title = manuscript_title.to_string();
        task.current_stage = STAGES
            .get(stage_index)
            .copied()
            .unwrap_or("finishing")
            .to_string();
        if percent > task.progress_percent {
            task.progress_percent = percent.min(100.0);
        }
    }

    pub async fn add_changes(&self, task_id: &str, count: usize) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.total_changes += count;
        }
    }

    /// Terminal success: progress 100, error cleared.
    pub async fn complete_task(&self, task_id: &str, total_changes: usize) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            if task.status == ScanStatus::Running {
                task.status = ScanStatus::Completed;
                task.progress_percent = 100.0;
                task.manuscripts_completed = task.total_manuscripts;
                task.total_changes = total_changes;
                task.error = None;
                task.current_stage = "done".to_string();
            }
        }
    }

    /// Terminal failure; also how cooperative cancellation is requested.
    pub async fn fail_task(&self, task_id: &str, error: &str) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            if task.status == ScanStatus::Running {
                task.status = ScanStatus::Failed;
                task.error = Some(error.to_string());
            }
        }
    }

    pub async fn get(&self, task_id: &str) -> Option<ScanTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Whether the worker should abort before its next stage.
    pub async fn is_cancelled(&self, task_id: &str) -> bool {
        match self.tasks.read().await.get(task_id) {
            Some(task) => task.status != ScanStatus::Running,
            None => true,
        }
    }

    /// Reconnection lookup: the running task for a world, if any.
    pub async fn active_for_world(&self, world_id: &str) -> ActiveScanInfo {
        let tasks = self.tasks.read().await;
        match tasks
            .values()
            .find(|t| t.world_id == world_id && t.status == ScanStatus::Running)
        {
            Some(task) => ActiveScanInfo {
                active: true,
                task_id: Some(task.task_id.clone()),
                progress_percent: Some(task.progress_percent),
                current_stage: Some(task.current_stage.clone()),
                current_manuscript_title: Some(task.current_manuscript_title.clone()),
            },
            None => ActiveScanInfo {
                active: false,
                task_id: None,
                progress_percent: None,
                current_stage: None,
                current_manuscript_title: None,
            },
        }
    }
}

/// Coordinates background scans against the registry.
pub struct ScanCoordinator {
    db: PlumeDb,
    registry: Arc<ScanRegistry>,
    nlp: Arc<dyn NlpService>,
    reporter: Arc<dyn ScanProgressReporter>,
}

impl ScanCoordinator {
    pub fn new(db: PlumeDb, registry: Arc<ScanRegistry>, nlp: Arc<dyn NlpService>) -> Self {
        Self {
            db,
            registry,
            nlp,
            reporter: noop_progress(),
        }
    }

    /// Attach a push reporter; it receives the same ticks the registry
    /// records.
    pub fn with_reporter(mut self, reporter: Arc<dyn ScanProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn registry(&self) -> Arc<ScanRegistry> {
        self.registry.clone()
    }

    /// Start a full-world scan as a background task. Returns the existing
    /// task when one is already running for the world.
    pub async fn start_world_scan(&self, world_id: &str) -> Result<StartOutcome, PlumeError> {
        let manuscripts = list_manuscripts_for_world(&self.db, world_id).await?;
        if manuscripts.is_empty() {
            return Err(PlumeError::Validation(format!(
                "World '{world_id}' has no manuscripts to scan"
            )));
        }

        let outcome = self.registry.create_task(world_id, manuscripts.len()).await;
        if let StartOutcome::Started { task_id } = &outcome {
            self.spawn_worker(task_id.clone(), world_id.to_string(), manuscripts);
        }
        Ok(outcome)
    }

    /// Start a scan over a single manuscript (its world's active-task slot
    /// still applies when the manuscript belongs to a world).
    pub async fn start_manuscript_scan(
        &self,
        manuscript_id: &str,
    ) -> Result<StartOutcome, PlumeError> {
        let Some(manuscript) = get_manuscript(&self.db, manuscript_id).await? else {
            return Err(PlumeError::NotFound {
                entity_type: "manuscript".into(),
                id: manuscript_id.into(),
            });
        };
        let world_key = manuscript
            .world_id
            .clone()
            .unwrap_or_else(|| format!("manuscript:{manuscript_id}"));

        let outcome = self.registry.create_task(&world_key, 1).await;
        if let StartOutcome::Started { task_id } = &outcome {
            self.spawn_worker(task_id.clone(), world_key, vec![manuscript]);
        }
        Ok(outcome)
    }

    fn spawn_worker(&self, task_id: String, world_id: String, manuscripts: Vec<Manuscript>) {
        let db = self.db.clone();
        let registry = self.registry.clone();
        let nlp = self.nlp.clone();
        let reporter = self.reporter.clone();

        tokio::spawn(async move {
            let total = manuscripts.len();
            let result = run_scan(
                &db, &registry, &reporter, &nlp, &task_id, &world_id, &manuscripts,
            )
            .await;
            match result {
                Ok(total_changes) => {
                    // Terminal tick first: observers that wake on registry
                    // completion must already see the full tick sequence.
                    reporter.progress(ScanProgress::finished(total)).await;
                    registry.complete_task(&task_id, total_changes).await;
                    info!(%task_id, total_changes, "scan completed");
                }
                Err(e) => {
                    error!(%task_id, "scan failed: {e}");
                    registry.fail_task(&task_id, &e.to_string()).await;
                }
            }
        });
    }
}

/// Run all stages over every manuscript. Extraction errors are logged and
/// the stage continues; only registry/persistence failures abort the scan.
async fn run_scan(
    db: &PlumeDb,
    registry: &ScanRegistry,
    reporter: &Arc<dyn ScanProgressReporter>,
    nlp: &Arc<dyn NlpService>,
    task_id: &str,
    world_id: &str,
    manuscripts: &[Manuscript],
) -> Result<usize, PlumeError> {
    let extractor = EntityExtractor::new(nlp.clone());
    let mut total_changes = 0usize;
    // Manuscript-only scans run under a synthetic world key; wiki staging
    // only applies to real worlds.
    let wiki_world: Option<&str> = if world_id.starts_with("manuscript:") {
        None
    } else {
        Some(world_id)
    };

    for (index, manuscript) in manuscripts.iter().enumerate() {
        let manuscript_key = record_key(&manuscript.id);
        let chapters = list_chapters(db, &manuscript_key).await?;

        let entity_rows = list_entities(db, &manuscript_key).await?;
        let known: Vec<KnownEntity> = entity_rows
            .iter()
            .map(|e| KnownEntity {
                id: Some(record_key(&e.id)),
                name: e.name.clone(),
                aliases: e.aliases.clone(),
            })
            .collect();

        for (stage_index, stage) in STAGES.iter().enumerate() {
            if registry.is_cancelled(task_id).await {
                warn!(task_id, "scan cancelled before stage '{stage}'");
                return Ok(total_changes);
            }
            registry
                .update_progress(task_id, index, &manuscript.title, stage_index)
                .await;
            reporter
                .progress(ScanProgress::at_stage(
                    index,
                    manuscripts.len(),
                    stage_index,
                    STAGES.len(),
                    &manuscript.title,
                    stage,
                ))
                .await;

            let changes = match *stage {
                "entities" => stage_entities(db, &extractor, &manuscript_key, &chapters, &known).await,
                "relationships" => stage_relationships(&extractor, db, &chapters, &known).await,
                "descriptions" => match wiki_world {
                    Some(world) => {
                        stage_descriptions(db, &extractor, &chapters, &known, world).await
                    }
                    None => Ok(0),
                },
                "world_rules" => match wiki_world {
                    Some(world) => stage_world_rules(db, &extractor, &chapters, world).await,
                    None => Ok(0),
                },
                "timeline_events" => {
                    stage_timeline(db, &manuscript_key, &chapters, &entity_rows).await
                }
                _ => Ok(0),
            };

            match changes {
                Ok(count) => {
                    total_changes += count;
                    registry.add_changes(task_id, count).await;
                }
                // Extraction paths never fail the scan; log and continue.
                Err(e) => warn!(task_id, stage = *stage, "stage error, continuing: {e}"),
            }
        }

        registry
            .update_progress(task_id, index + 1, &manuscript.title, 0)
            .await;
    }

    Ok(total_changes)
}

async fn stage_entities(
    db: &PlumeDb,
    extractor: &EntityExtractor,
    manuscript_id: &str,
    chapters: &[crate::models::Chapter],
    known: &[KnownEntity],
) -> Result<usize, PlumeError> {
    let mut created = 0usize;
    for chapter in chapters {
        if chapter.content.is_empty() {
            continue;
        }
        let result = extractor.extract(&chapter.content, known).await;
        for warning in &result.warnings {
            warn!(chapter = %chapter.title, "{warning}");
        }
        for candidate in &result.candidates {
            if CodexService::create_suggestion_from_candidate(db, manuscript_id, candidate)
                .await?
                .is_some()
            {
                created += 1;
            }
        }
    }
    Ok(created)
}

async fn stage_relationships(
    extractor: &EntityExtractor,
    db: &PlumeDb,
    chapters: &[crate::models::Chapter],
    known: &[KnownEntity],
) -> Result<usize, PlumeError> {
    let by_name: HashMap<String, &KnownEntity> = known
        .iter()
        .map(|k| (k.name.to_lowercase(), k))
        .collect();

    let mut created = 0usize;
    for chapter in chapters {
        if chapter.content.is_empty() {
            continue;
        }
        let result = extractor.extract(&chapter.content, known).await;
        for rel in &result.relationships {
            let (Some(source), Some(target)) = (
                by_name.get(&rel.source_name.to_lowercase()).and_then(|k| k.id.clone()),
                by_name.get(&rel.target_name.to_lowercase()).and_then(|k| k.id.clone()),
            ) else {
                continue;
            };
            create_relationship(
                db,
                RelationshipCreate {
                    source_id: source,
                    target_id: target,
                    rel_type: rel.rel_type,
                    strength: rel.strength,
                    context: Some(RelationshipContext {
                        scene_id: None,
                        description: rel.context.clone(),
                    }),
                },
            )
            .await?;
            created += 1;
        }
    }
    Ok(created)
}

async fn stage_descriptions(
    db: &PlumeDb,
    extractor: &EntityExtractor,
    chapters: &[crate::models::Chapter],
    known: &[KnownEntity],
    world_id: &str,
) -> Result<usize, PlumeError> {
    let mut staged = 0usize;
    for chapter in chapters {
        if chapter.content.is_empty() {
            continue;
        }
        let result = extractor.extract(&chapter.content, known).await;
        for description in &result.descriptions {
            // Only entities already linked to a wiki entry get update
            // proposals; the rest surface through entity suggestions.
            let Some(entity_id) = known
                .iter()
                .find(|k| k.name == description.entity_name)
                .and_then(|k| k.id.clone())
            else {
                continue;
            };
            let Some(entity) = crate::models::entity::get_entity(db, &entity_id).await? else {
                continue;
            };
            let Some(entry_id) = entity.linked_wiki_entry_id else {
                continue;
            };

            ChangeQueueService::create_change(
                db,
                WikiChangeCreate {
                    world_id: world_id.to_string(),
                    change_type: ChangeType::Update,
                    wiki_entry_id: Some(entry_id),
                    field_changed: Some("structured_data".to_string()),
                    old_value: None,
                    new_value: Some(serde_json::json!({
                        description.bucket.clone(): description.sentence.clone()
                    })),
                    proposed_entry: None,
                    reason: format!(
                        "New {} detail for '{}' found in prose",
                        description.bucket, description.entity_name
                    ),
                    source_text: description.sentence.clone(),
                    source_chapter_id: Some(record_key(&chapter.id)),
                    confidence: 0.7,
                    status: ChangeStatus::Pending,
                },
            )
            .await?;
            staged += 1;
        }
    }
    Ok(staged)
}

async fn stage_world_rules(
    db: &PlumeDb,
    extractor: &EntityExtractor,
    chapters: &[crate::models::Chapter],
    world_id: &str,
) -> Result<usize, PlumeError> {
    let mut staged = 0usize;
    for chapter in chapters {
        if chapter.content.is_empty() {
            continue;
        }
        let result = extractor.extract(&chapter.content, &[]).await;
        for rule in &result.rules {
            let title: String = rule.rule_text.chars().take(80).collect();
            let change = ChangeQueueService::create_change(
                db,
                WikiChangeCreate {
                    world_id: world_id.to_string(),
                    change_type: ChangeType::Create,
                    wiki_entry_id: None,
                    field_changed: None,
                    old_value: None,
                    new_value: None,
                    proposed_entry: Some(ProposedEntry {
                        entry_type: "world_rule".to_string(),
                        title,
                        summary: rule.rule_text.clone(),
                        content: rule.sentence.clone(),
                        structured_data: HashMap::from([(
                            "rule_kind".to_string(),
                            serde_json::json!(rule.rule_kind),
                        )]),
                        aliases: Vec::new(),
                        tags: vec!["world-rule".to_string()],
                    }),
                    reason: format!("Explicit {} statement found in prose", rule.rule_kind),
                    source_text: rule.sentence.clone(),
                    source_chapter_id: Some(record_key(&chapter.id)),
                    confidence: 0.75,
                    status: ChangeStatus::Pending,
                },
            )
            .await?;
            if change.status == ChangeStatus::Pending {
                staged += 1;
            }
        }
    }
    Ok(staged)
}

/// Derive scene events from each chapter that has none yet, using the
/// rule-based boundary detection (transitions, location and cast changes,
/// stated story times, and the paragraph checkpoint).
async fn stage_timeline(
    db: &PlumeDb,
    manuscript_id: &str,
    chapters: &[crate::models::Chapter],
    entities: &[crate::models::Entity],
) -> Result<usize, PlumeError> {
    let existing = list_events(db, manuscript_id).await?;
    let covered: Vec<&str> = existing
        .iter()
        .filter_map(|e| e.metadata.get("chapter_id").and_then(|v| v.as_str()))
        .collect();

    let mut created = 0usize;
    let mut next_index = max_order_index(db, manuscript_id).await?.map_or(0, |max| max + 1);

    for chapter in chapters {
        let chapter_key = record_key(&chapter.id);
        if chapter.content.is_empty() || covered.contains(&chapter_key.as_str()) {
            continue;
        }

        for event in crate::services::timeline::extract_events_from_text(&chapter.content, entities)
        {
            let mut metadata = event.metadata;
            metadata.insert("auto_generated".to_string(), serde_json::json!(true));
            metadata.insert("chapter_id".to_string(), serde_json::json!(chapter_key));

            TimelineService::create_event(
                db,
                manuscript_id,
                NewEvent {
                    description: event.description,
                    event_type: event.event_type,
                    timestamp: event.timestamp,
                    location_id: event.location_id,
                    character_ids: event.character_ids,
                    metadata,
                    order_index: Some(next_index),
                },
            )
            .await?;
            next_index += 1;
            created += 1;
        }
    }

    Ok(created)
}

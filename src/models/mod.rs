pub mod change;
pub mod entity;
pub mod manuscript;
pub mod outline;
pub mod relationship;
pub mod suggestion;
pub mod timeline;
pub mod voice;
pub mod wiki;
pub mod world_rule;

pub use change::{ChangeStatus, ChangeType, ProposedEntry, WikiChange, WikiChangeCreate};
pub use entity::{Entity, EntityCreate, EntityScope, EntityType, EntityUpdate};
pub use manuscript::{Chapter, ChapterCreate, ChapterUpdate, Manuscript, ManuscriptCreate};
pub use outline::{Outline, OutlineCreate, PlotBeat, PlotBeatCreate, PlotBeatUpdate};
pub use relationship::{Relationship, RelationshipCreate, RelationshipKind};
pub use suggestion::{EntitySuggestion, EntitySuggestionCreate, SuggestionStatus};
pub use timeline::{
    EventType, InconsistencySeverity, InconsistencyType, TimelineEvent, TimelineEventCreate,
    TimelineEventUpdate, TimelineInconsistency, TimelineInconsistencyCreate,
};
pub use voice::{VoiceInconsistency, VoiceInconsistencyCreate, VoiceProfile, VoiceProfileCreate};
pub use wiki::{WikiEntry, WikiEntryCreate, WikiEntryUpdate};
pub use world_rule::{RuleSeverity, RuleType, WorldRule, WorldRuleCreate};

use surrealdb::RecordId;

/// The key part of a record id, as a plain string.
///
/// Foreign references between tables are stored as these keys rather than as
/// record links, so cyclic references (entity ↔ wiki entry, beat ↔ chapter)
/// stay id-only and are resolved on demand.
pub fn record_key(id: &RecordId) -> String {
    id.key().to_string()
}

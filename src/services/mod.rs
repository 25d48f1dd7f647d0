pub mod codex;
pub mod consistency_checker;
pub mod dialogue_analyzer;
pub mod extractor;
pub mod feedback;
pub mod grammar_analyzer;
pub mod issue;
pub mod outline;
pub mod overused_phrases_analyzer;
pub mod progress;
pub mod queue;
pub mod readability_analyzer;
pub mod scan;
pub mod sentence_starter_analyzer;
pub mod stream;
pub mod structures;
pub mod style_analyzer;
pub mod timeline;
pub mod voice;
pub mod wiki;
pub mod word_analyzer;

pub use codex::{CodexService, MergeStrategy, SuggestionOverrides};
pub use extractor::{
    EntityCandidate, EntityExtractor, ExtractionResult, KnownEntity, RelationshipCandidate,
};
pub use feedback::{AnalysisMode, FeedbackResponse, FeedbackSettings, WritingIssue};
pub use issue::{Severity, Suggestion, SuggestionType};
pub use outline::{MappingSuggestion, OutlineProgress, OutlineService, SwitchOutcome};
pub use progress::{
    noop_progress, LogProgressReporter, NoopProgressReporter, ScanProgress, ScanProgressReporter,
};
pub use queue::{ApprovalResult, ChangeQueueService, AUTO_APPROVE_THRESHOLD};
pub use scan::{ScanCoordinator, ScanRegistry, ScanStatus, ScanTask, StartOutcome};
pub use stream::{DetectionSession, RealtimeHub, StreamSettings};
pub use structures::{available_structures, get_structure, BeatTemplate, StructureTemplate};
pub use timeline::{NewEvent, TimelineService};
pub use voice::{VoiceAnalysisService, VoiceComparison};
pub use wiki::{NewEntry, WikiService};

pub mod engine;
pub mod persistence;
pub mod types;

pub use engine::{
    apply_update, apply_update_at, create_empty, dismiss_drill_counters, dominant_error,
    error_frequency, mastered_topics, record_micro_drill, should_trigger_micro_drill,
    weakest_topics, DRILL_WINDOW, PATTERN_THRESHOLD,
};
pub use persistence::{
    clear_graph, load_graph, persist_graph, FileKnowledgeStore, KnowledgeStore,
    MemoryKnowledgeStore, PersistenceError,
};
pub use types::{
    ErrorKind, ErrorRecord, KnowledgeGraph, KnowledgeUpdate, SessionStats, TopicState,
    UnknownErrorKind,
};

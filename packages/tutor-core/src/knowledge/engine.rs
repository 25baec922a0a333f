//! Knowledge graph reducer and derived queries.
//!
//! Every function here is pure: it takes a graph by reference and returns a
//! new value. The session owns the only live graph and replaces it with the
//! returned snapshot.

use std::collections::BTreeMap;

use super::types::{
    ErrorKind, ErrorRecord, KnowledgeGraph, KnowledgeUpdate, TopicState, ERROR_HISTORY_LIMIT,
    MASTERY_THRESHOLD, MAX_CONFIDENCE, TOPIC_ERROR_WINDOW,
};

/// History entries inspected by the drill trigger and dominant-error query
pub const DRILL_WINDOW: usize = 30;
/// Occurrences of one kind within the window that count as a pattern
pub const PATTERN_THRESHOLD: usize = 3;

pub fn create_empty() -> KnowledgeGraph {
    KnowledgeGraph::default()
}

/// Applies one oracle-classified attempt, timestamped now.
pub fn apply_update(
    graph: &KnowledgeGraph,
    update: &KnowledgeUpdate,
    error_kind: ErrorKind,
    is_correct: bool,
) -> KnowledgeGraph {
    apply_update_at(
        graph,
        update,
        error_kind,
        is_correct,
        chrono::Utc::now().timestamp_millis(),
    )
}

pub fn apply_update_at(
    graph: &KnowledgeGraph,
    update: &KnowledgeUpdate,
    error_kind: ErrorKind,
    is_correct: bool,
    now_ms: i64,
) -> KnowledgeGraph {
    let mut next = graph.clone();
    let topic = update.topic.trim().to_string();

    let previous = next.topics.get(&topic).cloned().unwrap_or_default();
    let score = (i64::from(previous.confidence_score) + i64::from(update.confidence_delta))
        .clamp(0, i64::from(MAX_CONFIDENCE)) as u8;

    let mut last_errors = previous.last_errors.clone();
    if error_kind.is_error() {
        last_errors.push_back(error_kind);
        while last_errors.len() > TOPIC_ERROR_WINDOW {
            last_errors.pop_front();
        }
    }

    // Mastery is sticky: once set it survives later errors and explicit
    // `mastered: false` from the oracle.
    let earned = score >= MASTERY_THRESHOLD && is_correct;
    let mastered = previous.mastered || update.mastered.unwrap_or(earned);

    next.topics.insert(
        topic.clone(),
        TopicState {
            mastered,
            confidence_score: score,
            attempts: previous.attempts.saturating_add(1),
            last_errors,
        },
    );

    for name in &update.weak_nodes {
        let name = name.trim();
        let already_mastered = next.topics.get(name).is_some_and(|s| s.mastered);
        if !name.is_empty() && !already_mastered {
            next.weak_nodes.insert(name.to_string());
        }
    }
    if mastered {
        next.weak_nodes.remove(&topic);
    }

    if error_kind.is_error() {
        next.error_history.push_back(ErrorRecord {
            error_kind,
            topic: topic.clone(),
            timestamp: now_ms,
        });
        while next.error_history.len() > ERROR_HISTORY_LIMIT {
            next.error_history.pop_front();
        }
    }

    let stats = &mut next.session_stats;
    stats.total_attempts = stats.total_attempts.saturating_add(1);
    stats.current_topic = topic;
    if is_correct {
        stats.consecutive_failures = 0;
        stats.attempt_on_current_problem = 0;
    } else {
        stats.consecutive_failures = stats.consecutive_failures.saturating_add(1);
        stats.attempt_on_current_problem = stats.attempt_on_current_problem.saturating_add(1);
    }

    next
}

/// Counts per kind over the most recent `window_size` history entries.
pub fn error_frequency(graph: &KnowledgeGraph, window_size: usize) -> BTreeMap<ErrorKind, usize> {
    let skip = graph.error_history.len().saturating_sub(window_size);
    let mut counts = BTreeMap::new();
    for record in graph.error_history.iter().skip(skip) {
        if record.error_kind.is_error() {
            *counts.entry(record.error_kind).or_insert(0) += 1;
        }
    }
    counts
}

/// The most frequent kind with at least [`PATTERN_THRESHOLD`] occurrences in
/// the last [`DRILL_WINDOW`] entries. Ties go to the kind seen most recently.
pub fn dominant_error(graph: &KnowledgeGraph) -> Option<ErrorKind> {
    let counts = error_frequency(graph, DRILL_WINDOW);
    let best = counts.values().copied().max()?;
    if best < PATTERN_THRESHOLD {
        return None;
    }
    graph
        .error_history
        .iter()
        .rev()
        .take(DRILL_WINDOW)
        .map(|record| record.error_kind)
        .find(|kind| counts.get(kind) == Some(&best))
}

pub fn should_trigger_micro_drill(graph: &KnowledgeGraph) -> bool {
    error_frequency(graph, DRILL_WINDOW)
        .values()
        .any(|&count| count >= PATTERN_THRESHOLD)
}

pub fn record_micro_drill(graph: &KnowledgeGraph) -> KnowledgeGraph {
    let mut next = graph.clone();
    next.session_stats.micro_drills_completed =
        next.session_stats.micro_drills_completed.saturating_add(1);
    next
}

/// Counter reset applied when the student dismisses a drill
pub fn dismiss_drill_counters(graph: &KnowledgeGraph) -> KnowledgeGraph {
    let mut next = graph.clone();
    next.session_stats.attempt_on_current_problem = 0;
    next.session_stats.consecutive_failures = 0;
    next
}

pub fn mastered_topics(graph: &KnowledgeGraph) -> Vec<&str> {
    graph
        .topics
        .iter()
        .filter(|(_, state)| state.mastered)
        .map(|(name, _)| name.as_str())
        .collect()
}

/// Unmastered topics, lowest confidence first
pub fn weakest_topics(graph: &KnowledgeGraph, n: usize) -> Vec<(&str, &TopicState)> {
    let mut topics: Vec<(&str, &TopicState)> = graph
        .topics
        .iter()
        .filter(|(_, state)| !state.mastered)
        .map(|(name, state)| (name.as_str(), state))
        .collect();
    topics.sort_by(|a, b| {
        a.1.confidence_score
            .cmp(&b.1.confidence_score)
            .then_with(|| a.0.cmp(b.0))
    });
    topics.truncate(n);
    topics
}

//! Instruction payload and tool schema sent with every oracle request.
//!
//! Rendering is deterministic: the same graph and attempt number always give
//! the same text.

use std::fmt::Write;

use serde_json::{json, Value};

use crate::knowledge::{self, ErrorKind, KnowledgeGraph};
use crate::services::llm_provider::ToolDefinition;

pub const TOOL_NAME: &str = "submit_tutoring_turn";
const WEAKEST_LISTED: usize = 3;

pub fn build_instructions(graph: &KnowledgeGraph, attempt_number: u32, reveal_allowed: bool) -> String {
    let mut out = String::new();

    out.push_str(
        "You are a patient calculus tutor working one problem at a time with a student.\n\
         Guide with questions and hints. Classify the student's latest message into exactly \
         one error type and propose a whiteboard visualization when a picture helps.\n\n",
    );

    out.push_str("## Attempt\n");
    let _ = writeln!(out, "This is attempt {attempt_number} on the current problem.");
    if reveal_allowed {
        out.push_str(
            "Reveal mode is ON: the student has struggled repeatedly. You may show the next \
             solution step explicitly, then ask them to continue from it.\n",
        );
    } else {
        out.push_str(
            "Reveal mode is OFF: do not state the answer or the next step outright. Ask a \
             guiding question instead.\n",
        );
    }

    out.push_str("\n## Student profile\n");
    render_profile(&mut out, graph);

    out.push_str("\n## Response contract\n");
    let _ = writeln!(
        out,
        "Always respond by calling `{TOOL_NAME}`. Never reply with plain text."
    );
    let kinds: Vec<&str> = ErrorKind::ALL.iter().map(|k| k.as_str()).collect();
    let _ = writeln!(out, "error_type must be one of: {}.", kinds.join(", "));
    out.push_str(
        "Use NONE only when the student's step is correct. confidence_delta ranges from -30 \
         to 20. Set micro_drill to true only when a repeated error pattern calls for a short \
         targeted exercise.\n",
    );
    out.push_str(
        "Whiteboard expressions use x as the only variable with + - * / ^, parentheses and \
         the functions sin cos tan asin acos atan sinh cosh tanh sqrt abs exp ln log floor \
         ceil pow min max, plus the constants pi and e.\n",
    );

    out
}

fn render_profile(out: &mut String, graph: &KnowledgeGraph) {
    if graph.is_empty() {
        out.push_str("New student, no history yet.\n");
        return;
    }

    let stats = &graph.session_stats;
    let _ = writeln!(
        out,
        "Attempts this session: {}. Consecutive failures: {}. Drills completed: {}.",
        stats.total_attempts, stats.consecutive_failures, stats.micro_drills_completed
    );
    if !stats.current_topic.is_empty() {
        let _ = writeln!(out, "Current topic: {}.", stats.current_topic);
    }

    let mastered = knowledge::mastered_topics(graph);
    if !mastered.is_empty() {
        let _ = writeln!(out, "Mastered: {}.", mastered.join(", "));
    }

    let weakest = knowledge::weakest_topics(graph, WEAKEST_LISTED);
    if !weakest.is_empty() {
        let listed: Vec<String> = weakest
            .iter()
            .map(|(name, state)| format!("{name} ({}/100)", state.confidence_score))
            .collect();
        let _ = writeln!(out, "Lowest confidence: {}.", listed.join(", "));
    }

    if !graph.weak_nodes.is_empty() {
        let weak: Vec<&str> = graph.weak_nodes.iter().map(String::as_str).collect();
        let _ = writeln!(out, "Needs reinforcement: {}.", weak.join(", "));
    }

    if let Some(kind) = knowledge::dominant_error(graph) {
        let _ = writeln!(out, "Recurring pattern: {} ({}).", kind.describe(), kind.as_str());
    }
    if knowledge::should_trigger_micro_drill(graph) {
        out.push_str("A micro-drill on the recurring pattern is recommended now.\n");
    }
}

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Submit the tutor's reply, the error classification, the whiteboard \
                      instruction and the knowledge update for this turn."
            .to_string(),
        parameters: tool_parameters(),
    }
}

/// JSON schema of the structured record
pub fn tool_parameters() -> Value {
    let kinds: Vec<&str> = ErrorKind::ALL.iter().map(|k| k.as_str()).collect();
    json!({
        "type": "object",
        "required": ["tutor_response", "error_type", "micro_drill", "knowledge_update"],
        "properties": {
            "tutor_response": { "type": "string" },
            "error_type": { "type": "string", "enum": kinds },
            "micro_drill": { "type": "boolean" },
            "whiteboard_instruction": {
                "type": "object",
                "required": ["kind", "functionExpression"],
                "properties": {
                    "kind": { "type": "string", "enum": ["LIMIT", "DERIVATIVE", "INTEGRAL", "NONE"] },
                    "title": { "type": "string" },
                    "functionExpression": { "type": "string" },
                    "viewport": {
                        "type": "object",
                        "properties": {
                            "xMin": { "type": "number" },
                            "xMax": { "type": "number" },
                            "yMin": { "type": "number" },
                            "yMax": { "type": "number" }
                        }
                    },
                    "params": {
                        "type": "object",
                        "properties": {
                            "limitPoint": { "type": "number" },
                            "initialOffset": { "type": "number" },
                            "point": { "type": "number" },
                            "initialH": { "type": "number" },
                            "lowerBound": { "type": "number" },
                            "upperBound": { "type": "number" }
                        }
                    },
                    "steps": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["expression"],
                            "properties": {
                                "expression": { "type": "string" },
                                "status": { "type": "string", "enum": ["NEUTRAL", "STUDENT", "CORRECT", "ERROR"] },
                                "annotation": { "type": "string" }
                            }
                        }
                    }
                }
            },
            "knowledge_update": {
                "type": "object",
                "required": ["topic", "confidence_delta"],
                "properties": {
                    "topic": { "type": "string" },
                    "confidence_delta": { "type": "number", "minimum": -30, "maximum": 20 },
                    "mastered": { "type": "boolean" },
                    "weak_nodes": { "type": "array", "items": { "type": "string" } }
                }
            }
        }
    })
}

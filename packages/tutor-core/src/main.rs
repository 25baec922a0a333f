use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Instrument;

use calc_tutor_core::config::Config;
use calc_tutor_core::knowledge::{self, FileKnowledgeStore, KnowledgeStore};
use calc_tutor_core::logging::init_tracing;
use calc_tutor_core::{FrameSettings, LLMOracle, Oracle, TurnOutcome, Tutor, TutorSession};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Reset,
    Dismiss,
    Stats,
    Quit,
    Unknown(String),
    Message(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    match trimmed {
        "/reset" => Command::Reset,
        "/dismiss" => Command::Dismiss,
        "/stats" => Command::Stats,
        "/quit" | "/exit" => Command::Quit,
        other if other.starts_with('/') => Command::Unknown(other.to_string()),
        other => Command::Message(other.to_string()),
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.logging);

    let run_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("calc_tutor", %run_id);

    let oracle = LLMOracle::from_env();
    if !oracle.is_available() {
        tracing::warn!("LLM_API_KEY not set, every turn will fail until it is configured");
    }

    let store: Arc<dyn KnowledgeStore> = Arc::new(FileKnowledgeStore::new(&config.data_dir));
    let session = TutorSession::open(store, config.session_key.clone(), config.session);
    let mut tutor = Tutor::new(session, oracle, FrameSettings::from_config(&config));

    run(&mut tutor).instrument(span).await;
    tracing::info!("tutor stopped");
}

async fn run<O: Oracle>(tutor: &mut Tutor<O>) {
    println!("Calculus tutor. Type an answer or a question. Commands: /reset /dismiss /stats /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown_signal() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };

        match parse_command(&line) {
            Command::Quit => break,
            Command::Reset => {
                tutor.reset();
                println!("Session reset. Starting fresh.");
            }
            Command::Dismiss => {
                if tutor.dismiss_drill() {
                    println!("Drill dismissed. Back to the problem.");
                } else {
                    println!("No drill is active.");
                }
            }
            Command::Stats => print_stats(tutor),
            Command::Unknown(cmd) => println!("Unknown command {cmd}"),
            Command::Message(message) => match tutor.submit(&message).await {
                Ok(outcome) => print_outcome(tutor, &outcome),
                Err(err) => println!("! {}", err.user_message()),
            },
        }
    }
}

fn print_outcome<O: Oracle>(tutor: &Tutor<O>, outcome: &TurnOutcome) {
    println!("tutor> {}", outcome.tutor_response.trim());
    if !outcome.visualization.is_neutral() {
        println!("[whiteboard] {}", outcome.visualization.narration());
    }
    if let Some(animation) = tutor.animation() {
        println!("[curve] {}", animation.curve_svg());
        let frame = animation.latest();
        if !frame.overlay_svg.is_empty() {
            println!("[overlay] {}", frame.overlay_svg);
        }
    }
    if let Some(topic) = tutor.session().drill().topic() {
        println!("[drill] Micro-drill on {topic}. Type /dismiss to leave it.");
    }
    if outcome.reveal_allowed {
        println!("[reveal] Solution steps may be shown now.");
    }
}

fn print_stats<O: Oracle>(tutor: &Tutor<O>) {
    let graph = tutor.session().graph();
    let stats = &graph.session_stats;
    println!(
        "attempts: {}  consecutive failures: {}  drills: {}  current topic: {}",
        stats.total_attempts,
        stats.consecutive_failures,
        stats.micro_drills_completed,
        if stats.current_topic.is_empty() { "-" } else { stats.current_topic.as_str() }
    );
    let mastered = knowledge::mastered_topics(graph);
    if !mastered.is_empty() {
        println!("mastered: {}", mastered.join(", "));
    }
    for (name, state) in knowledge::weakest_topics(graph, 3) {
        println!("  {name}: {}/100 after {} attempts", state.confidence_score, state.attempts);
    }
    if let Some(kind) = knowledge::dominant_error(graph) {
        println!("recurring: {}", kind.describe());
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

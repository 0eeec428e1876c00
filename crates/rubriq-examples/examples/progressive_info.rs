//! Interactive walk with progressive information revelation.
//!
//! The conversation driver grades each scripted assistant turn, reveals
//! hidden scene details as requirements are satisfied, and asks the next
//! layer's questions until the reference path is exhausted.
//!
//! ```bash
//! cargo run --example progressive_info -p rubriq-examples
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use rubriq_core::config::EvalConfig;
use rubriq_core::error::Result;
use rubriq_core::judge::{JudgeCallOptions, JudgeClient};
use rubriq_core::message::Message;
use rubriq_eval::prelude::*;
use rubriq_graph::prelude::*;

/// Replies with the reference answer embedded in the rendered prompt.
struct OracleJudge;

#[async_trait]
impl JudgeClient for OracleJudge {
    async fn complete(&self, prompt: &str, _options: &JudgeCallOptions) -> Result<String> {
        let answer = prompt
            .lines()
            .find_map(|line| line.strip_prefix("ground truth answer="))
            .unwrap_or("0.0");
        Ok(format!(
            r#"{{"answer": {answer}, "reasoning": "matches the reference"}}"#
        ))
    }

    fn model_name(&self) -> &str {
        "oracle-judge"
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let requirements = vec![
        Requirement::binary_with(
            "scene_safety",
            "Is the scene safe to approach?",
            vec![
                DependencyRule::new(1.0, ["assess_patient"]),
                DependencyRule::new(0.0, Vec::<String>::new()),
            ],
        )?,
        Requirement::binary_with(
            "assess_patient",
            "Has the patient been assessed?",
            vec![DependencyRule::new(1.0, ["transport_decision"])],
        )?,
        Requirement::binary("transport_decision", "Was a transport decision made?"),
    ];
    let rubric = MultiStepRubric::new(requirements, Arc::new(OracleJudge))?;

    let scenario = Scenario::builder()
        .prompt("You arrive at a single-car crash on a rural road.")
        .answer("scene_safety", 1.0)
        .answer_with_reasoning("assess_patient", 1.0, "The driver is slumped over the wheel.")
        .answer("transport_decision", 1.0)
        .reveal("scene_safety", 1.0, "No traffic is approaching and the engine is off.")
        .reveal("assess_patient", 1.0, "The driver responds to voice but is disoriented.")
        .build()?;

    // Scripted assistant turns standing in for a live model.
    let assistant_turns = [
        "The scene looks safe, no fire or traffic hazards.",
        "I assess the driver: airway clear, breathing, responds to voice.",
        "Given the disorientation, I request transport to a trauma center.",
    ];

    let mut messages = vec![Message::user(scenario.prompt.clone())];
    let mut state = ConversationState::new(&rubric, &scenario);
    let config = EvalConfig::default();

    for (turn, reply) in assistant_turns.iter().enumerate() {
        if state.finished {
            break;
        }
        println!("--- turn {} ---", turn + 1);
        println!("assistant: {reply}");
        messages.push(Message::assistant(*reply));

        let (env_reply, new_state, finished) = rubric
            .next_conversation_step(&messages, &state, &config)
            .await?;
        println!("environment:\n{env_reply}\n");
        messages.push(Message::user(env_reply));
        state = new_state;

        if finished {
            println!("conversation finished after turn {}", turn + 1);
        }
    }

    println!("revealed: {:?}", state.revealed_info);
    println!("turns logged: {}", state.progression.len());
    Ok(())
}

//! First-responder triage rubric walked in all four evaluation modes.
//!
//! Uses an in-process keyword judge instead of a live endpoint, so the
//! example runs offline. Swap in `OpenAiJudge` from `rubriq-judge` for a
//! real judge model.
//!
//! ```bash
//! cargo run --example first_responder -p rubriq-examples
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use rubriq_core::config::EvalConfig;
use rubriq_core::error::Result;
use rubriq_core::judge::{JudgeCallOptions, JudgeClient};
use rubriq_eval::prelude::*;
use rubriq_graph::prelude::*;
use rubriq_judge::prelude::*;
use rubriq_store::prelude::*;

// ---------------------------------------------------------------------------
// KeywordJudge – grades by keyword presence in the judged completion
// ---------------------------------------------------------------------------

struct KeywordJudge;

/// Which word the response must contain for each question.
fn required_keyword(question: &str) -> &'static str {
    if question.contains("scene safety") {
        "hazard"
    } else if question.contains("responsiveness") {
        "responsive"
    } else if question.contains("severity") {
        "severity"
    } else {
        "airway"
    }
}

#[async_trait]
impl JudgeClient for KeywordJudge {
    async fn complete(&self, prompt: &str, _options: &JudgeCallOptions) -> Result<String> {
        let question = prompt
            .lines()
            .find_map(|line| line.strip_prefix("question="))
            .unwrap_or_default();
        let keyword = required_keyword(question);
        let hit = prompt
            .split("completion:")
            .nth(1)
            .map(|completion| completion.contains(keyword))
            .unwrap_or(false);
        let (answer, reasoning) = if hit {
            (1.0, format!("the response mentions '{keyword}'"))
        } else {
            (0.0, format!("the response never mentions '{keyword}'"))
        };
        Ok(format!(
            r#"{{"answer": {answer}, "reasoning": "{reasoning}"}}"#
        ))
    }

    fn model_name(&self) -> &str {
        "keyword-judge"
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // -----------------------------------------------------------------------
    // Build the workflow: scene safety gates assessment and triage
    // -----------------------------------------------------------------------
    let mut builder = WorkflowBuilder::new();
    builder
        .node(
            "scene_safety",
            "Does the response address scene safety before approaching?",
        )
        .if_yes(["assess_patient", "triage_severity"])
        .if_no(Vec::<String>::new());
    builder
        .node(
            "assess_patient",
            "Does the response check patient responsiveness?",
        )
        .if_yes(["airway_check"]);
    builder.node(
        "triage_severity",
        "Does the response triage victims by severity?",
    );
    builder.node("airway_check", "Does the response secure the airway?");

    let requirements = builder.build()?;
    let rubric = MultiStepRubric::with_strategy(
        requirements,
        Arc::new(KeywordJudge),
        RewardStrategy::Sum,
    )?;

    println!("=== Rubric ===\n{}", rubric.summary());

    let scenario = Scenario::builder()
        .name("two-car collision")
        .prompt("You arrive first at a two-car collision with three victims.")
        .completion(
            "I would check for hazards like leaking fuel before approaching, \
             confirm each victim is responsive, sort them by severity, \
             and secure the airway of the unresponsive driver.",
        )
        .answer("scene_safety", 1.0)
        .answer("assess_patient", 1.0)
        .answer("triage_severity", 1.0)
        .answer("airway_check", 1.0)
        .build()?;

    let config = EvalConfig::default();

    // -----------------------------------------------------------------------
    // Demo 1: one rollout per evaluation mode
    // -----------------------------------------------------------------------
    println!("=== Demo 1: evaluation modes ===\n");

    for mode in [
        EvaluationMode::ModelGuided,
        EvaluationMode::ReferenceGuided,
        EvaluationMode::Exhaustive,
        EvaluationMode::Adaptive,
    ] {
        let report = rubric
            .score_rollout(
                &scenario.prompt,
                scenario.completion.as_deref().unwrap_or(""),
                &scenario.answers,
                mode,
                &config,
            )
            .await?;
        println!(
            "  {mode}: reward={} terminal={}",
            report.reward,
            report.terminal_condition.as_str()
        );
        if let Some(ratio) = report.completion_ratio {
            println!("    completion ratio: {ratio:.2}");
        }
    }

    // -----------------------------------------------------------------------
    // Demo 2: save and load the rubric and its scenarios
    // -----------------------------------------------------------------------
    println!("\n=== Demo 2: persistence ===\n");

    let dir = std::env::temp_dir().join("rubriq-first-responder");
    let judge_config = JudgeClientConfig::new("gpt-4.1-nano");
    save_rubric(&dir, "first_responder", &rubric, &judge_config)?;
    save_scenarios(
        &dir.join("first_responder_scenarios.yaml"),
        std::slice::from_ref(&scenario),
    )?;

    let reloaded = load_rubric(&dir, "first_responder", Arc::new(KeywordJudge))?;
    let scenarios = load_scenarios(&dir.join("first_responder_scenarios.yaml"))?;
    println!(
        "  reloaded {} requirements and {} scenario(s) from {}",
        reloaded.len(),
        scenarios.len(),
        dir.display()
    );

    println!("\nAll demos completed successfully!");
    Ok(())
}

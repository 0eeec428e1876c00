use std::collections::BTreeMap;

use rubriq_core::error::Result;

use crate::requirement::{DependencyRule, Requirement};

/// One node of a workflow under construction.
#[derive(Debug, Clone)]
pub struct WorkflowNode {
    name: String,
    question: String,
    dependencies: Vec<DependencyRule>,
}

impl WorkflowNode {
    /// Unlock `unlocks` when the answer equals `when`.
    pub fn depends_on(
        &mut self,
        when: f64,
        unlocks: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.dependencies.push(DependencyRule::new(when, unlocks));
        self
    }

    /// Unlock on a positive answer (`1.0`).
    pub fn if_yes(&mut self, unlocks: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.depends_on(1.0, unlocks)
    }

    /// Unlock on a negative answer (`0.0`).
    pub fn if_no(&mut self, unlocks: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.depends_on(0.0, unlocks)
    }

    /// Drop any recorded activations, making this node terminal.
    pub fn terminal(&mut self) -> &mut Self {
        self.dependencies.clear();
        self
    }
}

/// Fluent builder for binary-requirement workflows.
///
/// ```
/// use rubriq_graph::builder::WorkflowBuilder;
///
/// let mut builder = WorkflowBuilder::new();
/// builder
///     .node("check_safety", "Is the scene safe?")
///     .if_yes(["assess_patient"]);
/// builder.node("assess_patient", "Is the patient responsive?");
/// let requirements = builder.build().unwrap();
/// assert_eq!(requirements.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct WorkflowBuilder {
    nodes: Vec<WorkflowNode>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or revisit a node. Revisiting updates the question and
    /// returns the existing node for further chaining.
    pub fn node(&mut self, name: impl Into<String>, question: impl Into<String>) -> &mut WorkflowNode {
        let name = name.into();
        let question = question.into();
        if let Some(idx) = self.nodes.iter().position(|n| n.name == name) {
            self.nodes[idx].question = question;
            return &mut self.nodes[idx];
        }
        self.nodes.push(WorkflowNode {
            name,
            question,
            dependencies: Vec::new(),
        });
        self.nodes.last_mut().unwrap() // safe: just pushed
    }

    /// Structural issues that would fail rubric construction later:
    /// unknown unlock targets, self-dependencies, no roots.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let names: BTreeMap<&str, ()> = self.nodes.iter().map(|n| (n.name.as_str(), ())).collect();

        for node in &self.nodes {
            for rule in &node.dependencies {
                for target in &rule.unlocks {
                    if !names.contains_key(target.as_str()) {
                        issues.push(format!(
                            "Node '{}' unlocks unknown node '{target}'",
                            node.name
                        ));
                    }
                    if *target == node.name {
                        issues.push(format!("Node '{}' unlocks itself", node.name));
                    }
                }
            }
        }

        let unlocked: Vec<&str> = self
            .nodes
            .iter()
            .flat_map(|n| n.dependencies.iter())
            .flat_map(|r| r.unlocks.iter().map(|s| s.as_str()))
            .collect();
        if !self.nodes.is_empty() && self.nodes.iter().all(|n| unlocked.contains(&n.name.as_str()))
        {
            issues.push("No root nodes found".into());
        }

        issues
    }

    /// Build the workflow into requirements, in declaration order.
    pub fn build(&self) -> Result<Vec<Requirement>> {
        self.nodes
            .iter()
            .map(|n| {
                Requirement::binary_with(
                    n.name.clone(),
                    n.question.clone(),
                    n.dependencies.clone(),
                )
            })
            .collect()
    }
}

/// Build a sequential workflow: each step unlocks the next on a yes.
pub fn linear_workflow(steps: &[(&str, &str)]) -> Result<Vec<Requirement>> {
    let mut builder = WorkflowBuilder::new();
    for (i, (name, question)) in steps.iter().enumerate() {
        let node = builder.node(*name, *question);
        if let Some((next, _)) = steps.get(i + 1) {
            node.if_yes([*next]);
        }
    }
    builder.build()
}

/// Sequential workflow from bare step names, with generated questions.
pub fn quick_workflow(steps: &[&str]) -> Result<Vec<Requirement>> {
    let pairs: Vec<(String, String)> = steps
        .iter()
        .map(|step| {
            (
                step.to_string(),
                format!("Does the response consider {}?", step.replace('_', " ")),
            )
        })
        .collect();
    let borrowed: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(n, q)| (n.as_str(), q.as_str()))
        .collect();
    linear_workflow(&borrowed)
}

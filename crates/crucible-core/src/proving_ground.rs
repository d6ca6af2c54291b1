//! Expert-versus-student evaluation of plan authors over a curriculum.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collaborators::PlanAuthor;
use crate::registry::{AgentRegistry, RegistryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvingVerdict {
    /// Student passed more tasks than the expert.
    Superior,
    Equal,
    NeedsTraining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub objective: String,
    pub expert_passed: bool,
    pub student_passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingReport {
    pub expert: String,
    pub student: String,
    pub tasks: Vec<TaskOutcome>,
    pub expert_score: usize,
    pub student_score: usize,
    pub verdict: ProvingVerdict,
}

/// A task passes when the agent yields a structurally valid plan.
async fn attempt(agent: &dyn PlanAuthor, objective: &str) -> bool {
    match agent.create_plan(objective).await {
        Ok(plan) => plan.validate().is_ok(),
        Err(_) => false,
    }
}

pub async fn run_proving_ground(
    registry: &AgentRegistry,
    expert_tag: &str,
    student_tag: &str,
    curriculum: &[String],
) -> Result<ProvingReport, RegistryError> {
    let expert = registry.build(expert_tag)?;
    let student = registry.build(student_tag)?;

    let mut tasks = Vec::with_capacity(curriculum.len());
    for (i, objective) in curriculum.iter().enumerate() {
        let expert_passed = attempt(expert.as_ref(), objective).await;
        let student_passed = attempt(student.as_ref(), objective).await;
        info!(
            task = i + 1,
            total = curriculum.len(),
            expert_passed,
            student_passed,
            "proving ground task evaluated"
        );
        tasks.push(TaskOutcome {
            objective: objective.clone(),
            expert_passed,
            student_passed,
        });
    }

    let expert_score = tasks.iter().filter(|t| t.expert_passed).count();
    let student_score = tasks.iter().filter(|t| t.student_passed).count();
    let verdict = match student_score.cmp(&expert_score) {
        std::cmp::Ordering::Greater => ProvingVerdict::Superior,
        std::cmp::Ordering::Equal => ProvingVerdict::Equal,
        std::cmp::Ordering::Less => ProvingVerdict::NeedsTraining,
    };

    Ok(ProvingReport {
        expert: expert_tag.to_string(),
        student: student_tag.to_string(),
        tasks,
        expert_score,
        student_score,
        verdict,
    })
}

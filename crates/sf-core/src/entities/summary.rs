use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::Study;
use crate::enums::WorkflowStep;

/// Owner-feed projection of a study: enough to list and route to it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudySummary {
    pub id: String,
    pub owner_id: String,
    pub workflow_status: WorkflowStep,
    pub current_step: WorkflowStep,
}

impl From<&Study> for StudySummary {
    fn from(study: &Study) -> Self {
        Self {
            id: study.id.clone(),
            owner_id: study.owner_id.clone(),
            workflow_status: study.workflow_status,
            current_step: study.current_step,
        }
    }
}

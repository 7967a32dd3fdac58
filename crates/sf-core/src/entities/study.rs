use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::FileRecord;
use crate::enums::{SyncKind, WorkflowStep};
use crate::errors::CoreError;
use crate::graph;

/// The root workflow aggregate tracking one property analysis session.
///
/// Workflow progress is typed; every other document field (assets, rooms,
/// annotations, takeoff, checklist, files, and anything unknown) is kept
/// verbatim in `payload` so that a round trip through this struct never
/// drops data written by other clients or backend jobs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    pub id: String,
    pub owner_id: String,
    /// Furthest step reached. Never regresses.
    pub workflow_status: WorkflowStep,
    /// Step currently being viewed. May be behind `workflow_status`.
    pub current_step: WorkflowStep,
    /// Steps ever reached, in first-visit order, without duplicates.
    #[serde(default)]
    pub visited_steps: Vec<WorkflowStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Result of applying a step transition to a study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: WorkflowStep,
    pub to: WorkflowStep,
    pub backward: bool,
    /// Whether the high-water mark moved.
    pub raised_status: bool,
}

impl Study {
    /// A fresh study at the first workflow step.
    #[must_use]
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            workflow_status: WorkflowStep::FIRST,
            current_step: WorkflowStep::FIRST,
            visited_steps: vec![WorkflowStep::FIRST],
            created_at: Some(now),
            payload: Map::new(),
        }
    }

    /// Parse a full document as delivered by the document store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the document does not describe a
    /// study (missing identity, unknown step names, wrong shapes).
    pub fn from_document(document: Value) -> Result<Self, CoreError> {
        serde_json::from_value(document)
            .map_err(|e| CoreError::Validation(format!("invalid study document: {e}")))
    }

    /// Serialize to the document shape used by the store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if serialization fails.
    pub fn to_document(&self) -> Result<Value, CoreError> {
        serde_json::to_value(self)
            .map_err(|e| CoreError::Validation(format!("unserializable study: {e}")))
    }

    /// Apply a navigation to `target`, enforcing the step graph.
    ///
    /// Moves `current_step`, records the visit, and raises `workflow_status`
    /// only when moving forward past it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IllegalTransition`] (carrying the redirect route)
    /// when `target` is not reachable. The study is left untouched.
    pub fn navigate(&mut self, target: WorkflowStep) -> Result<Transition, CoreError> {
        if !graph::can_navigate_to(
            target,
            self.current_step,
            &self.visited_steps,
            self.workflow_status,
        ) {
            return Err(CoreError::IllegalTransition {
                from: self.current_step,
                to: target,
                redirect: graph::default_route_for(Some(self.workflow_status)),
            });
        }

        let from = self.current_step;
        let backward = graph::is_backward(from, target);
        self.current_step = target;
        if !self.visited_steps.contains(&target) {
            self.visited_steps.push(target);
        }

        let raised_status =
            !backward && graph::index_of(target) > graph::index_of(self.workflow_status);
        if raised_status {
            self.workflow_status = target;
        }

        Ok(Transition {
            from,
            to: target,
            backward,
            raised_status,
        })
    }

    /// Current value of a kind's slice.
    ///
    /// Payload kinds yield the field value (`Null` when absent); the workflow
    /// kind yields an object with its three fields.
    #[must_use]
    pub fn slice(&self, kind: SyncKind) -> Value {
        match kind.payload_field() {
            Some(field) => self.payload.get(field).cloned().unwrap_or(Value::Null),
            None => Value::Object(self.patch(kind)),
        }
    }

    /// Run `updater` on a payload kind's slice (`Null` when absent). An absent
    /// field the updater leaves `Null` stays absent.
    ///
    /// Returns `false` without calling `updater` for the workflow kind, which
    /// only changes through [`Self::navigate`].
    pub fn edit_slice(&mut self, kind: SyncKind, updater: impl FnOnce(&mut Value)) -> bool {
        let Some(field) = kind.payload_field() else {
            return false;
        };
        match self.payload.get_mut(field) {
            Some(value) => updater(value),
            None => {
                let mut value = Value::Null;
                updater(&mut value);
                if !value.is_null() {
                    self.payload.insert(field.to_string(), value);
                }
            }
        }
        true
    }

    /// Replace this study's slice for `kind` with the one held by `incoming`.
    pub fn adopt_slice(&mut self, kind: SyncKind, incoming: &Self) {
        match kind.payload_field() {
            Some(field) => match incoming.payload.get(field) {
                Some(value) => {
                    self.payload.insert(field.to_string(), value.clone());
                }
                None => {
                    self.payload.remove(field);
                }
            },
            None => {
                self.workflow_status = incoming.workflow_status;
                self.current_step = incoming.current_step;
                self.visited_steps.clone_from(&incoming.visited_steps);
            }
        }
    }

    /// Whether `incoming` holds a different value for `kind` than this study.
    #[must_use]
    pub fn slice_differs(&self, kind: SyncKind, incoming: &Self) -> bool {
        self.slice(kind) != incoming.slice(kind)
    }

    /// The partial document that persists `kind`. An absent payload field
    /// yields an empty patch.
    #[must_use]
    pub fn patch(&self, kind: SyncKind) -> Map<String, Value> {
        let mut fields = Map::new();
        match kind.payload_field() {
            Some(field) => {
                if let Some(value) = self.payload.get(field) {
                    fields.insert(field.to_string(), value.clone());
                }
            }
            None => {
                fields.insert(
                    "workflowStatus".into(),
                    Value::String(self.workflow_status.as_str().into()),
                );
                fields.insert(
                    "currentStep".into(),
                    Value::String(self.current_step.as_str().into()),
                );
                fields.insert(
                    "visitedSteps".into(),
                    Value::Array(
                        self.visited_steps
                            .iter()
                            .map(|s| Value::String(s.as_str().into()))
                            .collect(),
                    ),
                );
            }
        }
        fields
    }

    /// Uploaded file records. Malformed entries are skipped.
    #[must_use]
    pub fn files(&self) -> Vec<FileRecord> {
        self.payload
            .get("files")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether a payload field holds a non-empty value.
    #[must_use]
    pub fn has_populated(&self, field: &str) -> bool {
        match self.payload.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }
}

//! Name-only record creation where the backend picks the category.

use grid_types::Task;
use tracing::{debug, warn};

use crate::{GridClient, GridError};

/// Where a quick-add entry stands.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum WorkflowState {
    #[default]
    Idle,
    /// A name is being typed. `last_error` holds the message of a failed commit.
    Drafting {
        name: String,
        last_error: Option<String>,
    },
    Committing {
        name: String,
    },
    Created {
        task: Option<Task>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommitOutcome {
    /// Blank name: nothing was sent.
    Discarded,
    Created(Option<Task>),
}

/// Quick-add state machine: `Idle -> Drafting -> Committing -> Created`, or back to
/// `Drafting` with the name kept when the backend refuses.
///
/// `commit` takes `&mut self`, so one workflow never has two calls in flight.
#[derive(Debug, Default)]
pub struct CategoryWorkflow {
    state: WorkflowState,
}

impl CategoryWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Replace the draft name. Leaves `Created` and clears a previous error.
    pub fn type_name(&mut self, name: impl Into<String>) {
        self.state = WorkflowState::Drafting {
            name: name.into(),
            last_error: None,
        };
    }

    pub fn cancel(&mut self) {
        self.state = WorkflowState::Idle;
    }

    /// Send the drafted name.
    ///
    /// On success the record set is reloaded; a reload failure is returned but the
    /// workflow still ends in `Created`.
    pub async fn commit(&mut self, client: &GridClient) -> Result<CommitOutcome, GridError> {
        let name = match &self.state {
            WorkflowState::Drafting { name, .. } => name.trim().to_string(),
            _ => String::new(),
        };
        if name.is_empty() {
            debug!("blank quick-add discarded");
            self.state = WorkflowState::Idle;
            return Ok(CommitOutcome::Discarded);
        }

        self.state = WorkflowState::Committing { name: name.clone() };
        match client.create_categorized(&name).await {
            Ok(task) => {
                self.state = WorkflowState::Created { task: task.clone() };
                client.reload().await?;
                Ok(CommitOutcome::Created(task))
            }
            Err(err) => {
                warn!(task = %name, error = %err, "quick-add failed");
                let message = match &err {
                    GridError::SuggestionUnavailable(msg) => msg.clone(),
                    other => other.to_string(),
                };
                self.state = WorkflowState::Drafting {
                    name,
                    last_error: Some(message),
                };
                Err(err)
            }
        }
    }
}

use flowdesk_types::{FieldSchema, WorkflowStep};
use tracing::debug;
use uuid::Uuid;

/// Ordered workflow steps of a template being authored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepList {
    steps: Vec<WorkflowStep>,
}

impl StepList {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<WorkflowStep> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    pub fn position(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.id == step_id)
    }

    fn get_mut(&mut self, step_id: &str) -> Option<&mut WorkflowStep> {
        self.steps.iter_mut().find(|step| step.id == step_id)
    }

    /// Append a blank step with a fresh id and return that id.
    pub fn add_step(&mut self) -> String {
        let id = Uuid::now_v7().to_string();
        debug!(step_id = %id, "adding workflow step");
        self.steps.push(WorkflowStep::new(id.clone()));
        id
    }

    /// Remove a step and drop it from every remaining step's dependencies.
    pub fn remove_step(&mut self, step_id: &str) -> Option<WorkflowStep> {
        let index = self.position(step_id)?;
        let removed = self.steps.remove(index);
        for step in &mut self.steps {
            step.dependencies.retain(|dependency| dependency != step_id);
        }
        Some(removed)
    }

    /// Move the step at `from` to index `to`, shifting the others.
    pub fn move_step(&mut self, from: usize, to: usize) -> bool {
        if from >= self.steps.len() || to >= self.steps.len() {
            return false;
        }
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        true
    }

    pub fn set_name(&mut self, step_id: &str, name: impl Into<String>) -> bool {
        self.update(step_id, |step| step.name = name.into())
    }

    pub fn set_description(&mut self, step_id: &str, description: impl Into<String>) -> bool {
        self.update(step_id, |step| step.description = description.into())
    }

    pub fn set_roles(&mut self, step_id: &str, roles: Vec<String>) -> bool {
        self.update(step_id, |step| step.assignable_roles = roles)
    }

    pub fn set_form(&mut self, step_id: &str, form: Vec<FieldSchema>) -> bool {
        self.update(step_id, |step| step.form = form)
    }

    /// Replace a step's dependencies. Self references, duplicates, and ids
    /// that are not in the list are dropped.
    pub fn set_dependencies(&mut self, step_id: &str, dependencies: Vec<String>) -> bool {
        let known: Vec<String> = dependencies.into_iter().filter(|dependency| self.get(dependency).is_some()).collect();
        self.update(step_id, |step| step.set_dependencies(known))
    }

    /// Steps a given step may depend on: every other step.
    pub fn dependency_candidates(&self, step_id: &str) -> Vec<&WorkflowStep> {
        self.steps.iter().filter(|step| step.id != step_id).collect()
    }

    fn update(&mut self, step_id: &str, apply: impl FnOnce(&mut WorkflowStep)) -> bool {
        match self.get_mut(step_id) {
            Some(step) => {
                apply(step);
                true
            }
            None => false,
        }
    }
}

//! Application state for the Flowdesk TUI.
//!
//! `App` owns the data every screen reads: the template list, the resource
//! option cache, the open step form, and the assistant session. Components
//! mutate it from key handlers and report side effects as [`Effect`]s; the
//! runtime turns those into API calls whose results come back as [`Msg`]s.

use std::path::PathBuf;
use std::sync::Arc;

use flowdesk_agent::{AssistantConfig, ChatSession, Suggestion};
use flowdesk_api::{ApiError, AppContext, ChatMessage};
use flowdesk_engine::{EntryKey, GraphView, PendingList, ResourceOptionsCache, TemplateBuilder};
use flowdesk_types::{FieldSchema, ResourceEntry, TicketTemplate};
use flowdesk_util::LocalStore;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::ui::components::common::TextInputState;
use crate::ui::components::form::StepFormState;
use crate::ui::theme::{self, Theme};

/// Top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Templates,
    StepForm,
    Assistant,
}

/// Side effects requested by components.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SwitchTo(Route),
    LoadTemplates,
    SaveTemplate { key: EntryKey, template: TicketTemplate },
    DeleteTemplate { key: EntryKey, id: i64 },
    LoadResourceEntries(Vec<i64>),
    AttachFile { field_id: String, path: PathBuf },
    RemoveFile { field_id: String, index: usize },
    SendChat(Vec<ChatMessage>),
    Quit,
}

/// Result of an effect that ran off the UI loop.
#[derive(Debug)]
pub enum ExecOutcome {
    TemplatesLoaded(Result<Vec<TicketTemplate>, ApiError>),
    TemplateSaved { key: EntryKey, result: Result<TicketTemplate, ApiError> },
    TemplateDeleted { key: EntryKey, result: Result<(), ApiError> },
    ResourceEntries { resource_type_id: i64, result: Result<Vec<ResourceEntry>, ApiError> },
    Log(String),
}

/// Progress of one streamed assistant reply.
#[derive(Debug)]
pub enum ChatEvent {
    Opened,
    Chunk(String),
    Finished,
    Failed(ApiError),
}

#[derive(Debug)]
pub enum Msg {
    Tick,
    Resize,
    ExecCompleted(Box<ExecOutcome>),
    Chat(ChatEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub text: String,
}

/// Template list and preview selection.
#[derive(Debug, Default)]
pub struct TemplatesState {
    pub list: PendingList<TicketTemplate>,
    pub selected: usize,
    pub selected_step: usize,
    pub graph: GraphView,
    pub loading: bool,
}

impl TemplatesState {
    pub fn selected_key(&self) -> Option<EntryKey> {
        self.list.visible().nth(self.selected).map(|(key, _, _)| key)
    }

    pub fn selected_template(&self) -> Option<&TicketTemplate> {
        self.list.visible().nth(self.selected).map(|(_, template, _)| template)
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.list.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
        self.selected_step = 0;
    }

    fn clamp_selection(&mut self) {
        let len = self.list.len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

pub struct AssistantState {
    pub session: ChatSession,
    pub input: TextInputState,
    pub scroll: u16,
}

pub struct App {
    pub ctx: Arc<AppContext>,
    pub theme: Box<dyn Theme>,
    pub route: Route,
    pub templates: TemplatesState,
    pub options: ResourceOptionsCache,
    pub step_form: Option<StepFormState>,
    pub assistant: AssistantState,
    /// Template suggested by the assistant, not yet saved.
    pub draft: Option<TemplateBuilder>,
    /// List entry of the draft while its save is in flight.
    draft_save: Option<EntryKey>,
    pub status: Option<StatusLine>,
    pub should_quit: bool,
    pending_chat: Option<UnboundedReceiver<ChatEvent>>,
}

impl App {
    pub fn new(ctx: Arc<AppContext>, store: Arc<dyn LocalStore>) -> Self {
        Self {
            ctx,
            theme: theme::load(),
            route: Route::default(),
            templates: TemplatesState::default(),
            options: ResourceOptionsCache::new(),
            step_form: None,
            assistant: AssistantState {
                session: ChatSession::new(AssistantConfig::template(), store),
                input: TextInputState::new(),
                scroll: 0,
            },
            draft: None,
            draft_save: None,
            status: None,
            should_quit: false,
            pending_chat: None,
        }
    }

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusLine { level, text: text.into() });
    }

    pub fn set_pending_chat(&mut self, receiver: UnboundedReceiver<ChatEvent>) {
        self.pending_chat = Some(receiver);
    }

    pub fn take_pending_chat(&mut self) -> Option<UnboundedReceiver<ChatEvent>> {
        self.pending_chat.take()
    }

    /// Mark unloaded resource types as loading and request them.
    pub fn request_options(&mut self, fields: &[FieldSchema]) -> Option<Effect> {
        let missing = self.options.missing_types(fields);
        if missing.is_empty() {
            return None;
        }
        for resource_type_id in &missing {
            self.options.mark_loading(*resource_type_id);
        }
        Some(Effect::LoadResourceEntries(missing))
    }

    /// Start saving the assistant's draft. The draft stays until the server
    /// accepts it, so a rejected save can be retried.
    pub fn save_draft(&mut self) -> Vec<Effect> {
        if self.draft_save.is_some() {
            self.set_status(StatusLevel::Info, "The suggested template is already being saved");
            return Vec::new();
        }
        let Some(draft) = self.draft.as_mut() else {
            self.set_status(StatusLevel::Info, "There is no suggested template to save");
            return Vec::new();
        };
        let template = match draft.save() {
            Ok(template) => template,
            Err(errors) => {
                let summary = errors.iter().map(|(key, message)| format!("{key}: {message}")).collect::<Vec<_>>().join("; ");
                self.set_status(StatusLevel::Error, format!("Template is not ready to save: {summary}"));
                return Vec::new();
            }
        };
        let existing = template.id.and_then(|id| self.templates.list.find(|candidate| candidate.id == Some(id)));
        let key = match existing {
            Some(key) => {
                if !self.templates.list.update_pending(key, template.clone()) {
                    self.set_status(StatusLevel::Warning, "Another change to this template is still being saved");
                    return Vec::new();
                }
                key
            }
            None => self.templates.list.insert_pending(template.clone()),
        };
        self.draft_save = Some(key);
        debug!(%key, name = %template.name, "saving template");
        self.set_status(StatusLevel::Info, format!("Saving '{}'...", template.name));
        vec![Effect::SaveTemplate { key, template }]
    }

    pub fn discard_draft(&mut self) {
        self.draft = None;
        self.draft_save = None;
        self.templates.selected_step = 0;
    }

    pub fn is_saving_draft(&self) -> bool {
        self.draft_save.is_some()
    }

    /// Template shown in the preview: the unsaved draft wins over the selection.
    pub fn previewed_template(&self) -> Option<TicketTemplate> {
        match &self.draft {
            Some(draft) => Some(draft_preview(draft)),
            None => self.templates.selected_template().cloned(),
        }
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Effect> {
        match msg {
            Msg::Tick | Msg::Resize => Vec::new(),
            Msg::ExecCompleted(outcome) => self.apply_outcome(*outcome),
            Msg::Chat(event) => {
                self.apply_chat_event(event);
                Vec::new()
            }
        }
    }

    fn apply_outcome(&mut self, outcome: ExecOutcome) -> Vec<Effect> {
        match outcome {
            ExecOutcome::TemplatesLoaded(result) => {
                self.templates.loading = false;
                match result {
                    Ok(templates) => {
                        debug!(count = templates.len(), "templates loaded");
                        self.templates.list.reset(templates, same_template);
                        self.templates.clamp_selection();
                        self.options.invalidate();
                        let fields: Vec<FieldSchema> = self.templates.list.visible().flat_map(|(_, template, _)| all_fields(template)).collect();
                        return self.request_options(&fields).into_iter().collect();
                    }
                    Err(error) => self.set_status(StatusLevel::Error, format!("Failed to load templates: {error}")),
                }
            }
            ExecOutcome::TemplateSaved { key, result } => match result {
                Ok(template) => {
                    if self.draft_save == Some(key) {
                        self.draft_save = None;
                        self.draft = None;
                        self.templates.selected_step = 0;
                    }
                    self.set_status(StatusLevel::Success, format!("Saved template '{}'", template.name));
                    self.templates.list.confirm(key, Some(template));
                }
                Err(error) => {
                    warn!(%error, "template save failed");
                    if self.draft_save == Some(key) {
                        self.draft_save = None;
                    }
                    self.templates.list.fail(key, error.to_string());
                    self.templates.clamp_selection();
                    self.set_status(StatusLevel::Error, format!("Failed to save template: {error}"));
                }
            },
            ExecOutcome::TemplateDeleted { key, result } => match result {
                Ok(()) => {
                    self.templates.list.confirm(key, None);
                    self.templates.clamp_selection();
                    self.set_status(StatusLevel::Success, "Template deleted");
                }
                Err(error) => {
                    warn!(%error, "template delete failed");
                    self.templates.list.fail(key, format!("Failed to delete template: {error}"));
                    self.set_status(StatusLevel::Error, format!("Failed to delete template: {error}"));
                }
            },
            ExecOutcome::ResourceEntries { resource_type_id, result } => self.options.store(resource_type_id, result),
            ExecOutcome::Log(line) => self.set_status(StatusLevel::Info, line),
        }
        Vec::new()
    }

    fn apply_chat_event(&mut self, event: ChatEvent) {
        let session = &mut self.assistant.session;
        let suggestion = match event {
            ChatEvent::Opened => {
                session.start_reply();
                None
            }
            ChatEvent::Chunk(text) => session.apply_chunk(&text),
            ChatEvent::Finished => session.complete(),
            ChatEvent::Failed(error) => {
                session.fail(&error);
                self.set_status(StatusLevel::Error, format!("Assistant request failed: {error}"));
                None
            }
        };
        if let Some(suggestion) = suggestion {
            self.accept_suggestion(suggestion);
        }
    }

    pub fn accept_suggestion(&mut self, suggestion: Suggestion) {
        match TemplateBuilder::from_suggestion(&suggestion.payload) {
            Ok(builder) => {
                let name = if builder.name.trim().is_empty() { "Untitled".to_string() } else { builder.name.clone() };
                self.draft = Some(builder);
                self.draft_save = None;
                self.set_status(StatusLevel::Info, format!("Suggested template '{name}' is ready; press s in the template list to save it"));
            }
            Err(error) => {
                warn!(section = %suggestion.section, %error, "assistant suggestion does not describe a template");
                self.set_status(StatusLevel::Warning, "The assistant's suggestion could not be read as a template");
            }
        }
    }
}

/// Server ids identify templates; unsaved ones never match.
fn same_template(left: &TicketTemplate, right: &TicketTemplate) -> bool {
    left.id.is_some() && left.id == right.id
}

fn draft_preview(draft: &TemplateBuilder) -> TicketTemplate {
    TicketTemplate {
        id: draft.id,
        name: draft.name.clone(),
        description: draft.description.clone(),
        title_format: draft.title_format.clone(),
        default_priority: draft.default_priority,
        workflow: draft.steps().steps().to_vec(),
        workflow_config: draft.workflow_config(),
        created_by: None,
        created_at: None,
        updated_at: None,
    }
}

/// Every field of every step.
pub fn all_fields(template: &TicketTemplate) -> impl Iterator<Item = FieldSchema> + '_ {
    template.workflow.iter().flat_map(|step| step.form.iter().cloned())
}

#[cfg(test)]
mod tests {
    use flowdesk_api::FlowdeskClient;
    use flowdesk_engine::EntryStatus;
    use flowdesk_util::InMemoryLocalStore;
    use serde_json::json;
    use std::time::Duration;

    use super::*;

    fn app() -> App {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
        let client = FlowdeskClient::new("http://localhost:8000", Duration::from_secs(5)).expect("client");
        App::new(Arc::new(AppContext::new(client, Arc::clone(&store))), store)
    }

    fn template(id: i64, name: &str) -> TicketTemplate {
        serde_json::from_value(json!({"id": id, "name": name, "workflow": []})).expect("template")
    }

    #[test]
    fn failed_delete_restores_the_template_with_a_message() {
        let mut app = app();
        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::TemplatesLoaded(Ok(vec![template(1, "A"), template(2, "B")])))));
        let key = app.templates.selected_key().expect("key");
        assert!(app.templates.list.remove_pending(key));
        assert_eq!(app.templates.list.len(), 1);

        let error = ApiError::Config("offline".into());
        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::TemplateDeleted { key, result: Err(error) })));
        assert_eq!(app.templates.list.len(), 2);
        assert!(matches!(app.templates.list.status(key), Some(EntryStatus::Failed(message)) if message.starts_with("Failed to delete template")));
        assert_eq!(app.status.as_ref().map(|status| status.level), Some(StatusLevel::Error));
    }

    fn loaded(templates: Vec<TicketTemplate>) -> Msg {
        Msg::ExecCompleted(Box::new(ExecOutcome::TemplatesLoaded(Ok(templates))))
    }

    fn suggestion() -> Suggestion {
        Suggestion {
            section: "template".into(),
            payload: json!({
                "name": "Onboarding",
                "title_format": "Onboard {name}",
                "workflow": [{"id": "s1", "name": "Collect", "description": "Gather details"}]
            }),
        }
    }

    fn owner_field() -> FieldSchema {
        let mut field = FieldSchema::new("owner", "owner", flowdesk_types::FieldKind::Resource);
        field.resource_type_id = Some(4);
        field
    }

    #[test]
    fn resource_fields_are_requested_once() {
        let mut app = app();
        let field = owner_field();
        assert_eq!(app.request_options(std::slice::from_ref(&field)), Some(Effect::LoadResourceEntries(vec![4])));
        assert_eq!(app.request_options(std::slice::from_ref(&field)), None);
    }

    #[test]
    fn failed_or_reloaded_resource_types_are_requested_again() {
        let mut app = app();
        let field = owner_field();
        assert!(app.request_options(std::slice::from_ref(&field)).is_some());
        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::ResourceEntries {
            resource_type_id: 4,
            result: Err(ApiError::MissingSession),
        })));
        assert_eq!(app.request_options(std::slice::from_ref(&field)), Some(Effect::LoadResourceEntries(vec![4])));

        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::ResourceEntries { resource_type_id: 4, result: Ok(Vec::new()) })));
        assert_eq!(app.request_options(std::slice::from_ref(&field)), None);
        app.update(loaded(vec![template(1, "A")]));
        assert_eq!(app.request_options(std::slice::from_ref(&field)), Some(Effect::LoadResourceEntries(vec![4])));
    }

    #[test]
    fn reload_during_delete_does_not_resurrect_the_template() {
        let mut app = app();
        app.update(loaded(vec![template(1, "A"), template(2, "B")]));
        let key = app.templates.selected_key().expect("key");
        assert!(app.templates.list.remove_pending(key));

        app.update(loaded(vec![template(1, "A"), template(2, "B")]));
        assert_eq!(app.templates.list.len(), 1);

        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::TemplateDeleted { key, result: Ok(()) })));
        let names: Vec<_> = app.templates.list.visible().map(|(_, template, _)| template.name.clone()).collect();
        assert_eq!(names, vec!["B"]);
        assert!(!app.templates.list.has_pending());
    }

    #[test]
    fn rejected_save_keeps_the_draft() {
        let mut app = app();
        app.accept_suggestion(suggestion());
        let effects = app.save_draft();
        let [Effect::SaveTemplate { key, .. }] = effects.as_slice() else {
            panic!("expected a save effect, got {effects:?}");
        };
        let key = *key;
        assert!(app.draft.is_some());
        assert!(app.save_draft().is_empty());

        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::TemplateSaved {
            key,
            result: Err(ApiError::Config("offline".into())),
        })));
        assert!(app.draft.is_some());
        assert!(!app.is_saving_draft());
        assert!(app.templates.list.is_empty());
        assert_eq!(app.previewed_template().map(|template| template.name), Some("Onboarding".to_string()));

        let effects = app.save_draft();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn accepted_save_clears_the_draft() {
        let mut app = app();
        app.accept_suggestion(suggestion());
        let effects = app.save_draft();
        let [Effect::SaveTemplate { key, template: sent }] = effects.as_slice() else {
            panic!("expected a save effect, got {effects:?}");
        };
        let mut stored = sent.clone();
        stored.id = Some(12);

        app.update(Msg::ExecCompleted(Box::new(ExecOutcome::TemplateSaved { key: *key, result: Ok(stored) })));
        assert!(app.draft.is_none());
        assert_eq!(app.templates.list.len(), 1);
        assert_eq!(app.templates.selected_template().and_then(|template| template.id), Some(12));
    }

    #[test]
    fn busy_template_refuses_a_second_save() {
        let mut app = app();
        app.update(loaded(vec![template(3, "A")]));
        let key = app.templates.selected_key().expect("key");
        assert!(app.templates.list.remove_pending(key));

        let mut suggested = suggestion();
        suggested.payload["name"] = json!("A");
        app.accept_suggestion(suggested);
        if let Some(draft) = app.draft.as_mut() {
            draft.id = Some(3);
        }
        assert!(app.save_draft().is_empty());
        assert!(!app.is_saving_draft());
        assert_eq!(app.status.as_ref().map(|status| status.level), Some(StatusLevel::Warning));
    }

    #[test]
    fn accepted_suggestion_becomes_the_previewed_draft() {
        let mut app = app();
        app.accept_suggestion(suggestion());
        let preview = app.previewed_template().expect("draft");
        assert_eq!(preview.name, "Onboarding");
        assert_eq!(preview.workflow.len(), 1);
        assert!(preview.id.is_none());
    }
}

//! # Command Execution Layer
//!
//! Turns the [`Effect`]s components return into work. Route changes apply to
//! `App` directly, file edits are awaited in place because the step form
//! must see their result before the next key, and API calls are spawned as
//! tasks whose [`ExecOutcome`] the runtime feeds back through
//! `App::update`. A chat request spawns a task that forwards stream events
//! over a channel handed to `App`.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, spawn};
use tracing::{debug, warn};

use crate::app::{App, ChatEvent, Effect, ExecOutcome};

/// Apply `effects` and return the tasks still running.
pub async fn run_from_effects(app: &mut App, effects: Vec<Effect>) -> Vec<JoinHandle<ExecOutcome>> {
    let mut pending = Vec::new();
    for effect in effects {
        match effect {
            Effect::SwitchTo(route) => {
                debug!(?route, "switching route");
                app.route = route;
            }
            Effect::Quit => app.should_quit = true,
            Effect::LoadTemplates => {
                app.templates.loading = true;
                let client = app.ctx.client().clone();
                pending.push(spawn(async move { ExecOutcome::TemplatesLoaded(client.list_templates().await) }));
            }
            Effect::SaveTemplate { key, template } => {
                let client = app.ctx.client().clone();
                pending.push(spawn(async move {
                    let result = match template.id {
                        Some(id) => client.update_template(id, &template).await,
                        None => client.create_template(&template).await,
                    };
                    ExecOutcome::TemplateSaved { key, result }
                }));
            }
            Effect::DeleteTemplate { key, id } => {
                let client = app.ctx.client().clone();
                pending.push(spawn(async move {
                    ExecOutcome::TemplateDeleted {
                        key,
                        result: client.delete_template(id).await,
                    }
                }));
            }
            Effect::LoadResourceEntries(resource_type_ids) => {
                for resource_type_id in resource_type_ids {
                    let client = app.ctx.client().clone();
                    pending.push(spawn(async move {
                        ExecOutcome::ResourceEntries {
                            resource_type_id,
                            result: client.resource_entries(resource_type_id).await,
                        }
                    }));
                }
            }
            Effect::AttachFile { field_id, path } => {
                let client = app.ctx.client().clone();
                match app.step_form.as_mut() {
                    Some(form) => form.attach(&field_id, path, &client).await,
                    None => warn!(%field_id, "file attached without an open step form"),
                }
            }
            Effect::RemoveFile { field_id, index } => {
                let client = app.ctx.client().clone();
                if let Some(form) = app.step_form.as_mut() {
                    form.remove_file(&field_id, index, &client).await;
                }
            }
            Effect::SendChat(messages) => {
                let (sender, receiver) = mpsc::unbounded_channel();
                let client = app.ctx.client().clone();
                let endpoint = app.assistant.session.config().endpoint.clone();
                spawn(async move {
                    let mut stream = match client.open_chat(&endpoint, &messages).await {
                        Ok(stream) => stream,
                        Err(error) => {
                            let _ = sender.send(ChatEvent::Failed(error));
                            return;
                        }
                    };
                    let _ = sender.send(ChatEvent::Opened);
                    while let Some(chunk) = stream.next().await {
                        let event = match chunk {
                            Ok(text) => ChatEvent::Chunk(text),
                            Err(error) => {
                                let _ = sender.send(ChatEvent::Failed(error));
                                return;
                            }
                        };
                        if sender.send(event).is_err() {
                            return;
                        }
                    }
                    let _ = sender.send(ChatEvent::Finished);
                });
                app.set_pending_chat(receiver);
            }
        }
    }
    pending
}

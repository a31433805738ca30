//! # Flowdesk Engine
//!
//! Client-side logic behind Flowdesk's dynamic forms and ticket workflows.
//! Nothing here draws to a screen; the terminal client and the CLI both drive
//! these types.
//!
//! ## Key Features
//!
//! - **Form compilation**: turns field schemas into a validator plus defaults
//! - **Form state**: values and errors for one form, revalidated on every edit
//! - **Workflow editing**: ordered steps, dependency upkeep, graph layout with
//!   cycle warnings
//! - **Builders**: template, resource type, field list, and notification rules
//! - **Ticket lifecycle**: creation snapshots, assignment, submission, progress
//!
//! ## Usage
//!
//! ```rust
//! use flowdesk_engine::parse_template_file;
//!
//! let temp_dir = tempfile::tempdir()?;
//! let path = temp_dir.path().join("template.yaml");
//! std::fs::write(&path, r#"
//! name: Laptop request
//! title_format: "Laptop for {employee}"
//! workflow:
//!   - id: request
//!     name: Request
//!     description: Collect details
//! "#)?;
//!
//! let templates = parse_template_file(&path)?;
//! assert_eq!(templates[0].workflow.len(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`kind`**: the handler table shared by the compiler and the renderer
//! - **`compiler`** / **`form_state`** / **`value`**: validation and form values
//! - **`files`** / **`options`**: file field uploads and resource option lists
//! - **`workflow`**: step list editing and the graph view
//! - **`builder`**: authoring state with inline error maps
//! - **`ticket`**: ticket transitions over `workflow_data`
//! - **`pending`**: optimistic list entries with rollback

pub mod builder;
pub mod compiler;
pub mod files;
pub mod form_state;
pub mod kind;
pub mod options;
pub mod pending;
pub mod resource_entry;
pub mod ticket;
pub mod value;
pub mod workflow;

use std::{fs, path::Path};

use anyhow::{Context, Result};
use flowdesk_types::TicketTemplate;
use serde::Deserialize;

pub use builder::{FormBuilder, NotificationRules, ResourceBuilder, TemplateBuilder};
pub use compiler::{CompiledForm, FormErrors, MembershipWarning, compile_form};
pub use files::{FileEntry, FileUploadState, UploadMode, upload_pending};
pub use form_state::FormState;
pub use kind::{Control, KindSpec, OptionSource, ValueShape, kind_spec};
pub use options::{ChoiceOption, ResourceOptionsCache};
pub use pending::{EntryKey, EntryStatus, PendingList};
pub use resource_entry::{EntryFormError, ResourceEntryForm};
pub use ticket::{CompletionRate, TicketError, TicketFilter, ticket_from_template};
pub use value::{FieldValue, FormValues};
pub use workflow::{CycleWarning, GraphView, StepList, WorkflowGraph};

/// Load ticket templates from a YAML or JSON file.
///
/// Accepts a document with the templates under a `templates` key, a bare
/// list of templates, or a single template.
pub fn parse_template_file(file_path: impl AsRef<Path>) -> Result<Vec<TicketTemplate>> {
    let file_path = file_path.as_ref();
    let file_content = fs::read(file_path).with_context(|| format!("Failed to read template file: {}", file_path.display()))?;
    let content_string = String::from_utf8_lossy(&file_content);

    #[derive(Deserialize)]
    struct TemplateDocument {
        templates: Vec<TicketTemplate>,
    }

    if let Ok(document) = serde_yaml::from_str::<TemplateDocument>(&content_string) {
        return Ok(document.templates);
    }
    if let Ok(templates) = serde_yaml::from_str::<Vec<TicketTemplate>>(&content_string) {
        return Ok(templates);
    }

    let template = serde_yaml::from_str::<TicketTemplate>(&content_string).with_context(|| {
        format!(
            "Unsupported template document in {}. Expected a template, a list of templates, or a 'templates' key",
            file_path.display()
        )
    })?;
    Ok(vec![template])
}

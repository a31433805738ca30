//! Shared data model for Flowdesk.
//!
//! Everything here is plain serializable data plus the authoring-time checks
//! the builders need. Behaviour that depends on runtime state (compiling
//! validators, ticket transitions, graph layout) lives in `flowdesk-engine`.

pub mod field;
pub mod preferences;
pub mod resource;
pub mod ticket;
pub mod user;
pub mod workflow;

pub use field::{
    FieldDefinitionErrors, FieldErrorKey, FieldKind, FieldSchema, FieldValidation, FieldWidth, FileReference, LocalFile, validate_field_definition,
};
pub use preferences::{DisplaySettings, NotificationSettings, Preferences};
pub use resource::{ResourceEntry, ResourceEntryCreate, ResourceType, ResourceTypeMetainfo};
pub use ticket::{
    HistoryEntry, StepRuntimeState, StepStatus, TEMPLATE_VERSION, Ticket, TicketCreate, TicketStatus, TicketUpdate, WorkflowData,
    WorkflowMetadata,
};
pub use user::{Role, RoleInput, TokenResponse, User, UserCreate, UserRole, UserRoleCreate, UserUpdate, WILDCARD_PERMISSION, permissions};
pub use workflow::{NOTIFICATION_CHANNELS, NOTIFICATION_EVENTS, NotificationRule, Priority, TicketTemplate, WorkflowConfig, WorkflowStep};

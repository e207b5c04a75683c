//! Client session adapter.
//!
//! Turns server frames into the actions a UI takes: which cached resource
//! category to invalidate, when to leave a project view, when to back off,
//! and when the session must start over with new credentials.

use huddle_server::{
    domain::{DomainEvent, ResourceKind},
    infrastructure::dto::websocket::{EventFrame, ServerEvent},
};

/// Consecutive `rate-limited` errors before the user is told about them
pub const DEFAULT_PERSISTENT_THRESHOLD: u32 = 3;

/// Locally cached resource category, one per domain resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Tasks,
    Statuses,
    Labels,
    Comments,
    Files,
    Widgets,
}

impl From<ResourceKind> for CacheCategory {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Task => Self::Tasks,
            ResourceKind::Status => Self::Statuses,
            ResourceKind::Label => Self::Labels,
            ResourceKind::Comment => Self::Comments,
            ResourceKind::File => Self::Files,
            ResourceKind::Widget => Self::Widgets,
        }
    }
}

impl CacheCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Statuses => "statuses",
            Self::Labels => "labels",
            Self::Comments => "comments",
            Self::Files => "files",
            Self::Widgets => "widgets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterAction {
    /// Drop the cached data of one category for the current project
    Invalidate {
        project_id: String,
        category: CacheCategory,
    },
    /// Access to the current project is gone, leave its view
    LeaveProjectView { project_id: String },
    /// Slow down sending, silently
    BackOff,
    /// Something the user should see
    Notify(String),
    /// The session is over, start again with new credentials
    Reauthenticate { code: String, reason: String },
}

#[derive(Debug)]
pub struct ClientSessionAdapter {
    current_project: Option<String>,
    consecutive_rate_limits: u32,
    persistent_threshold: u32,
}

impl Default for ClientSessionAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_PERSISTENT_THRESHOLD)
    }
}

impl ClientSessionAdapter {
    pub fn new(persistent_threshold: u32) -> Self {
        Self {
            current_project: None,
            consecutive_rate_limits: 0,
            persistent_threshold: persistent_threshold.max(1),
        }
    }

    /// Project whose view is open, set by the server's `room-joined` acknowledgement
    pub fn current_project(&self) -> Option<&str> {
        self.current_project.as_deref()
    }

    /// Close the current project view (the user left the room)
    pub fn leave_project(&mut self, project_id: &str) {
        if self.current_project.as_deref() == Some(project_id) {
            self.current_project = None;
        }
    }

    pub fn handle(&mut self, frame: &EventFrame) -> Vec<AdapterAction> {
        if let Some(ServerEvent::Error(error)) = frame.to_server_event() {
            return self.handle_error(error.code, error.message, error.room_id, error.fatal);
        }
        self.consecutive_rate_limits = 0;

        if let Ok(event) = frame.event.parse::<DomainEvent>() {
            return self.handle_domain_event(event, frame);
        }

        match frame.to_server_event() {
            Some(ServerEvent::RoomJoined(joined)) if !joined.room_id.starts_with("user:") => {
                self.current_project = Some(joined.room_id);
                Vec::new()
            }
            _ if frame.event == "notification" => {
                vec![AdapterAction::Notify(frame.data.to_string())]
            }
            _ => Vec::new(),
        }
    }

    fn handle_domain_event(&self, event: DomainEvent, frame: &EventFrame) -> Vec<AdapterAction> {
        let project_id = frame.data.get("projectId").and_then(|value| value.as_str());
        match (project_id, self.current_project.as_deref()) {
            (Some(project_id), Some(current)) if project_id == current => {
                vec![AdapterAction::Invalidate {
                    project_id: project_id.to_string(),
                    category: event.resource.into(),
                }]
            }
            _ => Vec::new(),
        }
    }

    fn handle_error(
        &mut self,
        code: String,
        message: String,
        room_id: Option<String>,
        fatal: bool,
    ) -> Vec<AdapterAction> {
        if code == "rate-limited" {
            self.consecutive_rate_limits = self.consecutive_rate_limits.saturating_add(1);
            let mut actions = vec![AdapterAction::BackOff];
            if self.consecutive_rate_limits == self.persistent_threshold {
                actions.push(AdapterAction::Notify(message));
            }
            return actions;
        }
        self.consecutive_rate_limits = 0;

        if fatal {
            self.current_project = None;
            return vec![AdapterAction::Reauthenticate {
                code,
                reason: message,
            }];
        }

        match room_id {
            Some(room_id)
                if code == "access-revoked" && self.current_project.as_ref() == Some(&room_id) =>
            {
                self.current_project = None;
                vec![AdapterAction::LeaveProjectView {
                    project_id: room_id,
                }]
            }
            _ => vec![AdapterAction::Notify(message)],
        }
    }
}

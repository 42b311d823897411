//! Diagnostic events for non-fatal failures and render callbacks
//!
//! Events are reported, logged and handed to an optional host hook. They
//! never feed back into document state.

use serde::{Deserialize, Serialize};

use crate::doc::NodeId;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Something worth telling the host about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub level: DiagnosticLevel,
    pub message: String,
    /// Component that raised the event (e.g. "resolve", "ingest", "render")
    pub source: String,
}

impl DiagnosticEvent {
    pub fn new(
        level: DiagnosticLevel,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn info(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, message, source)
    }

    pub fn warning(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, message, source)
    }

    pub fn error(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, message, source)
    }

    /// Forward to the `log` facade at the matching level
    pub fn log(&self) {
        match self.level {
            DiagnosticLevel::Info => log::info!("[{}] {}", self.source, self.message),
            DiagnosticLevel::Warning => log::warn!("[{}] {}", self.source, self.message),
            DiagnosticLevel::Error => log::error!("[{}] {}", self.source, self.message),
        }
    }
}

/// Load/error callbacks from a rendered element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Loaded { node: NodeId },
    Failed { node: NodeId, reason: String },
}

impl From<&RenderEvent> for DiagnosticEvent {
    fn from(event: &RenderEvent) -> Self {
        match event {
            RenderEvent::Loaded { node } => {
                DiagnosticEvent::info(format!("image {} loaded", node), "render")
            }
            RenderEvent::Failed { node, reason } => {
                DiagnosticEvent::warning(format!("image {} failed to load: {}", node, reason), "render")
            }
        }
    }
}

/// Host callback for diagnostic events
pub trait DiagnosticHook: Send {
    fn on_event(&mut self, event: &DiagnosticEvent);
}

impl<F: FnMut(&DiagnosticEvent) + Send> DiagnosticHook for F {
    fn on_event(&mut self, event: &DiagnosticEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_warning() {
        let event = DiagnosticEvent::warning("Test warning", "test");
        assert_eq!(event.level, DiagnosticLevel::Warning);
        assert_eq!(event.message, "Test warning");
        assert_eq!(event.source, "test");
    }

    #[test]
    fn test_create_info() {
        let event = DiagnosticEvent::info("Test info", "test");
        assert_eq!(event.level, DiagnosticLevel::Info);
    }

    #[test]
    fn test_create_error() {
        let event = DiagnosticEvent::error("Test error", "test");
        assert_eq!(event.level, DiagnosticLevel::Error);
    }

    #[test]
    fn test_render_event_conversion() {
        let loaded = DiagnosticEvent::from(&RenderEvent::Loaded { node: NodeId(3) });
        assert_eq!(loaded.level, DiagnosticLevel::Info);
        assert_eq!(loaded.source, "render");

        let failed = DiagnosticEvent::from(&RenderEvent::Failed {
            node: NodeId(3),
            reason: "broken".into(),
        });
        assert_eq!(failed.level, DiagnosticLevel::Warning);
        assert!(failed.message.contains("#3"));
        assert!(failed.message.contains("broken"));
    }

    #[test]
    fn test_closure_hook() {
        let mut seen = Vec::new();
        {
            let mut hook = |e: &DiagnosticEvent| seen.push(e.message.clone());
            hook.on_event(&DiagnosticEvent::info("hello", "test"));
        }
        assert_eq!(seen, ["hello"]);
    }
}

//! Tracing layer that feeds orchestration events to a front end.
//!
//! Only events from the application's own crates (`fiesta*` targets) are
//! forwarded; transport and adapter logs never carry credentials.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const TARGET_PREFIX: &str = "fiesta";

/// One log event as seen by the front end.
#[derive(Debug, Clone, Serialize)]
pub struct TurnEvent {
    /// Event target (e.g., "fiesta_application::orchestrator")
    pub target: String,
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    /// Bracketed component prefix of the message, e.g. "Orchestrator"
    pub component: Option<String>,
    /// Message with the component prefix stripped
    pub message: String,
    /// Structured fields other than the message
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

/// Sends every `fiesta*` event to an unbounded channel.
pub struct TurnEventLayer {
    sender: mpsc::UnboundedSender<TurnEvent>,
}

impl TurnEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<TurnEvent>) -> Self {
        Self { sender }
    }

    /// Layer plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TurnEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for TurnEventLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with(TARGET_PREFIX) || self.sender.is_closed() {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        let raw = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let (component, message) = split_component(&raw);

        let turn_event = TurnEvent {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            component,
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is listening any more.
        let _ = self.sender.send(turn_event);
    }
}

/// Splits "[Component] rest" into its parts.
fn split_component(message: &str) -> (Option<String>, String) {
    message
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .map(|(component, rest)| (Some(component.to_string()), rest.trim_start().to_string()))
        .unwrap_or_else(|| (None, message.to_string()))
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}

//! Terminal rendering of settled turns.

use colored::Colorize;
use fiesta_application::{PaneStatus, TurnReport};
use fiesta_core::{Message, ModelCatalog, ModelKind};

/// Formats every pane's reply for the turn in `report`.
///
/// `log` is a snapshot taken after the turn settled; the latest message of
/// each pane is its reply to this turn.
pub fn render_turn(report: &TurnReport, log: &[Message], code: &str, catalog: &ModelCatalog) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let title = catalog
            .get(&outcome.pane_id)
            .map(|m| m.display_name.as_str())
            .unwrap_or(&outcome.pane_id);
        out.push_str(&format!("{}\n", format!("[{title}]").bright_magenta()));

        let body = match outcome.kind {
            ModelKind::Code => code.to_string(),
            _ => latest_reply(log, &outcome.pane_id)
                .map(describe_message)
                .unwrap_or_default(),
        };

        match &outcome.status {
            PaneStatus::Cancelled => out.push_str(&format!("{}\n", "(cancelled)".bright_black())),
            PaneStatus::Failed(_) => {
                for line in body.lines() {
                    out.push_str(&format!("{}\n", line.red()));
                }
            }
            PaneStatus::Succeeded => {
                for line in body.lines() {
                    out.push_str(&format!("{}\n", line.bright_blue()));
                }
            }
        }
        out.push('\n');
    }
    out
}

fn latest_reply<'a>(log: &'a [Message], pane_id: &str) -> Option<&'a Message> {
    log.iter().rev().find(|m| m.sender.is_pane(pane_id))
}

fn describe_message(message: &Message) -> String {
    match &message.image {
        Some(image) => format!(
            "{} ({}, {} bytes)",
            message.text,
            image.mime_type,
            image.decode().map(|bytes| bytes.len()).unwrap_or_default()
        ),
        None => message.text.clone(),
    }
}

/// One line per message, for replaying a pane's history.
pub fn render_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            if m.sender.is_user() {
                format!("> {}", m.text).green().to_string()
            } else {
                describe_message(m)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

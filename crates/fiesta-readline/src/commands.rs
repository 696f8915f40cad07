//! REPL input parsing.

use fiesta_core::Provider;
use std::path::PathBuf;

/// Slash commands offered for completion and hints.
pub const COMMANDS: &[&str] = &[
    "/add", "/remove", "/panes", "/history", "/models", "/web", "/image", "/code", "/key",
    "/cancel", "/help",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: submit it as a turn.
    Prompt(String),
    Add(String),
    Remove(String),
    Panes,
    /// Show one pane's thread.
    History(String),
    Models,
    /// `None` toggles.
    Web(Option<bool>),
    /// Attach an image to the next prompt; `None` clears the attachment.
    Image(Option<PathBuf>),
    Code,
    Key { provider: Provider, key: String },
    Cancel,
    Help,
    Quit,
    /// Recognised command used wrongly; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line == "quit" || line == "exit" {
            return Command::Quit;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Prompt(line.to_string());
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match (name, args.as_slice()) {
            ("add", [model]) => Command::Add(model.to_string()),
            ("add", _) => Command::Usage("/add <model-id>"),
            ("remove", [pane]) => Command::Remove(pane.to_string()),
            ("remove", _) => Command::Usage("/remove <pane-id>"),
            ("panes", []) => Command::Panes,
            ("history", [pane]) => Command::History(pane.to_string()),
            ("history", _) => Command::Usage("/history <pane-id>"),
            ("models", []) => Command::Models,
            ("web", []) => Command::Web(None),
            ("web", ["on"]) => Command::Web(Some(true)),
            ("web", ["off"]) => Command::Web(Some(false)),
            ("web", _) => Command::Usage("/web [on|off]"),
            ("image", []) => Command::Image(None),
            ("image", _) => Command::Image(Some(PathBuf::from(rest["image".len()..].trim()))),
            ("code", []) => Command::Code,
            ("key", [provider, key]) => match parse_provider(provider) {
                Some(provider) => Command::Key {
                    provider,
                    key: key.to_string(),
                },
                None => Command::Usage("/key <gemini|openrouter> <api-key>"),
            },
            ("key", _) => Command::Usage("/key <gemini|openrouter> <api-key>"),
            ("cancel", []) => Command::Cancel,
            ("help", _) => Command::Help,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

fn parse_provider(name: &str) -> Option<Provider> {
    match name.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some(Provider::Google),
        "openrouter" | "open_router" => Some(Provider::OpenRouter),
        _ => None,
    }
}

pub fn help_text() -> &'static str {
    "\
  <text>                      send a prompt to every active pane
  /add <model-id>             open a pane (see /models)
  /remove <pane-id>           close a pane and drop its history
  /panes                      list active panes
  /history <pane-id>          show a pane's conversation
  /models                     list available models
  /web [on|off]               toggle web search tagging
  /image [path]               attach an image to the next prompt (no path clears it)
  /code                       show the code playground
  /key <provider> <api-key>   set an API key for this session
  /cancel                     cancel the running turn
  quit                        exit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_prompt() {
        assert_eq!(
            Command::parse("  Hello there  "),
            Command::Prompt("Hello there".to_string())
        );
        assert_eq!(Command::parse("exit"), Command::Quit);
    }

    #[test]
    fn test_pane_commands() {
        assert_eq!(Command::parse("/add qwen-7b"), Command::Add("qwen-7b".into()));
        assert_eq!(Command::parse("/remove qwen-7b"), Command::Remove("qwen-7b".into()));
        assert!(matches!(Command::parse("/add"), Command::Usage(_)));
        assert!(matches!(Command::parse("/add a b"), Command::Usage(_)));
        assert_eq!(Command::parse("/panes"), Command::Panes);
        assert_eq!(
            Command::parse("/history imagen-gen"),
            Command::History("imagen-gen".into())
        );
    }

    #[test]
    fn test_web_toggle() {
        assert_eq!(Command::parse("/web"), Command::Web(None));
        assert_eq!(Command::parse("/web on"), Command::Web(Some(true)));
        assert_eq!(Command::parse("/web off"), Command::Web(Some(false)));
        assert!(matches!(Command::parse("/web maybe"), Command::Usage(_)));
    }

    #[test]
    fn test_image_path_keeps_spaces() {
        assert_eq!(
            Command::parse("/image /tmp/my cat.png"),
            Command::Image(Some(PathBuf::from("/tmp/my cat.png")))
        );
        assert_eq!(Command::parse("/image"), Command::Image(None));
    }

    #[test]
    fn test_key_command() {
        assert_eq!(
            Command::parse("/key Gemini abc123"),
            Command::Key {
                provider: Provider::Google,
                key: "abc123".into()
            }
        );
        assert_eq!(
            Command::parse("/key openrouter sk-or"),
            Command::Key {
                provider: Provider::OpenRouter,
                key: "sk-or".into()
            }
        );
        assert!(matches!(Command::parse("/key anthropic x"), Command::Usage(_)));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse("/frobnicate"),
            Command::Unknown("/frobnicate".into())
        );
    }
}

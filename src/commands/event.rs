use rust_i18n::t;

/// Messages starting with this (any case) are event commands
pub const COMMAND_PREFIX: &str = "event:";

/// Title and date text pulled out of `Event: <title> | <when>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub title: String,
    pub raw_date_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParse {
    /// Not meant for us; stay quiet
    NotACommand,
    /// Has the prefix but not the `title | when` shape
    Malformed,
    Command(ParsedCommand),
}

/// Split a chat message into an event command
pub fn parse_command(body: &str) -> CommandParse {
    let body = body.trim_start();

    let is_command = body
        .get(..COMMAND_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(COMMAND_PREFIX));
    if !is_command {
        return CommandParse::NotACommand;
    }

    let Some((title, when)) = body[COMMAND_PREFIX.len()..].split_once('|') else {
        return CommandParse::Malformed;
    };

    let (title, when) = (title.trim(), when.trim());
    if title.is_empty() || when.is_empty() {
        return CommandParse::Malformed;
    }

    CommandParse::Command(ParsedCommand {
        title: title.to_string(),
        raw_date_time: when.to_string(),
    })
}

/// Reply for a created event
pub fn created_reply(link: &str) -> String {
    t!("event_created", link = link).to_string()
}

/// Reply for a command without `title | when`
pub fn format_error_reply() -> String {
    t!("event_format_error").to_string()
}

/// Reply for a date that could not be understood
pub fn date_error_reply() -> String {
    t!("event_date_error").to_string()
}

/// Reply when anything after parsing fails; never carries error details
pub fn create_failed_reply() -> String {
    t!("event_create_failed").to_string()
}

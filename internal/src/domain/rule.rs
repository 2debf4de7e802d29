use crate::domain::{
    command::{INT_MSG, ParsedCommand, STRING_MSG, TASK, Task},
    error::DispatchError,
    render::RenderAction,
};

pub type RuleMatch = Result<RenderAction, DispatchError>;

/// One entry of the render precedence table. `select` yields `None` when the
/// field is absent so evaluation moves on to the next rule.
pub struct RenderRule {
    pub field: &'static str,
    pub select: fn(&ParsedCommand) -> Option<RuleMatch>,
}

/// Evaluated top to bottom, the first match is the only render of a message.
pub const RENDER_RULES: [RenderRule; 3] = [
    RenderRule {
        field: STRING_MSG,
        select: select_string_msg,
    },
    RenderRule {
        field: INT_MSG,
        select: select_int_msg,
    },
    RenderRule {
        field: TASK,
        select: select_task,
    },
];

/// Picks the render action of a command, along with the field it came from.
pub fn select_render(command: &ParsedCommand) -> Option<(&'static str, RuleMatch)> {
    RENDER_RULES
        .iter()
        .find_map(|rule| (rule.select)(command).map(|matched| (rule.field, matched)))
}

/// Render fields present in the command that lose against `winner`.
pub fn shadowed_by(command: &ParsedCommand, winner: &str) -> Vec<&'static str> {
    RENDER_RULES
        .iter()
        .skip_while(|rule| rule.field != winner)
        .skip(1)
        .filter(|rule| (rule.select)(command).is_some())
        .map(|rule| rule.field)
        .collect()
}

fn select_string_msg(command: &ParsedCommand) -> Option<RuleMatch> {
    command.string_msg.clone().map(|text| Ok(RenderAction::Text(text)))
}

fn select_int_msg(command: &ParsedCommand) -> Option<RuleMatch> {
    command.int_msg.map(|value| Ok(RenderAction::Integer(value)))
}

fn select_task(command: &ParsedCommand) -> Option<RuleMatch> {
    command.task.as_deref().map(|raw| {
        Task::from_name(raw)
            .map(RenderAction::Task)
            .ok_or_else(|| DispatchError::UnsupportedTask(raw.to_string()))
    })
}

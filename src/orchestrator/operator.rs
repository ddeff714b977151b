//! 操作员命令

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Status,
    Pause,
    Resume,
    Kill,
}

impl FromStr for OperatorCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "status" | "s" => Ok(OperatorCommand::Status),
            "pause" | "p" => Ok(OperatorCommand::Pause),
            "resume" | "r" => Ok(OperatorCommand::Resume),
            "kill" | "k" | "stop" => Ok(OperatorCommand::Kill),
            other => Err(format!("未知命令: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!("  Pause\n".parse(), Ok(OperatorCommand::Pause));
        assert_eq!("r".parse(), Ok(OperatorCommand::Resume));
        assert_eq!("stop".parse(), Ok(OperatorCommand::Kill));
        assert!("restart".parse::<OperatorCommand>().is_err());
    }
}

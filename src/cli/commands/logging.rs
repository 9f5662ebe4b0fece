use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names indexed by verbosity count.
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name (any case) or its index in [`LEVELS`].
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> std::result::Result<u8, String> {
        let index = level
            .parse::<usize>()
            .ok()
            .filter(|index| *index < LEVELS.len())
            .or_else(|| LEVELS.iter().position(|name| name.eq_ignore_ascii_case(level)));

        index
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level, expected one of: {}", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("TOKENPAIR_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(level: &str) -> Option<u8> {
        Command::new("test")
            .arg(Arg::new("level").long("level").value_parser(validator_log_level()))
            .try_get_matches_from(["test", "--level", level])
            .ok()
            .and_then(|matches| matches.get_one::<u8>("level").copied())
    }

    #[test]
    fn names_and_indexes_map_to_the_same_count() {
        for (index, name) in LEVELS.iter().enumerate() {
            let expected = u8::try_from(index).ok();
            assert_eq!(parse(name), expected);
            assert_eq!(parse(&name.to_uppercase()), expected);
            assert_eq!(parse(&index.to_string()), expected);
        }
    }

    #[test]
    fn unknown_levels_are_rejected() {
        for level in ["5", "verbose", ""] {
            assert_eq!(parse(level), None);
        }
    }
}

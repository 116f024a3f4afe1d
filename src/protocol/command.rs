//! Client line parsing.
//!
//! A line starting with `!` is a command: the first whitespace run splits it
//! into a verb and an args remainder. Verbs are case-folded to lower; args
//! are forwarded verbatim so credentials and chat text keep their casing and
//! inner spacing. Anything else is free chat text.

/// A parsed client line.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// A `!`-prefixed command. `verb` is lowercased with the `!` stripped.
    Command { verb: String, args: &'a str },
    /// Free chat text.
    Chat(&'a str),
}

/// Splits a line into a command or chat text.
pub fn parse(line: &str) -> Input<'_> {
    let Some(rest) = line.strip_prefix('!') else {
        return Input::Chat(line);
    };
    let (verb, args) = match rest.split_once(char::is_whitespace) {
        Some((verb, args)) => (verb, args.trim_start()),
        None => (rest, ""),
    };
    Input::Command {
        verb: verb.to_ascii_lowercase(),
        args,
    }
}

/// Splits `!login`/`!register` args into (username, password).
///
/// The username is the first token; everything after the whitespace run is
/// the password, verbatim. Returns `None` when either part is missing.
pub fn parse_credentials(args: &str) -> Option<(&str, &str)> {
    let (user, pass) = args.split_once(char::is_whitespace)?;
    let pass = pass.trim_start();
    if user.is_empty() || pass.is_empty() {
        return None;
    }
    Some((user, pass))
}

/// Whisper argument errors.
#[derive(Debug, PartialEq, Eq)]
pub enum WhisperError {
    MissingTarget,
    MissingClosingQuote,
    EmptyMessage,
}

impl std::fmt::Display for WhisperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhisperError::MissingTarget => write!(f, "no whisper target given"),
            WhisperError::MissingClosingQuote => write!(f, "missing closing quote"),
            WhisperError::EmptyMessage => write!(f, "whisper message is empty"),
        }
    }
}

/// Splits `!whisper` args into (target, message).
///
/// The target is either a bare word or a double-quoted name; the message is
/// the remainder with the separating whitespace dropped.
pub fn parse_whisper(args: &str) -> Result<(&str, &str), WhisperError> {
    if let Some(rest) = args.strip_prefix('"') {
        let (target, after) = rest
            .split_once('"')
            .ok_or(WhisperError::MissingClosingQuote)?;
        if target.is_empty() {
            return Err(WhisperError::MissingTarget);
        }
        let message = after.trim_start();
        if message.is_empty() {
            return Err(WhisperError::EmptyMessage);
        }
        return Ok((target, message));
    }

    if args.is_empty() {
        return Err(WhisperError::MissingTarget);
    }
    let (target, message) = args
        .split_once(char::is_whitespace)
        .ok_or(WhisperError::EmptyMessage)?;
    let message = message.trim_start();
    if message.is_empty() {
        return Err(WhisperError::EmptyMessage);
    }
    Ok((target, message))
}

/// Parses `!roll` args: empty means the default six-sided die, otherwise a
/// whole number of at least 1. Returns `None` for anything else.
pub fn parse_roll(args: &str) -> Option<u32> {
    let args = args.trim();
    if args.is_empty() {
        return Some(6);
    }
    match args.parse::<u32>() {
        Ok(max) if max >= 1 => Some(max),
        _ => None,
    }
}

//! Key scripts for the simulator.
//!
//! One step per line. A `#` at the start of a line or after whitespace starts
//! a comment, so `type a#b` keeps its `#`:
//!
//! ```text
//! down LSFT
//! tap A
//! up LSFT
//! media E9        # volume up, "media off" releases
//! wait 600
//! cmd ED 02       # SET_LEDS num lock
//! mode ps2
//! type Hello, world
//! ```

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::device::keycodes;
use crate::mode::Mode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Down(u16),
    Up(u16),
    Tap(u16),
    /// Consumer usage; 0 releases.
    Media(u16),
    Wait(u32),
    Command(Vec<u8>),
    Mode(Mode),
    Type(String),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown step {step:?}")]
    UnknownStep { line: usize, step: String },
    #[error("line {line}: {step} needs an argument")]
    MissingArgument { line: usize, step: &'static str },
    #[error("line {line}: unknown key {name:?}")]
    UnknownKey { line: usize, name: String },
    #[error("line {line}: bad number {value:?}")]
    BadNumber { line: usize, value: String },
    #[error("line {line}: mode must be usb or ps2, got {value:?}")]
    BadMode { line: usize, value: String },
    #[error("line {line}: no key types {ch:?}")]
    Untypeable { line: usize, ch: char },
    #[error("reading script")]
    Io(#[from] std::io::Error),
}

pub fn load_script(path: impl AsRef<Path>) -> Result<Vec<Step>, ScriptError> {
    parse_script(&fs::read_to_string(path)?)
}

pub fn parse_script(text: &str) -> Result<Vec<Step>, ScriptError> {
    let mut steps = vec![];
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = strip_comment(raw).trim();
        if content.is_empty() {
            continue;
        }
        let (word, rest) = match content.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (content, ""),
        };
        steps.push(parse_step(line, word, rest)?);
    }
    Ok(steps)
}

fn strip_comment(raw: &str) -> &str {
    let mut after_blank = true;
    for (at, ch) in raw.char_indices() {
        if ch == '#' && after_blank {
            return &raw[..at];
        }
        after_blank = ch.is_whitespace();
    }
    raw
}

fn parse_step(line: usize, word: &str, rest: &str) -> Result<Step, ScriptError> {
    let step = match word.to_ascii_lowercase().as_str() {
        "down" => Step::Down(key(line, "down", rest)?),
        "up" => Step::Up(key(line, "up", rest)?),
        "tap" => Step::Tap(key(line, "tap", rest)?),
        "media" => match argument(line, "media", rest)? {
            off if off.eq_ignore_ascii_case("off") => Step::Media(0),
            usage => Step::Media(hex_u16(line, usage)?),
        },
        "wait" => {
            let value = argument(line, "wait", rest)?;
            Step::Wait(value.parse().map_err(|_| ScriptError::BadNumber {
                line,
                value: value.to_string(),
            })?)
        }
        "cmd" => {
            argument(line, "cmd", rest)?;
            let bytes = rest
                .split_whitespace()
                .map(|b| hex_u8(line, b))
                .collect::<Result<_, _>>()?;
            Step::Command(bytes)
        }
        "mode" => match argument(line, "mode", rest)?.to_ascii_lowercase().as_str() {
            "usb" => Step::Mode(Mode::Usb),
            "ps2" => Step::Mode(Mode::Ps2),
            _ => {
                return Err(ScriptError::BadMode {
                    line,
                    value: rest.to_string(),
                });
            }
        },
        "type" => {
            let text = argument(line, "type", rest)?;
            if let Some(ch) = text.chars().find(|&c| keycodes::for_char(c).is_none()) {
                return Err(ScriptError::Untypeable { line, ch });
            }
            Step::Type(text.to_string())
        }
        _ => {
            return Err(ScriptError::UnknownStep {
                line,
                step: word.to_string(),
            });
        }
    };
    Ok(step)
}

fn argument<'a>(line: usize, step: &'static str, rest: &'a str) -> Result<&'a str, ScriptError> {
    if rest.is_empty() {
        Err(ScriptError::MissingArgument { line, step })
    } else {
        Ok(rest)
    }
}

fn key(line: usize, step: &'static str, rest: &str) -> Result<u16, ScriptError> {
    let name = argument(line, step, rest)?;
    keycodes::by_name(name).ok_or_else(|| ScriptError::UnknownKey {
        line,
        name: name.to_string(),
    })
}

fn hex_u16(line: usize, value: &str) -> Result<u16, ScriptError> {
    let digits = value.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|_| ScriptError::BadNumber {
        line,
        value: value.to_string(),
    })
}

fn hex_u8(line: usize, value: &str) -> Result<u8, ScriptError> {
    let wide = hex_u16(line, value)?;
    u8::try_from(wide).map_err(|_| ScriptError::BadNumber {
        line,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::keycodes::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_parse_all_steps() {
        let steps = parse_script(
            "# demo\n\
             down lsft\n\
             tap A   # comment\n\
             up KC_LSFT\n\
             \n\
             media e9\n\
             media off\n\
             wait 600\n\
             cmd ED 0x02\n\
             mode PS2\n\
             type Hi there\n",
        )
        .unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Down(KC_LSFT),
                Step::Tap(KC_A),
                Step::Up(KC_LSFT),
                Step::Media(0xE9),
                Step::Media(0),
                Step::Wait(600),
                Step::Command(vec![0xED, 0x02]),
                Step::Mode(Mode::Ps2),
                Step::Type("Hi there".to_string()),
            ]
        );
    }

    #[rstest]
    #[case("type a#b", Step::Type("a#b".to_string()))]
    #[case("type a #b", Step::Type("a".to_string()))]
    #[case("#tap A\ntap B", Step::Tap(KC_B))]
    #[case("tap 3\t# three", Step::Tap(KC_3))]
    fn test_comments(#[case] text: &str, #[case] step: Step) {
        assert_eq!(parse_script(text).unwrap(), vec![step]);
    }

    #[rstest]
    #[case("jump A", "line 1: unknown step \"jump\"")]
    #[case("tap", "line 1: tap needs an argument")]
    #[case("\ntap NOPE", "line 2: unknown key \"NOPE\"")]
    #[case("wait soon", "line 1: bad number \"soon\"")]
    #[case("cmd ED 1FF", "line 1: bad number \"1FF\"")]
    #[case("mode serial", "line 1: mode must be usb or ps2, got \"serial\"")]
    #[case("type caf\u{e9}", "line 1: no key types '\u{e9}'")]
    fn test_errors(#[case] text: &str, #[case] message: &str) {
        let err = parse_script(text).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tap ENTER").unwrap();
        writeln!(file, "wait 10").unwrap();
        let steps = load_script(file.path()).unwrap();
        assert_eq!(steps, vec![Step::Tap(KC_ENTER), Step::Wait(10)]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_script(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ScriptError::Io(_)));
    }
}

//! # Script interpreter module
//!
//! This module provides an interpreter for timed scripts, allowing pre-recorded commands (for
//! example operator inputs) to be replayed into an executable.
//!
//! A script is made of entries of the form `<time_s>: <json payload>;`. Anything which doesn't
//! match this form, such as comment lines, is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Internal
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
struct Command<T> {
    /// The time the command is supposed to execute at
    exec_time_s: f64,

    /// The payload to execute
    payload: T,
}

/// A script interpreter.
///
/// After initialising with the script to run use `.get_pending` to acquire a list of payloads
/// that need executing.
pub struct ScriptInterpreter<T> {
    cmds: VecDeque<Command<T>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid payload at {0} s: {1}")]
    InvalidPayload(f64, serde_json::Error),
}

/// The result of polling the interpreter.
#[derive(Debug, PartialEq)]
pub enum Pending<T> {
    /// Nothing is due yet
    None,

    /// These payloads are due, in script order
    Some(Vec<T>),

    /// Every payload in the script has been returned
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> ScriptInterpreter<T>
where
    T: DeserializeOwned,
{
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = script_path.as_ref();

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        let script = fs::read_to_string(path).map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        let mut queue: VecDeque<Command<T>> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // The regex only matches unsigned decimals, which always parse
            let exec_time_s: f64 = cap[1]
                .parse()
                .expect("Script timestamp regex matched an invalid float");

            let payload = serde_json::from_str(&cap[3])
                .map_err(|e| ScriptError::InvalidPayload(exec_time_s, e))?;

            queue.push_back(Command {
                exec_time_s,
                payload,
            });
        }

        if queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter { cmds: queue })
    }
}

impl<T> ScriptInterpreter<T> {
    /// Return the payloads which are due at the current session time.
    pub fn get_pending(&mut self) -> Pending<T> {
        self.get_pending_at(get_elapsed_seconds())
    }

    /// Return the payloads whose execution time is at or before `current_time_s`.
    pub fn get_pending_at(&mut self, current_time_s: f64) -> Pending<T> {
        if self.cmds.is_empty() {
            return Pending::EndOfScript;
        }

        let mut due = vec![];

        while let Some(cmd) = self.cmds.front() {
            if cmd.exec_time_s > current_time_s {
                break;
            }
            if let Some(cmd) = self.cmds.pop_front() {
                due.push(cmd.payload);
            }
        }

        if due.is_empty() {
            Pending::None
        } else {
            Pending::Some(due)
        }
    }

    /// Get the number of payloads left in the script
    pub fn get_num_pending(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Input {
        x: f64,
    }

    const SCRIPT: &str = "\
        # Centre, then full right
        0.0: {\"x\": 0.0};
        1.0: {\"x\": 0.5};
        1.5: {\"x\": 1.0};
    ";

    #[test]
    fn test_pending_by_time() {
        let mut si: ScriptInterpreter<Input> = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_pending(), 3);
        assert_eq!(si.get_duration(), 1.5);

        assert_eq!(si.get_pending_at(0.0), Pending::Some(vec![Input { x: 0.0 }]));
        assert_eq!(si.get_pending_at(0.5), Pending::None);
        assert_eq!(
            si.get_pending_at(2.0),
            Pending::Some(vec![Input { x: 0.5 }, Input { x: 1.0 }])
        );
        assert_eq!(si.get_pending_at(3.0), Pending::EndOfScript);
    }

    #[test]
    fn test_unsupported_timestamps_ignored() {
        // Signed and exponent timestamps aren't entries, only the plain one is read
        let mut si: ScriptInterpreter<Input> = ScriptInterpreter::from_str(
            "-1.0: {\"x\": 1.0};\n1e2: {\"x\": 2.0};\n3.25: {\"x\": 3.0};",
        )
        .unwrap();

        assert_eq!(si.get_num_pending(), 1);
        assert_eq!(si.get_duration(), 3.25);
        assert_eq!(si.get_pending_at(4.0), Pending::Some(vec![Input { x: 3.0 }]));
    }

    #[test]
    fn test_empty_script() {
        let r: Result<ScriptInterpreter<Input>, _> = ScriptInterpreter::from_str("# nothing\n");

        assert!(matches!(r, Err(ScriptError::ScriptEmpty)));
    }

    #[test]
    fn test_invalid_payload() {
        let r: Result<ScriptInterpreter<Input>, _> =
            ScriptInterpreter::from_str("2.0: {\"y\": true};");

        assert!(matches!(r, Err(ScriptError::InvalidPayload(t, _)) if t == 2.0));
    }
}

//! # Motion script interpreter module
//!
//! This module provides an interpreter for motion scripts, allowing timed motion commands to be
//! fed into the motion core from a file. A script is a list of lines of the form
//!
//! ```text
//! 0.5: {"type": "WALK", "direction": "forward"};
//! 7.0: {"type": "STOP"};
//! ```
//!
//! where the number is the time in seconds, relative to the start of the script, at which the
//! command is issued.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::cmd::MotionCmd;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug, Clone)]
pub struct ScriptedCmd {
    /// The time the command is supposed to execute at
    pub exec_time_s: f64,

    /// The command to issue
    pub cmd: MotionCmd,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending_cmds` to acquire a
/// list of commands that need issuing.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: Option<PathBuf>,
    cmds: VecDeque<ScriptedCmd>,
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

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCmd(f64, serde_json::Error),

    #[error("Script timestamps must not decrease, found {1} s after {0} s")]
    OutOfOrder(f64, f64),
}

#[derive(Debug)]
pub enum PendingCmds {
    None,
    Some(Vec<MotionCmd>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_str(&script)?;
        si.script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {
        // Empty queue of commands
        let mut cmd_queue: VecDeque<ScriptedCmd> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("Script regex is invalid");

        for cap in re.captures_iter(script) {
            // Both groups are mandatory in the regex so will always be present
            let time_str = cap.get(1).map_or("", |m| m.as_str());
            let cmd_str = cap.get(3).map_or("", |m| m.as_str());

            // Parse the exec time
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            if let Some(prev) = cmd_queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(prev.exec_time_s, exec_time_s));
                }
            }

            // Parse the command from the payload. The scripts contain JSON only.
            let cmd = MotionCmd::from_json(cmd_str)
                .map_err(|e| ScriptError::InvalidCmd(exec_time_s, e))?;

            cmd_queue.push_back(ScriptedCmd { exec_time_s, cmd });
        }

        if cmd_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            script_path: None,
            cmds: cmd_queue,
        })
    }

    /// Return a vector of commands due at or before `current_time_s`, measured from the start
    /// of the script.
    pub fn get_pending_cmds(&mut self, current_time_s: f64) -> PendingCmds {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.cmds.is_empty() {
            return PendingCmds::EndOfScript;
        }

        let mut cmd_vec: Vec<MotionCmd> = vec![];

        // Pop commands off the front of the queue while they are due
        while let Some(front) = self.cmds.front() {
            if front.exec_time_s > current_time_s {
                break;
            }
            if let Some(c) = self.cmds.pop_front() {
                cmd_vec.push(c.cmd);
            }
        }

        if cmd_vec.is_empty() {
            PendingCmds::None
        } else {
            PendingCmds::Some(cmd_vec)
        }
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }

    /// Path the script was loaded from, if it came from a file.
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::cmd::WalkDir;

    const SCRIPT: &str = r#"
        0.0: {"type": "FACE_TRACE"};
        1.5: {"type": "WALK", "direction": "forward"};
        1.5: {"type": "GESTURE", "name": "wave"};
        9.0: {"type": "STOP"};
    "#;

    #[test]
    fn test_script_timing() {
        let mut si = ScriptInterpreter::from_str(SCRIPT).unwrap();
        assert_eq!(si.get_num_cmds(), 4);
        assert_eq!(si.get_duration(), 9.0);

        match si.get_pending_cmds(0.1) {
            PendingCmds::Some(v) => assert_eq!(v, vec![MotionCmd::FaceTrace]),
            p => panic!("Expected one command, got {:?}", p),
        }

        match si.get_pending_cmds(1.0) {
            PendingCmds::None => (),
            p => panic!("Expected no commands, got {:?}", p),
        }

        match si.get_pending_cmds(2.0) {
            PendingCmds::Some(v) => {
                assert_eq!(v.len(), 2);
                assert_eq!(
                    v[0],
                    MotionCmd::Walk {
                        direction: WalkDir::Forward
                    }
                );
            }
            p => panic!("Expected two commands, got {:?}", p),
        }

        match si.get_pending_cmds(10.0) {
            PendingCmds::Some(v) => assert_eq!(v, vec![MotionCmd::Stop]),
            p => panic!("Expected the stop command, got {:?}", p),
        }

        match si.get_pending_cmds(11.0) {
            PendingCmds::EndOfScript => (),
            p => panic!("Expected end of script, got {:?}", p),
        }
    }

    #[test]
    fn test_script_errors() {
        match ScriptInterpreter::from_str("nothing to see here") {
            Err(ScriptError::ScriptEmpty) => (),
            r => panic!("Expected empty script error, got {:?}", r),
        }

        match ScriptInterpreter::from_str(r#"1.0: {"type": "FLY"};"#) {
            Err(ScriptError::InvalidCmd(t, _)) => assert_eq!(t, 1.0),
            r => panic!("Expected invalid command error, got {:?}", r),
        }

        match ScriptInterpreter::from_str("2.0: {\"type\": \"STOP\"};\n1.0: {\"type\": \"STOP\"};") {
            Err(ScriptError::OutOfOrder(a, b)) => assert_eq!((a, b), (2.0, 1.0)),
            r => panic!("Expected out of order error, got {:?}", r),
        }
    }
}

//! Invocation of the external `yolo` command line.
//!
//! Every toolkit operation is a single `yolo [task] <mode> key=value ...`
//! process run to completion with inherited stdio.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use skin_core::{Error, Result};

/// A fully assembled toolkit command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YoloCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl YoloCommand {
    /// `<program> classify <mode>`
    pub fn classify(program: &Path, mode: &str) -> Self {
        Self {
            program: program.to_path_buf(),
            args: vec!["classify".to_string(), mode.to_string()],
        }
    }

    /// `<program> <mode>` for task-independent modes such as `export`
    pub fn mode(program: &Path, mode: &str) -> Self {
        Self {
            program: program.to_path_buf(),
            args: vec![mode.to_string()],
        }
    }

    /// Appends `key=value`
    pub fn arg(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.args.push(format!("{}={}", key, value));
        self
    }

    /// Appends `key=True` / `key=False`
    pub fn flag(self, key: &str, value: bool) -> Self {
        self.arg(key, if value { "True" } else { "False" })
    }

    /// Appends `key=<path>`
    pub fn path(self, key: &str, value: &Path) -> Self {
        let value = value.display().to_string();
        self.arg(key, value)
    }

    /// Value of `key=` if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|a| {
            a.split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }
}

impl fmt::Display for YoloCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs toolkit commands
pub trait CommandRunner {
    fn run(&mut self, command: &YoloCommand) -> Result<()>;
}

impl<R: CommandRunner + ?Sized> CommandRunner for &mut R {
    fn run(&mut self, command: &YoloCommand) -> Result<()> {
        (**self).run(command)
    }
}

/// Runs commands as child processes, waiting for each to finish
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &YoloCommand) -> Result<()> {
        let program = command.program.display().to_string();
        tracing::debug!("Running: {}", command);

        let status = Command::new(&command.program)
            .args(&command.args)
            .status()
            .map_err(|e| Error::command(&program, format!("could not start: {}", e)))?;

        if !status.success() {
            return Err(Error::command(&program, format!("exited with {}", status)));
        }
        Ok(())
    }
}

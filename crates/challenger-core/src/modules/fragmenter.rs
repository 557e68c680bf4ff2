use super::traits::{Fragmenter, Structure};
use crate::domain::{ChallengerError, ChallengerResult, IonMode};
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

/// Runs an external fragmentation program once per (structure, adduct).
///
/// The program is called as `<program> <args...> --mode <mode> --smiles
/// <smiles>`, reads the filtered reaction database from stdin and prints the
/// predicted m/z values, whitespace separated, on stdout.
#[derive(Debug, Clone)]
pub struct CommandFragmenter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandFragmenter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn failure(&self, message: impl std::fmt::Display) -> ChallengerError {
        ChallengerError::computation(
            "RUN.FRAGMENTATION",
            format!("fragmenter '{}' {}", self.program.display(), message),
        )
    }
}

impl Fragmenter for CommandFragmenter {
    fn fragment(
        &self,
        structure: &Structure,
        database: &str,
        mode: IonMode,
    ) -> ChallengerResult<Vec<f64>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--mode")
            .arg(mode.as_str())
            .arg("--smiles")
            .arg(&structure.smiles)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| self.failure(format_args!("could not be started: {source}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure("did not expose stdin"))?;
        let (output, written) = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(database.as_bytes()));
            let output = child.wait_with_output();
            (output, writer.join())
        });
        let output =
            output.map_err(|source| self.failure(format_args!("did not complete: {source}")))?;
        check_stdin_write(written).map_err(|reason| self.failure(reason))?;

        if !output.status.success() {
            let status = output.status.code().map_or_else(
                || "terminated by signal".to_string(),
                |code| format!("exit code {code}"),
            );
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format_args!(
                "failed for '{}' ({status}): {}",
                structure.smiles,
                stderr.trim()
            )));
        }

        parse_masses(&String::from_utf8_lossy(&output.stdout))
            .map_err(|token| self.failure(format_args!("printed a non-numeric mass '{token}'")))
    }
}

/// A program that ignores its stdin closes the pipe early, which is not a
/// failure of the run. Any other write error is.
fn check_stdin_write(written: thread::Result<io::Result<()>>) -> Result<(), String> {
    match written {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) if source.kind() == ErrorKind::BrokenPipe => Ok(()),
        Ok(Err(source)) => Err(format!("could not receive the reaction database: {source}")),
        Err(_) => Err("stdin writer panicked".to_string()),
    }
}

fn parse_masses(stdout: &str) -> Result<Vec<f64>, String> {
    let mut masses = stdout
        .split_whitespace()
        .map(|token| token.parse::<f64>().map_err(|_| token.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    masses.sort_by(f64::total_cmp);
    Ok(masses)
}

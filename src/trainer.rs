// trainer.rs - External ranking-model trainer, invoked as an opaque subprocess
//
// Contract: `<executable> <options...> <training file> <model file>`.
// Success means a zero exit status and the model file existing afterwards.

use crate::errors::{LtrError, LtrResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TrainerInvocation {
    pub executable: PathBuf,
    /// Whitespace-separated options passed before the file arguments
    pub options: String,
    pub training_file: PathBuf,
    pub model_file: PathBuf,
}

impl TrainerInvocation {
    pub fn new(
        executable: impl Into<PathBuf>,
        options: impl Into<String>,
        training_file: impl Into<PathBuf>,
        model_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executable: executable.into(),
            options: options.into(),
            training_file: training_file.into(),
            model_file: model_file.into(),
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.options.split_whitespace().map(str::to_string).collect();
        args.push(self.training_file.to_string_lossy().into_owned());
        args.push(self.model_file.to_string_lossy().into_owned());
        args
    }

    /// Run the trainer to completion and return the trained model path.
    pub fn run(&self) -> LtrResult<&Path> {
        if !self.executable.is_file() {
            return Err(LtrError::trainer(format!(
                "no trainer found at {}",
                self.executable.display()
            )));
        }

        let args = self.args();
        info!(
            executable = %self.executable.display(),
            args = %args.join(" "),
            "running trainer"
        );

        let output = Command::new(&self.executable)
            .args(&args)
            .output()
            .map_err(|e| {
                LtrError::io(format!("spawning trainer {}", self.executable.display()), e)
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(stdout = %stdout, stderr = %stderr, "trainer finished");

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "termination by signal".to_string(),
            };
            return Err(LtrError::trainer(format!(
                "{} failed with {status}: {}",
                self.executable.display(),
                stderr.trim()
            )));
        }

        if !self.model_file.is_file() {
            return Err(LtrError::trainer(format!(
                "trainer exited successfully but produced no model at {}",
                self.model_file.display()
            )));
        }

        Ok(&self.model_file)
    }
}

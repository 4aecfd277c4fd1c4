//! Safety checks run before any object is deleted.
//!
//! Emptying a bucket is irreversible, so the default is to ask:
//! - Dry-run mode skips the prompt (deletions are only simulated)
//! - `--force` skips the prompt
//! - JSON logging or a non-interactive terminal refuses to run without `--force`
//! - Otherwise the user must type the bucket name exactly

use std::io::{BufRead, IsTerminal, Write};

use anyhow::{Result, anyhow};

use crate::config::Config;
use crate::types::error::S3nukeError;

/// Prompt I/O, behind a trait so tests never block on stdin.
pub trait PromptHandler: Send + Sync {
    /// Display the confirmation prompt for `bucket` and read one line.
    ///
    /// Returns the trimmed user input.
    fn read_confirmation(&self, bucket: &str) -> Result<String>;

    /// `true` if both stdin and stdout are connected to a TTY.
    fn is_interactive(&self) -> bool;
}

/// Default prompt handler using stdin/stdout.
pub struct StdioPromptHandler;

impl PromptHandler for StdioPromptHandler {
    fn read_confirmation(&self, bucket: &str) -> Result<String> {
        println!("WARNING: every object version and delete marker in s3://{bucket} will be deleted.");
        print!("Type the bucket name to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().lock().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }
}

pub struct SafetyChecker {
    bucket: String,
    dry_run: bool,
    force: bool,
    json_logging: bool,
    prompt_handler: Box<dyn PromptHandler>,
}

impl SafetyChecker {
    pub fn new(config: &Config) -> Self {
        Self::with_prompt_handler(config, Box::new(StdioPromptHandler))
    }

    pub fn with_prompt_handler(config: &Config, prompt_handler: Box<dyn PromptHandler>) -> Self {
        let json_logging = config
            .tracing_config
            .map(|tc| tc.json_tracing)
            .unwrap_or(false);

        Self {
            bucket: config.bucket.clone(),
            dry_run: config.dry_run,
            force: config.force,
            json_logging,
            prompt_handler,
        }
    }

    /// Check all safety preconditions.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the pipeline should proceed
    /// - `Err(S3nukeError::Cancelled)` if the confirmation did not match
    /// - `Err(S3nukeError::InvalidConfig)` if no confirmation is possible
    ///   and `--force` was not given
    pub fn check_before_deletion(&self) -> Result<()> {
        if self.dry_run || self.force {
            return Ok(());
        }

        if self.json_logging {
            return Err(anyhow!(S3nukeError::InvalidConfig(
                "cannot prompt for confirmation with JSON logging; pass --force".to_string()
            )));
        }

        if !self.prompt_handler.is_interactive() {
            return Err(anyhow!(S3nukeError::InvalidConfig(
                "cannot prompt for confirmation in a non-interactive session; pass --force"
                    .to_string()
            )));
        }

        self.prompt_confirmation()
    }

    fn prompt_confirmation(&self) -> Result<()> {
        let input = self.prompt_handler.read_confirmation(&self.bucket)?;

        if input != self.bucket {
            return Err(anyhow!(S3nukeError::Cancelled));
        }

        Ok(())
    }
}

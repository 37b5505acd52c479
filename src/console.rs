//! Operator prompts

use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Answers the workflow's questions to the operator
pub trait OperatorInput {
    fn prompt_for_id(&mut self) -> Result<u32, InputError>;
    fn confirm(&mut self, question: &str) -> Result<bool, InputError>;
}

/// Line-oriented prompts over any reader/writer pair
pub struct ConsoleInput<R, W> {
    reader: R,
    writer: W,
}

impl ConsoleInput<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn ask(&mut self, prompt: &str) -> Result<String, InputError> {
        write!(self.writer, "{}", prompt)?;
        self.writer.flush()?;
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(InputError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> OperatorInput for ConsoleInput<R, W> {
    fn prompt_for_id(&mut self) -> Result<u32, InputError> {
        loop {
            let answer = self.ask("Please enter the id of the CD to archive: ")?;
            match answer.parse::<u32>() {
                Ok(id) => return Ok(id),
                Err(_) => writeln!(self.writer, "{:?} is not a number.", answer)?,
            }
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool, InputError> {
        writeln!(self.writer, "{}", question)?;
        loop {
            let answer = self.ask("OK to archive? [Y/n] ")?;
            match answer.to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.writer, "Please answer y or n.")?,
            }
        }
    }
}

/// Accepts every confirmation; for unattended runs
pub struct AssumeYes<I>(pub I);

impl<I: OperatorInput> OperatorInput for AssumeYes<I> {
    fn prompt_for_id(&mut self) -> Result<u32, InputError> {
        self.0.prompt_for_id()
    }

    fn confirm(&mut self, question: &str) -> Result<bool, InputError> {
        tracing::info!("{} (assumed yes)", question);
        Ok(true)
    }
}

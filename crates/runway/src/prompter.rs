//! Terminal prompts backed by `inquire`

use inquire::error::InquireError;
use inquire::{Confirm, Password, PasswordDisplayMode, Select, Text};
use runway_core::{Prompter, ProvisionError};

pub struct InquirePrompter;

fn prompt_error(e: InquireError) -> ProvisionError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            ProvisionError::Prompt("cancelled by user".to_string())
        }
        other => ProvisionError::Prompt(other.to_string()),
    }
}

/// Text input with the suggestion already typed in, editable in place
fn text_prompt<'a>(message: &'a str, suggestion: Option<&'a str>) -> Text<'a> {
    let prompt = Text::new(message);
    match suggestion.filter(|s| !s.is_empty()) {
        Some(value) => prompt.with_initial_value(value),
        None => prompt,
    }
}

impl Prompter for InquirePrompter {
    fn select(&self, message: &str, options: &[String]) -> runway_core::Result<usize> {
        let choice = Select::new(message, options.to_vec())
            .raw_prompt()
            .map_err(prompt_error)?;
        Ok(choice.index)
    }

    fn text(&self, message: &str, default: Option<&str>) -> runway_core::Result<String> {
        text_prompt(message, default).prompt().map_err(prompt_error)
    }

    fn password(&self, message: &str) -> runway_core::Result<String> {
        Password::new(message)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(prompt_error)
    }

    fn confirm(&self, message: &str, default: bool) -> runway_core::Result<bool> {
        Confirm::new(message)
            .with_default(default)
            .prompt()
            .map_err(prompt_error)
    }
}

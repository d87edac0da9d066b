//! Operator prompts
//!
//! The pipeline never talks to the terminal directly. The binary supplies an
//! `inquire` backed implementation; tests supply scripted answers.

use crate::error::Result;

pub trait Prompter: Send + Sync {
    /// Choose one of `options`, returning its index
    fn select(&self, message: &str, options: &[String]) -> Result<usize>;

    /// Free text, pre-filled with `default` when given
    fn text(&self, message: &str, default: Option<&str>) -> Result<String>;

    /// Masked input
    fn password(&self, message: &str) -> Result<String>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

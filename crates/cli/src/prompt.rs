use anyhow::{Context, Result};
use dialoguer::{Input, Select};
use folder_dater_core::{parse_manual_date, MediaFile, MissingDatePolicy, Resolution};
use std::path::Path;

const CHOICES: &[&str] = &[
    "Skip this folder",
    "Ignore this file",
    "Enter a date manually",
    "Quit",
];

/// Asks on the terminal what to do with each file that has no embedded date.
#[derive(Debug, Default)]
pub struct TerminalPolicy;

impl MissingDatePolicy for TerminalPolicy {
    fn resolve(&mut self, file: &MediaFile, folder: &Path) -> Result<Resolution> {
        eprintln!();
        eprintln!("No date metadata found");
        eprintln!("  folder: {}", folder.display());
        eprintln!("  file:   {}", file.file_name());

        let choice = Select::new()
            .with_prompt("What should happen with this file?")
            .items(CHOICES)
            .default(0)
            .interact()
            .context("prompt failed")?;

        let resolution = match choice {
            0 => Resolution::SkipFolder,
            1 => Resolution::IgnoreFile,
            2 => Resolution::Manual(ask_date()?),
            _ => Resolution::Quit,
        };
        Ok(resolution)
    }
}

fn ask_date() -> Result<chrono::NaiveDate> {
    let raw: String = Input::new()
        .with_prompt("Date (YYYY-MM-DD)")
        .validate_with(|input: &String| -> Result<(), &str> {
            match parse_manual_date(input) {
                Some(_) => Ok(()),
                None => Err("expected a real date as YYYY-MM-DD"),
            }
        })
        .interact_text()
        .context("prompt failed")?;
    parse_manual_date(&raw).context("date rejected after validation")
}

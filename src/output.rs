use std::io::{self, Write};

use serde::Serialize;

use crate::folder::FolderReport;
use crate::migrate::{CleanReport, MigrationReport};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_migration(report: &MigrationReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_folder(report: &FolderReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_clean(report: &CleanReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn render<T: Serialize>(value: &T) -> io::Result<String> {
        serde_json::to_string_pretty(value).map_err(io::Error::other)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = Self::render(value)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

//! Transcript logging controlled by the `/log` command.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::core::message::{TranscriptEntry, TranscriptRole};

pub struct LoggingState {
    file_path: Option<String>,
    is_active: bool,
}

impl LoggingState {
    pub fn new(log_file: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut logging = LoggingState {
            file_path: log_file,
            is_active: false,
        };

        // A log file passed on the command line enables logging immediately
        if logging.file_path.is_some() {
            logging.is_active = true;
        }

        Ok(logging)
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        // Test if we can create/write to the file
        self.test_file_access(&path)?;

        self.file_path = Some(path.clone());
        self.is_active = true;

        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle_logging(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                self.is_active = !self.is_active;
                if self.is_active {
                    Ok(format!("Logging resumed to: {path}"))
                } else {
                    Ok(format!("Logging paused (file: {path})"))
                }
            }
            None => {
                Err("No log file specified. Use /log <filename> to enable logging first.".into())
            }
        }
    }

    pub fn log_message(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active || self.file_path.is_none() {
            return Ok(());
        }

        self.write_to_log(content)
    }

    fn write_to_log(&self, content: &str) -> Result<(), Box<dyn std::error::Error>> {
        let file_path = match self.file_path.as_ref() {
            Some(path) => path,
            None => return Ok(()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        // Write each line of content, preserving the exact formatting
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }

        // Empty line after each message for spacing, matching screen display
        writeln!(writer)?;

        writer.flush()?;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn get_status_string(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!(
                "active ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
            (Some(path), false) => format!(
                "paused ({})",
                Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ),
        }
    }

    /// Rewrite the whole log from the transcript, e.g. after a retry
    /// replaced the last response. Atomic: the original file is only
    /// replaced after a complete write.
    pub fn rewrite_log(
        &self,
        entries: &[TranscriptEntry],
        user_display_name: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active || self.file_path.is_none() {
            return Ok(());
        }

        let file_path = match self.file_path.as_ref() {
            Some(path) => path,
            None => return Ok(()),
        };
        let target_path = Path::new(file_path);
        let parent = target_path.parent().unwrap_or_else(|| Path::new("."));

        // Temp file in the same directory so the rename stays atomic
        let mut temp_file = NamedTempFile::new_in(parent)?;

        for entry in entries {
            match entry.role {
                TranscriptRole::User => {
                    for line in format!("{}: {}", user_display_name, entry.text).lines() {
                        writeln!(temp_file, "{line}")?;
                    }
                    writeln!(temp_file)?;
                }
                TranscriptRole::Assistant if !entry.text.is_empty() => {
                    for line in entry.text.lines() {
                        writeln!(temp_file, "{line}")?;
                    }
                    writeln!(temp_file)?;
                }
                // App info/warning/error entries are screen-only
                _ => {}
            }
        }

        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(file_path)?;

        Ok(())
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::EntryId;

    fn entry(role: TranscriptRole, text: &str) -> TranscriptEntry {
        TranscriptEntry::new(EntryId::Local(0), None, role, text)
    }

    #[test]
    fn logging_is_inert_without_a_file() {
        let logging = LoggingState::new(None).unwrap();
        assert!(!logging.is_active());
        assert!(logging.log_message("hello").is_ok());
        assert_eq!(logging.get_status_string(), "disabled");
    }

    #[test]
    fn set_log_file_appends_messages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        let mut logging = LoggingState::new(None).unwrap();
        logging
            .set_log_file(path.to_string_lossy().into_owned())
            .unwrap();

        logging.log_message("You: hi").unwrap();
        logging.log_message("hello back").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "You: hi\n\nhello back\n\n");
    }

    #[test]
    fn toggle_requires_a_file() {
        let mut logging = LoggingState::new(None).unwrap();
        assert!(logging.toggle_logging().is_err());
    }

    #[test]
    fn rewrite_skips_app_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        let mut logging = LoggingState::new(None).unwrap();
        logging
            .set_log_file(path.to_string_lossy().into_owned())
            .unwrap();

        let entries = vec![
            entry(TranscriptRole::User, "hi"),
            entry(TranscriptRole::AppError, "API error"),
            entry(TranscriptRole::Assistant, "hello back"),
        ];
        logging.rewrite_log(&entries, "You").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "You: hi\n\nhello back\n\n");
    }
}

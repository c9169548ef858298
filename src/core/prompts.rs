//! Prompt library backing the prompt panel.
//!
//! Snippets come from a TOML file next to the config; picking one inserts
//! its text into the input box. A few starter snippets ship built in and
//! are used when the file is absent.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptSnippet {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PromptFile {
    #[serde(default)]
    prompts: Vec<PromptSnippet>,
}

#[derive(Debug)]
pub struct PromptLibrary {
    prompts: Vec<PromptSnippet>,
}

fn builtin_prompts() -> Vec<PromptSnippet> {
    vec![
        PromptSnippet {
            name: "Summarize".to_string(),
            text: "Summarize the following in a short bullet list:\n".to_string(),
        },
        PromptSnippet {
            name: "Explain code".to_string(),
            text: "Explain what this code does, step by step:\n".to_string(),
        },
        PromptSnippet {
            name: "Improve writing".to_string(),
            text: "Rewrite this for clarity and tone, keeping the meaning:\n".to_string(),
        },
    ]
}

impl PromptLibrary {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from_path(Self::default_path())
    }

    pub fn load_from_path(path: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Ok(Self::from_toml(&contents)?)
        } else {
            Ok(Self {
                prompts: builtin_prompts(),
            })
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let file: PromptFile = toml::from_str(contents)?;
        let prompts = if file.prompts.is_empty() {
            builtin_prompts()
        } else {
            file.prompts
        };
        Ok(Self { prompts })
    }

    fn default_path() -> PathBuf {
        match ProjectDirs::from("org", "permacommons", "ultron-console") {
            Some(proj_dirs) => proj_dirs.config_dir().join("prompts.toml"),
            None => PathBuf::from("prompts.toml"),
        }
    }

    pub fn prompts(&self) -> &[PromptSnippet] {
        &self.prompts
    }

    pub fn get(&self, index: usize) -> Option<&PromptSnippet> {
        self.prompts.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let library = PromptLibrary::load_from_path(dir.path().join("prompts.toml")).unwrap();
        assert!(!library.prompts().is_empty());
    }

    #[test]
    fn toml_prompts_replace_builtins() {
        let library = PromptLibrary::from_toml(
            r#"
            [[prompts]]
            name = "Standup"
            text = "Draft a standup update from these notes:"
            "#,
        )
        .unwrap();
        assert_eq!(library.prompts().len(), 1);
        assert_eq!(library.get(0).unwrap().name, "Standup");
    }

    #[test]
    fn empty_toml_keeps_builtins() {
        let library = PromptLibrary::from_toml("").unwrap();
        assert!(library.prompts().len() >= 3);
    }
}

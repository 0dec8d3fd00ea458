//! Default names and prompt-derived titles.

use chrono::NaiveDate;
use regex::Regex;

use crate::common::config::NamingConfig;
use crate::common::errors::SidekickResult;

/// Marker appended to titles cut short.
pub const ELLIPSIS: &str = "...";

/// Naming rules for new and freshly used conversations.
#[derive(Clone, Debug)]
pub struct NamePolicy {
    prefix: String,
    default_pattern: Regex,
    title_max_chars: usize,
}

impl NamePolicy {
    /// Build the policy from configuration.
    ///
    /// # Errors
    /// Returns an error if the default-name pattern cannot be compiled.
    pub fn new(config: &NamingConfig) -> SidekickResult<Self> {
        let prefix = config.default_prefix.trim().to_string();
        let default_pattern = Regex::new(&format!(
            r"^{} \d{{1,2}}/\d{{1,2}}/\d{{4}}$",
            regex::escape(&prefix)
        ))?;

        Ok(Self {
            prefix,
            default_pattern,
            title_max_chars: config.title_max_chars,
        })
    }

    /// Default name for a conversation created on `date`, e.g. `Interview 1/1/2024`.
    #[must_use]
    pub fn default_name(&self, date: NaiveDate) -> String {
        format!("{} {}", self.prefix, date.format("%-m/%-d/%Y"))
    }

    /// Whether `name` is still an untouched default name.
    #[must_use]
    pub fn is_default_name(&self, name: &str) -> bool {
        self.default_pattern.is_match(name)
    }

    /// Title derived from a prompt, or `None` when the prompt is blank.
    #[must_use]
    pub fn title_from_prompt(&self, prompt: &str) -> Option<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }

        let mut chars = prompt.chars();
        let head: String = chars.by_ref().take(self.title_max_chars).collect();
        if chars.next().is_some() {
            Some(format!("{head}{ELLIPSIS}"))
        } else {
            Some(head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> NamePolicy {
        NamePolicy::new(&NamingConfig::default()).unwrap()
    }

    #[test]
    fn test_default_name_has_no_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(policy().default_name(date), "Interview 1/1/2024");
        let date = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        assert_eq!(policy().default_name(date), "Interview 12/25/2023");
    }

    #[test]
    fn test_default_pattern() {
        let policy = policy();
        assert!(policy.is_default_name("Interview 1/1/2024"));
        assert!(policy.is_default_name("Interview 12/25/2023"));
        assert!(!policy.is_default_name("Interview prep for Acme"));
        assert!(!policy.is_default_name("My Interview 1/1/2024"));
    }

    #[test]
    fn test_long_prompt_is_truncated() {
        let title = policy()
            .title_from_prompt("What is a transformer model and how does self-attention work?")
            .unwrap();
        assert_eq!(title, "What is a transformer model an...");
        assert_eq!(title.chars().count(), 30 + ELLIPSIS.len());
    }

    #[test]
    fn test_short_prompt_kept_whole() {
        assert_eq!(
            policy().title_from_prompt("  What is RAG?  ").as_deref(),
            Some("What is RAG?")
        );
        let exact = "a".repeat(30);
        assert_eq!(policy().title_from_prompt(&exact), Some(exact));
    }

    #[test]
    fn test_blank_prompt_has_no_title() {
        assert!(policy().title_from_prompt(" \n\t").is_none());
    }

    #[test]
    fn test_truncation_counts_chars_not_bytes() {
        let config = NamingConfig {
            default_prefix: "Interview".to_string(),
            title_max_chars: 3,
        };
        let policy = NamePolicy::new(&config).unwrap();
        assert_eq!(policy.title_from_prompt("héllo").as_deref(), Some("hél..."));
    }

    #[test]
    fn test_custom_prefix_is_escaped() {
        let config = NamingConfig {
            default_prefix: "Call (1:1)".to_string(),
            title_max_chars: 30,
        };
        let policy = NamePolicy::new(&config).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        let name = policy.default_name(date);
        assert_eq!(name, "Call (1:1) 2/9/2024");
        assert!(policy.is_default_name(&name));
    }
}

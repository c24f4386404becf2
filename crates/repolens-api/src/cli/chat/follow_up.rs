//! Follow-up rewriting for the interactive chat.
//!
//! Users tend to ask "what does the readme say?" after naming a repository
//! once. The chat remembers the last repository URL it saw and rewrites
//! URL-less follow-ups so the model still knows which repository is meant.

use std::sync::LazyLock;

use regex::Regex;

static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://github\.com/[^/\s]+/[^/\s]+").expect("static regex is valid")
});

const FILE_WORDS: [&str; 5] = ["readme", "read", "show", "content", "file"];

#[derive(Debug, Default)]
pub struct FollowUp {
    current_repo: Option<String>,
}

impl FollowUp {
    pub fn current_repo(&self) -> Option<&str> {
        self.current_repo.as_deref()
    }

    /// Return the query to send for `input`, updating the tracked repository.
    pub fn rewrite(&mut self, input: &str) -> String {
        if let Some(found) = REPO_URL.find(input) {
            let url = found
                .as_str()
                .trim_end_matches(|c: char| matches!(c, '.' | ',' | '?' | '!' | ')' | '"' | '\''));
            self.current_repo = Some(url.to_string());
        }

        let Some(repo) = self.current_repo.as_deref() else {
            return input.to_string();
        };
        if input.contains("github.com") {
            return input.to_string();
        }

        let lower = input.to_lowercase();
        if FILE_WORDS.iter().any(|word| lower.contains(word)) {
            format!("Show me the contents of README.md in {repo}")
        } else {
            format!("Regarding {repo}: {input}")
        }
    }
}

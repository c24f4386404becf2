//! System instruction sent with every model invocation.

/// Restricts the model to the four GitHub tools, forbids retrying a failed
/// tool call verbatim, and requires the repository citation tag.
pub const SYSTEM_PROMPT: &str = "You are a GitHub repository assistant. Use only these tools:
1. get_repo_info - Get repository information
2. get_repo_structure - Get directory structure
3. get_file_content - Read files
4. get_directory_contents - List directory contents

If a tool returns an error, do not call the same tool again with the same arguments.
Instead, acknowledge the error and offer alternative ways to help.

Always start answers about a repository with [Using <repository URL>] and list which tools you used.

Example:
[Using https://github.com/example/repo]
Tools used: get_repo_info
Repository details here...";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::tools::{
        GET_DIRECTORY_CONTENTS, GET_FILE_CONTENT, GET_REPO_INFO, GET_REPO_STRUCTURE,
    };

    #[test]
    fn prompt_names_every_tool() {
        for tool in [GET_REPO_INFO, GET_REPO_STRUCTURE, GET_FILE_CONTENT, GET_DIRECTORY_CONTENTS] {
            assert!(SYSTEM_PROMPT.contains(tool), "{tool} missing from prompt");
        }
    }

    #[test]
    fn prompt_demands_citation_tag() {
        assert!(SYSTEM_PROMPT.contains("[Using <repository URL>]"));
        assert!(SYSTEM_PROMPT.contains("[Using https://github.com/example/repo]"));
    }
}

//! Agent definitions and the environment-driven catalog.

use std::path::PathBuf;

pub mod catalog;

/// Agents voratiq knows how to drive, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownAgent {
    ClaudeCode,
    Codex,
    Gemini,
}

impl KnownAgent {
    pub const ALL: [KnownAgent; 3] = [KnownAgent::ClaudeCode, KnownAgent::Codex, KnownAgent::Gemini];

    pub fn id(self) -> &'static str {
        match self {
            KnownAgent::ClaudeCode => "claude-code",
            KnownAgent::Codex => "codex",
            KnownAgent::Gemini => "gemini",
        }
    }

    /// Prefix of this agent's environment variables, e.g. `VORATIQ_AGENT_CLAUDE_CODE`.
    pub fn env_prefix(self) -> String {
        let normalized: String = self
            .id()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("VORATIQ_AGENT_{normalized}")
    }
}

/// One configured agent. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDefinition {
    pub id: String,
    pub model: String,
    pub binary_path: PathBuf,
    /// Argument template; the prompt is substituted at invocation time.
    pub argv: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_prefix_normalizes_ids() {
        assert_eq!(KnownAgent::ClaudeCode.env_prefix(), "VORATIQ_AGENT_CLAUDE_CODE");
        assert_eq!(KnownAgent::Codex.env_prefix(), "VORATIQ_AGENT_CODEX");
    }
}

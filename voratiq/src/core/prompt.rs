//! Agent prompt text, rendered from `prompts/agent.md`.

use minijinja::{Environment, context};

use super::errors::WORKSPACE_SUMMARY_FILENAME;

const AGENT_TEMPLATE: &str = include_str!("prompts/agent.md");

/// Build the exact text fed to an agent on stdin (and substituted into argv).
///
/// The spec is inserted as a value, so template syntax inside it is kept
/// verbatim.
pub fn build_agent_prompt(spec_content: &str) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template("agent", AGENT_TEMPLATE)?;
    env.get_template("agent")?.render(context! {
        spec => spec_content.trim_end(),
        summary_file => WORKSPACE_SUMMARY_FILENAME,
    })
}

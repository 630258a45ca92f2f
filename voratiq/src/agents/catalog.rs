//! Load the agent catalog from `VORATIQ_AGENT_*` environment variables.
//!
//! For every known agent:
//! - `<PREFIX>_BINARY`: path to the executable (gemini falls back to `PATH`).
//! - `<PREFIX>_MODEL`: model name, exported to the agent and used in argv.
//! - `<PREFIX>_ARGV`: JSON array of extra arguments.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use super::{AgentDefinition, KnownAgent};

pub const MODEL_PLACEHOLDER: &str = "{{MODEL}}";

const GEMINI_BINARY_NAME: &str = "gemini";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Missing environment variable: {variable} for agent {agent_id}")]
    MissingVariable { agent_id: String, variable: String },

    #[error("Invalid JSON array provided via {variable} for agent {agent_id}")]
    InvalidArgv { agent_id: String, variable: String },

    #[error("{variable} for agent {agent_id} must contain the {{{{MODEL}}}} placeholder")]
    MissingModelPlaceholder { agent_id: String, variable: String },

    #[error(
        "Gemini CLI binary not found on PATH. Install the Gemini CLI or set {variable} to its path."
    )]
    GeminiBinaryNotFound { variable: String },
}

/// Load every known agent from `env`, in catalog order.
///
/// `cwd` resolves relative `PATH` entries during gemini discovery.
#[instrument(skip_all)]
pub fn load_agent_catalog(
    env: &BTreeMap<String, String>,
    cwd: &Path,
) -> Result<Vec<AgentDefinition>, CatalogError> {
    KnownAgent::ALL
        .iter()
        .map(|agent| load_agent_definition(*agent, env, cwd))
        .collect()
}

fn load_agent_definition(
    agent: KnownAgent,
    env: &BTreeMap<String, String>,
    cwd: &Path,
) -> Result<AgentDefinition, CatalogError> {
    let prefix = agent.env_prefix();
    let binary_var = format!("{prefix}_BINARY");
    let model_var = format!("{prefix}_MODEL");
    let argv_var = format!("{prefix}_ARGV");

    let model = non_empty(env, &model_var).ok_or_else(|| CatalogError::MissingVariable {
        agent_id: agent.id().to_string(),
        variable: model_var.clone(),
    })?;
    let extra = parse_argv(env.get(&argv_var), agent, &argv_var)?;

    let (binary_path, argv) = match agent {
        KnownAgent::Gemini => {
            let binary = match non_empty(env, &binary_var) {
                Some(binary) => PathBuf::from(binary),
                None => discover_gemini(env, cwd, &binary_var)?,
            };
            (binary, gemini_argv(&model, extra))
        }
        KnownAgent::ClaudeCode | KnownAgent::Codex => {
            let binary = non_empty(env, &binary_var).ok_or_else(|| {
                CatalogError::MissingVariable {
                    agent_id: agent.id().to_string(),
                    variable: binary_var.clone(),
                }
            })?;
            if !extra.iter().any(|arg| arg.contains(MODEL_PLACEHOLDER)) {
                return Err(CatalogError::MissingModelPlaceholder {
                    agent_id: agent.id().to_string(),
                    variable: argv_var,
                });
            }
            let argv = extra
                .iter()
                .map(|arg| arg.replace(MODEL_PLACEHOLDER, &model))
                .collect();
            (PathBuf::from(binary), argv)
        }
    };

    debug!(agent = agent.id(), binary = %binary_path.display(), "loaded agent definition");
    Ok(AgentDefinition {
        id: agent.id().to_string(),
        model,
        binary_path,
        argv,
    })
}

fn non_empty(env: &BTreeMap<String, String>, key: &str) -> Option<String> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_argv(
    value: Option<&String>,
    agent: KnownAgent,
    variable: &str,
) -> Result<Vec<String>, CatalogError> {
    let Some(value) = value.filter(|value| !value.trim().is_empty()) else {
        return Ok(Vec::new());
    };
    serde_json::from_str::<Vec<String>>(value).map_err(|_| CatalogError::InvalidArgv {
        agent_id: agent.id().to_string(),
        variable: variable.to_string(),
    })
}

fn gemini_argv(model: &str, extra: Vec<String>) -> Vec<String> {
    let mut argv = vec![
        "generate".to_string(),
        "--model".to_string(),
        model.to_string(),
        "--prompt".to_string(),
        "--output-format".to_string(),
        "json".to_string(),
    ];
    argv.extend(extra);
    argv
}

fn discover_gemini(
    env: &BTreeMap<String, String>,
    cwd: &Path,
    variable: &str,
) -> Result<PathBuf, CatalogError> {
    which::which_in(GEMINI_BINARY_NAME, env.get("PATH"), cwd).map_err(|_| {
        CatalogError::GeminiBinaryNotFound {
            variable: variable.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_env() -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        for (agent, binary) in [
            (KnownAgent::ClaudeCode, "/opt/bin/claude"),
            (KnownAgent::Codex, "/opt/bin/codex"),
            (KnownAgent::Gemini, "/opt/bin/gemini"),
        ] {
            let prefix = agent.env_prefix();
            env.insert(format!("{prefix}_BINARY"), binary.to_string());
            env.insert(format!("{prefix}_MODEL"), format!("{}-model", agent.id()));
        }
        env.insert(
            "VORATIQ_AGENT_CLAUDE_CODE_ARGV".to_string(),
            r#"["--model","{{MODEL}}","-p"]"#.to_string(),
        );
        env.insert(
            "VORATIQ_AGENT_CODEX_ARGV".to_string(),
            r#"["exec","--model={{MODEL}}"]"#.to_string(),
        );
        env
    }

    #[test]
    fn loads_agents_in_catalog_order_with_model_substituted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let catalog = load_agent_catalog(&base_env(), temp.path()).expect("catalog");

        let ids: Vec<&str> = catalog.iter().map(|agent| agent.id.as_str()).collect();
        assert_eq!(ids, vec!["claude-code", "codex", "gemini"]);
        assert_eq!(catalog[0].argv, vec!["--model", "claude-code-model", "-p"]);
        assert_eq!(catalog[1].argv, vec!["exec", "--model=codex-model"]);
        assert_eq!(catalog[1].binary_path, PathBuf::from("/opt/bin/codex"));
    }

    #[test]
    fn gemini_gets_fixed_prefix_then_extra_argv() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut env = base_env();
        env.insert(
            "VORATIQ_AGENT_GEMINI_ARGV".to_string(),
            r#"["--temperature","0.3"]"#.to_string(),
        );

        let catalog = load_agent_catalog(&env, temp.path()).expect("catalog");
        assert_eq!(
            catalog[2].argv,
            vec![
                "generate",
                "--model",
                "gemini-model",
                "--prompt",
                "--output-format",
                "json",
                "--temperature",
                "0.3"
            ]
        );
    }

    #[test]
    fn missing_binary_names_the_variable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut env = base_env();
        env.remove("VORATIQ_AGENT_CODEX_BINARY");

        let err = load_agent_catalog(&env, temp.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: VORATIQ_AGENT_CODEX_BINARY for agent codex"
        );
    }

    #[test]
    fn argv_must_be_a_json_string_array() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut env = base_env();
        env.insert("VORATIQ_AGENT_CODEX_ARGV".to_string(), "[1, 2]".to_string());

        let err = load_agent_catalog(&env, temp.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgv { .. }));
    }

    #[test]
    fn model_placeholder_is_required_outside_gemini() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut env = base_env();
        env.insert(
            "VORATIQ_AGENT_CLAUDE_CODE_ARGV".to_string(),
            r#"["-p"]"#.to_string(),
        );

        let err = load_agent_catalog(&env, temp.path()).unwrap_err();
        assert!(err.to_string().contains("{{MODEL}}"));
    }

    #[cfg(unix)]
    #[test]
    fn gemini_binary_is_discovered_on_path() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let bin_dir = temp.path().join("bin");
        fs::create_dir_all(&bin_dir).expect("mkdir");
        let gemini = bin_dir.join("gemini");
        fs::write(&gemini, "#!/bin/sh\n").expect("write");
        fs::set_permissions(&gemini, fs::Permissions::from_mode(0o755)).expect("chmod");

        let mut env = base_env();
        env.remove("VORATIQ_AGENT_GEMINI_BINARY");
        env.insert("PATH".to_string(), bin_dir.display().to_string());

        let catalog = load_agent_catalog(&env, temp.path()).expect("catalog");
        assert_eq!(catalog[2].binary_path, gemini);
    }

    #[test]
    fn missing_gemini_binary_is_actionable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut env = base_env();
        env.remove("VORATIQ_AGENT_GEMINI_BINARY");
        env.insert(
            "PATH".to_string(),
            temp.path().join("empty").display().to_string(),
        );

        let err = load_agent_catalog(&env, temp.path()).unwrap_err();
        assert!(err.to_string().contains("Gemini CLI binary"));
        assert!(err.to_string().contains("VORATIQ_AGENT_GEMINI_BINARY"));
    }
}

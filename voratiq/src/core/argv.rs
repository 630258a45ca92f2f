//! Prompt substitution into an agent's argument vector.
//!
//! Catalog entries declare where the prompt belongs by including a prompt
//! flag: `--prompt`/`-p` takes the prompt as the following token, while
//! `--prompt=`/`-p=` carries it inline. Without any flag the prompt becomes the
//! final argument.

const PROMPT_FLAG_PREFIXES: [&str; 2] = ["--prompt=", "-p="];
const PROMPT_FLAG_TOKENS: [&str; 2] = ["--prompt", "-p"];

/// Return `argv` with `prompt` injected at the first recognized prompt flag.
pub fn substitute_prompt(argv: &[String], prompt: &str) -> Vec<String> {
    let mut out = argv.to_vec();

    for index in 0..out.len() {
        let token = out[index].as_str();

        if let Some(prefix) = PROMPT_FLAG_PREFIXES
            .iter()
            .find(|prefix| token.starts_with(**prefix))
        {
            out[index] = format!("{prefix}{prompt}");
            return out;
        }

        if PROMPT_FLAG_TOKENS.contains(&token) {
            match out.get(index + 1) {
                Some(next) if !next.starts_with('-') => out[index + 1] = prompt.to_string(),
                _ => out.insert(index + 1, prompt.to_string()),
            }
            return out;
        }
    }

    out.push(prompt.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn appends_when_no_flag_present() {
        let out = substitute_prompt(&args(&["--json", "--model", "m"]), "P");
        assert_eq!(out, args(&["--json", "--model", "m", "P"]));
    }

    #[test]
    fn inserts_after_bare_flag_at_end() {
        let out = substitute_prompt(&args(&["--model", "m", "--prompt"]), "P");
        assert_eq!(out, args(&["--model", "m", "--prompt", "P"]));
    }

    #[test]
    fn inserts_when_next_token_is_another_flag() {
        let out = substitute_prompt(&args(&["--prompt", "--output-format", "json"]), "P");
        assert_eq!(out, args(&["--prompt", "P", "--output-format", "json"]));
    }

    #[test]
    fn replaces_following_bare_value() {
        let out = substitute_prompt(&args(&["-p", "placeholder", "--json"]), "P");
        assert_eq!(out, args(&["-p", "P", "--json"]));
    }

    #[test]
    fn replaces_prefixed_value() {
        let out = substitute_prompt(&args(&["--json", "--prompt=old"]), "P");
        assert_eq!(out, args(&["--json", "--prompt=P"]));

        let out = substitute_prompt(&args(&["-p="]), "P");
        assert_eq!(out, args(&["-p=P"]));
    }

    #[test]
    fn only_first_flag_is_used() {
        let out = substitute_prompt(&args(&["--prompt", "--prompt"]), "P");
        assert_eq!(out, args(&["--prompt", "P", "--prompt"]));
    }

    #[test]
    fn empty_argv_gets_prompt_only() {
        assert_eq!(substitute_prompt(&[], "P"), args(&["P"]));
    }
}

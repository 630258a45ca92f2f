//! Helpers for rendering root-relative display paths.

use std::path::{Component, Path};

/// Render `target` relative to `root` with `/` separators.
///
/// Returns `"."` for the root itself. Paths that cannot be expressed relative
/// to `root` are rendered as given.
pub fn relative_to_root(root: &Path, target: &Path) -> String {
    let relative = pathdiff::diff_paths(target, root).unwrap_or_else(|| target.to_path_buf());
    let segments: Vec<String> = relative
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        return ".".to_string();
    }
    if relative.is_absolute() {
        return relative.to_string_lossy().into_owned();
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_as_dot() {
        assert_eq!(relative_to_root(Path::new("/repo"), Path::new("/repo")), ".");
    }

    #[test]
    fn nested_paths_use_forward_slashes() {
        assert_eq!(
            relative_to_root(
                Path::new("/repo"),
                Path::new("/repo/.voratiq/runs/r1/codex/stdout.log")
            ),
            ".voratiq/runs/r1/codex/stdout.log"
        );
    }

    #[test]
    fn paths_outside_root_climb() {
        assert_eq!(
            relative_to_root(Path::new("/repo/sub"), Path::new("/repo/specs/a.md")),
            "../specs/a.md"
        );
    }
}

use std::path::{Path, PathBuf};

use anyhow::Context;
use sf_config::StudyflowConfig;

use crate::cli::GlobalFlags;

/// Marker directory of a Studyflow project.
const PROJECT_DIR: &str = ".studyflow";

/// Enter the project root, load its `.env`, then load and validate config.
///
/// Project config is read relative to the working directory, so `--project`
/// changes into the project before anything is loaded.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<(PathBuf, StudyflowConfig)> {
    let root = resolve_project_root(flags.project.as_deref())?;
    std::env::set_current_dir(&root)
        .with_context(|| format!("failed to enter project root {}", root.display()))?;

    load_project_dotenv(&root)?;

    let config = StudyflowConfig::load().context("failed to load studyflow config")?;
    config.validate().context("invalid studyflow config")?;
    tracing::debug!(root = %root.display(), "config loaded");
    Ok((root, config))
}

fn resolve_project_root(project_override: Option<&str>) -> anyhow::Result<PathBuf> {
    let Some(path) = project_override else {
        return std::env::current_dir().context("failed to read current directory");
    };

    let explicit = PathBuf::from(path);
    if explicit.file_name().and_then(|name| name.to_str()) == Some(PROJECT_DIR) {
        return explicit
            .parent()
            .map(Path::to_path_buf)
            .context("invalid --project path: '.studyflow' directory has no parent");
    }

    if explicit.is_dir() {
        return Ok(explicit);
    }

    anyhow::bail!(
        "invalid --project '{}': directory does not exist",
        explicit.display()
    );
}

fn load_project_dotenv(root: &Path) -> anyhow::Result<()> {
    let env_path = root.join(".env");
    if env_path.exists() {
        dotenvy::from_path(&env_path)
            .with_context(|| format!("failed to load dotenv file at {}", env_path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::resolve_project_root;

    #[test]
    fn marker_directory_resolves_to_its_parent() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join(".studyflow");
        std::fs::create_dir(&marker).unwrap();

        let root = resolve_project_root(marker.to_str()).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn plain_directory_is_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = resolve_project_root(dir.path().to_str()).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(resolve_project_root(missing.to_str()).is_err());
    }
}

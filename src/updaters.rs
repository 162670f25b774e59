//! Known dependency managers.

use crate::command::Cmd;

/// How to refresh one kind of dependency manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Updater {
    /// File name that identifies the ecosystem, e.g. `composer.json`.
    pub manifest: &'static str,
    /// Command line run in the manifest's directory.
    pub command: &'static str,
    /// Lock file the command rewrites.
    pub lock: &'static str,
}

pub const UPDATERS: [Updater; 6] = [
    Updater {
        manifest: "composer.json",
        command: "composer update",
        lock: "composer.lock",
    },
    Updater {
        manifest: "Pipfile",
        command: "pipenv update",
        lock: "Pipfile.lock",
    },
    Updater {
        manifest: "Gemfile",
        command: "bundle update --all",
        lock: "Gemfile.lock",
    },
    Updater {
        manifest: "go.mod",
        command: "go get -u all",
        lock: "go.sum",
    },
    Updater {
        manifest: "package-lock.json",
        command: "npm update",
        lock: "package-lock.json",
    },
    Updater {
        manifest: "yarn.lock",
        command: "yarn upgrade",
        lock: "yarn.lock",
    },
];

impl Updater {
    pub fn for_manifest(file_name: &str) -> Option<&'static Updater> {
        UPDATERS.iter().find(|u| u.manifest == file_name)
    }

    pub fn cmd(&self) -> Cmd {
        // Table entries are non-empty literals.
        Cmd::parse(self.command).unwrap_or_else(|| Cmd::new(self.command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_manifest_matches_exact_file_names() {
        assert_eq!(
            Updater::for_manifest("Gemfile").map(|u| u.lock),
            Some("Gemfile.lock")
        );
        assert_eq!(Updater::for_manifest("gemfile"), None);
        assert_eq!(Updater::for_manifest("composer.lock"), None);
    }

    #[test]
    fn test_cmd_splits_table_command() {
        let go = Updater::for_manifest("go.mod").unwrap();
        assert_eq!(go.cmd().to_string(), "go get -u all");
        assert_eq!(go.cmd().program(), "go");
    }

    #[test]
    fn test_yarn_and_npm_lock_files_are_their_own_manifests() {
        for name in ["yarn.lock", "package-lock.json"] {
            assert_eq!(Updater::for_manifest(name).map(|u| u.lock), Some(name));
        }
    }
}

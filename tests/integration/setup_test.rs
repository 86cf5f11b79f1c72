use devboot::{
    app_config::{
        CopySpec, McpMergeConfig, PackageManagerConfig, PackageSpec, RepositoryConfig, SetupPlan,
    },
    setup::{run_setup, SetupOptions},
    tools::{ExternalTool, Outcome, PackageManager, VersionControl},
    DevbootError,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePackageManager {
        available: bool,
        results: HashMap<String, Outcome>,
        unlaunchable: Vec<String>,
        calls: RefCell<Vec<String>>,
    }

    impl FakePackageManager {
        fn new() -> Self {
            Self {
                available: true,
                results: HashMap::new(),
                unlaunchable: Vec::new(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn with_result(mut self, id: &str, outcome: Outcome) -> Self {
            self.results.insert(id.to_string(), outcome);
            self
        }

        fn failing_to_launch(mut self, id: &str) -> Self {
            self.unlaunchable.push(id.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl ExternalTool for FakePackageManager {
        fn name(&self) -> &str {
            "fake-pm"
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    impl PackageManager for FakePackageManager {
        fn install(&self, id: &str) -> anyhow::Result<Outcome> {
            self.calls.borrow_mut().push(id.to_string());
            if self.unlaunchable.iter().any(|u| u == id) {
                anyhow::bail!("Failed to execute fake-pm");
            }
            Ok(self.results.get(id).copied().unwrap_or(Outcome::Installed))
        }
    }

    struct FakeVersionControl {
        available: bool,
        outcome: Outcome,
        calls: RefCell<Vec<(String, PathBuf)>>,
    }

    impl FakeVersionControl {
        fn new(outcome: Outcome) -> Self {
            Self { available: true, outcome, calls: RefCell::new(Vec::new()) }
        }
    }

    impl ExternalTool for FakeVersionControl {
        fn name(&self) -> &str {
            "fake-git"
        }

        fn is_available(&self) -> bool {
            self.available
        }
    }

    impl VersionControl for FakeVersionControl {
        fn clone_or_update(&self, url: &str, dir: &Path) -> anyhow::Result<Outcome> {
            self.calls.borrow_mut().push((url.to_string(), dir.to_path_buf()));
            Ok(self.outcome)
        }
    }

    fn package(id: &str, optional: bool) -> PackageSpec {
        PackageSpec { id: id.to_string(), optional }
    }

    fn manager_config() -> PackageManagerConfig {
        PackageManagerConfig {
            program: "fake-pm".to_string(),
            install_args: vec!["install".to_string(), "{id}".to_string()],
            check_args: Vec::new(),
        }
    }

    /// A plan whose install root already holds the files a clone would produce.
    fn plan_in(temp: &TempDir) -> SetupPlan {
        let root = temp.path().join("dotfiles");
        fs::create_dir_all(root.join("editor")).expect("Failed to create directory");
        fs::write(root.join("editor/settings.json"), r#"{"editor.fontSize": 14}"#)
            .expect("Failed to write settings");
        fs::write(root.join("editor/mcp.json"), r#"{"mcpServers": {"fs": {"command": "npx"}}}"#)
            .expect("Failed to write template");

        SetupPlan {
            install_root: root,
            package_manager: Some(manager_config()),
            packages: vec![package("git", false), package("node", true), package("editor", false)],
            repository: Some(RepositoryConfig {
                url: "https://example.com/dotfiles.git".to_string(),
            }),
            copies: vec![CopySpec {
                source: PathBuf::from("editor/settings.json"),
                destination: temp.path().join("home/.config/editor/settings.json"),
            }],
            mcp: Some(McpMergeConfig {
                incoming: PathBuf::from("editor/mcp.json"),
                existing: temp.path().join("home/.config/editor/mcp.json"),
            }),
        }
    }

    #[test]
    fn test_full_run_installs_required_and_skips_optional() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new().with_result("git", Outcome::AlreadyPresent);
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let report = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect("setup should succeed");

        assert_eq!(pm.calls(), vec!["git", "editor"]);
        assert_eq!(
            report.packages,
            vec![
                ("git".to_string(), Outcome::AlreadyPresent),
                ("editor".to_string(), Outcome::Installed)
            ]
        );
        assert_eq!(report.skipped_packages, vec!["node"]);
        assert_eq!(report.repository, Some(Outcome::Installed));
        assert_eq!(
            vcs.calls.borrow().as_slice(),
            &[("https://example.com/dotfiles.git".to_string(), plan.install_root.clone())]
        );

        let settings = temp.path().join("home/.config/editor/settings.json");
        let content = fs::read_to_string(&settings).expect("Failed to read settings");
        assert_eq!(content, r#"{"editor.fontSize": 14}"#);
        assert_eq!(report.copied, vec![settings]);

        let merge = report.merge.expect("merge should run");
        assert_eq!(merge.added, vec!["fs"]);
        assert!(temp.path().join("home/.config/editor/mcp.json").exists());
    }

    #[test]
    fn test_include_optional_installs_optional_packages_last() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new();
        let vcs = FakeVersionControl::new(Outcome::Updated);

        let options = SetupOptions { include_optional: true, ..SetupOptions::default() };
        let report = run_setup(&plan, Some(&pm), &vcs, options).expect("setup should succeed");

        assert_eq!(pm.calls(), vec!["git", "editor", "node"]);
        assert!(report.skipped_packages.is_empty());
        assert_eq!(report.repository, Some(Outcome::Updated));
    }

    #[test]
    fn test_failed_package_does_not_stop_the_run() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new().with_result("git", Outcome::Failed(Some(1603)));
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let report = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect("setup should succeed");

        assert_eq!(report.failed_packages(), vec!["git"]);
        assert_eq!(pm.calls(), vec!["git", "editor"]);
        assert_eq!(report.copied.len(), 1);
        assert!(report.merge.is_some());
    }

    #[test]
    fn test_package_manager_that_cannot_start_is_reported() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new().failing_to_launch("git");
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let report = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect("setup should succeed");

        assert_eq!(report.packages[0], ("git".to_string(), Outcome::NotStarted));
        assert_eq!(report.failed_packages(), vec!["git"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("could not run fake-pm for git"));
        assert_eq!(report.packages[1], ("editor".to_string(), Outcome::Installed));
    }

    #[test]
    fn test_packages_without_package_manager_is_a_config_error() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let err = run_setup(&plan, None, &vcs, SetupOptions::default())
            .expect_err("setup should fail");

        assert!(matches!(err.downcast_ref::<DevbootError>(), Some(DevbootError::Config(_))));
        assert!(vcs.calls.borrow().is_empty());
    }

    #[test]
    fn test_unavailable_package_manager_stops_the_run() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let mut pm = FakePackageManager::new();
        pm.available = false;
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let err = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect_err("setup should fail");

        match err.downcast_ref::<DevbootError>() {
            Some(DevbootError::MissingTool(name)) => assert_eq!(name, "fake-pm"),
            other => panic!("expected missing tool error, got {other:?}"),
        }
        assert!(pm.calls().is_empty());
    }

    #[test]
    fn test_unavailable_version_control_stops_the_run() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new();
        let mut vcs = FakeVersionControl::new(Outcome::Installed);
        vcs.available = false;

        let err = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect_err("setup should fail");

        assert!(matches!(err.downcast_ref::<DevbootError>(), Some(DevbootError::MissingTool(_))));
        assert!(!temp.path().join("home").exists());
    }

    #[test]
    fn test_failed_clone_stops_before_copying() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new();
        let vcs = FakeVersionControl::new(Outcome::Failed(Some(128)));

        let err = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect_err("setup should fail");

        assert!(err.to_string().contains("could not clone or update"));
        assert!(!temp.path().join("home").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let pm = FakePackageManager::new();
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let options = SetupOptions { dry_run: true, include_optional: true, backup: false };
        let report = run_setup(&plan, Some(&pm), &vcs, options).expect("setup should succeed");

        assert!(pm.calls().is_empty());
        assert!(vcs.calls.borrow().is_empty());
        assert!(report.packages.is_empty());
        assert!(report.copied.is_empty());
        assert_eq!(report.merge.map(|m| m.added), Some(vec!["fs".to_string()]));
        assert!(!temp.path().join("home").exists());
    }

    #[test]
    fn test_missing_copy_source_is_a_warning() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let mut plan = plan_in(&temp);
        plan.copies.push(CopySpec {
            source: PathBuf::from("editor/keybindings.json"),
            destination: temp.path().join("home/keybindings.json"),
        });
        let pm = FakePackageManager::new();
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let report = run_setup(&plan, Some(&pm), &vcs, SetupOptions::default())
            .expect("setup should succeed");

        assert_eq!(report.copied.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("keybindings.json"));
    }

    #[test]
    fn test_backup_preserves_replaced_settings() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let plan = plan_in(&temp);
        let destination = temp.path().join("home/.config/editor/settings.json");
        let settings_dir = destination.parent().expect("path should have a parent");
        fs::create_dir_all(settings_dir).expect("Failed to create directory");
        fs::write(&destination, r#"{"editor.fontSize": 20}"#).expect("Failed to write file");
        let pm = FakePackageManager::new();
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let options = SetupOptions { backup: true, ..SetupOptions::default() };
        run_setup(&plan, Some(&pm), &vcs, options).expect("setup should succeed");

        let backups: Vec<_> = fs::read_dir(settings_dir)
            .expect("Failed to list directory")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("settings.json.backup."))
            .collect();
        assert_eq!(backups.len(), 1);
        let backup = fs::read_to_string(backups[0].path()).expect("Failed to read backup");
        assert_eq!(backup, r#"{"editor.fontSize": 20}"#);
        let content = fs::read_to_string(&destination).expect("Failed to read settings");
        assert_eq!(content, r#"{"editor.fontSize": 14}"#);
    }

    #[test]
    fn test_plan_without_packages_needs_no_package_manager() {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let mut plan = plan_in(&temp);
        plan.packages.clear();
        plan.package_manager = None;
        plan.repository = None;
        let vcs = FakeVersionControl::new(Outcome::Installed);

        let report = run_setup(&plan, None, &vcs, SetupOptions::default())
            .expect("setup should succeed");

        assert!(report.packages.is_empty());
        assert!(report.repository.is_none());
        assert_eq!(report.copied.len(), 1);
    }
}

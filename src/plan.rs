//! XML backup plan — what gets archived, where, and how.
//!
//! The plan is a flat list of `<commonDirs>` groups.  Each group names a
//! destination subdirectory inside the backup directory and a working
//! directory (`changeTo`) that its `<dir>` entries are relative to.
//!
//! ```xml
//! <backup>
//!   <commonDirs destination="system" changeTo="/">
//!     <dir srcDir="etc" actions="tar,gzip,gzip-verify" exclude="etc/ssl/private"/>
//!     <dir srcDir="var/www" archiveName="www" actions="tar,gzip"/>
//!   </commonDirs>
//! </backup>
//! ```
//!
//! The action list is positional: the first entry produces the archive, the
//! optional second compresses it and the optional third verifies the
//! compressed file.  See [`crate::runner::action_template`] for the builtin
//! names.
//!
//! Incomplete groups and entries are skipped with a warning rather than
//! rejected; the plan is not validated beyond that.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    runner::{ActionVars, Command, archive_command, render_action, render_excludes},
    settings::Settings,
};

/// Positions past this one in an action list are ignored.
const MAX_ACTIONS: usize = 3;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("cannot read plan '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse plan '{path}'")]
    Parse {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("cannot create destination directory '{path}'")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─── Document ─────────────────────────────────────────────────────────────────

/// Root element.  Its name is not checked.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct Plan {
    #[serde(rename = "commonDirs", default)]
    pub groups: Vec<CommonDirs>,
}

/// `<commonDirs destination=".." changeTo="..">`
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct CommonDirs {
    /// Subdirectory of the backup directory receiving this group's archives.
    #[serde(rename = "@destination", default)]
    pub destination: Option<String>,

    /// Working directory for every command in the group.
    #[serde(rename = "@changeTo", default)]
    pub change_to: Option<String>,

    #[serde(rename = "dir", default)]
    pub dirs: Vec<DirEntry>,
}

impl CommonDirs {
    /// `(destination, changeTo)` when both are present and non-empty.
    fn target(&self) -> Option<(&str, &str)> {
        match (self.destination.as_deref(), self.change_to.as_deref()) {
            (Some(dest), Some(change_to)) if !dest.is_empty() && !change_to.is_empty() => {
                Some((dest, change_to))
            },
            _ => None,
        }
    }
}

/// `<dir srcDir=".." archiveName=".." actions=".." exclude=".."/>`
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct DirEntry {
    #[serde(rename = "@srcDir", default)]
    pub src_dir: Option<String>,

    #[serde(rename = "@archiveName", default)]
    pub archive_name: Option<String>,

    /// Comma-separated action names or templates.
    #[serde(rename = "@actions", default)]
    pub actions: Option<String>,

    /// Comma-separated paths passed to `--exclude`.
    #[serde(rename = "@exclude", default)]
    pub exclude: Option<String>,
}

impl DirEntry {
    /// `archiveName`, or `srcDir` flattened into a single file name.
    fn effective_archive_name(&self, src_dir: &str) -> String {
        if let Some(name) = self.archive_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let flat = src_dir.trim().trim_matches('/').replace('/', "-");
        if flat.is_empty() { "root".into() } else { flat }
    }
}

// ─── Loading ──────────────────────────────────────────────────────────────────

impl Plan {
    /// Read and parse the plan at `path`.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        info!("Parsing '{}' file.", path.display());
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let plan = Self::parse(&text).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("{} 'commonDirs' sections found.", plan.groups.len());
        Ok(plan)
    }

    pub fn parse(text: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(text)
    }

    // ─── Commands ─────────────────────────────────────────────────────────────

    /// Flatten the plan into commands, preserving document order.
    ///
    /// Incomplete groups are warned about here and silently passed over
    /// everywhere else.
    pub fn commands(&self, backup_dir: &Path, settings: &Settings) -> Vec<Command> {
        let mut out = Vec::new();
        for group in &self.groups {
            let Some((dest, change_to)) = group.target() else {
                warn!("skipping <commonDirs> without destination/changeTo: {group:?}");
                continue;
            };
            debug!("{} 'dirs' sections found.", group.dirs.len());
            for entry in &group.dirs {
                out.extend(entry_commands(entry, dest, Path::new(change_to), backup_dir, settings));
            }
        }
        out
    }

    /// `<backup_dir>/<destination>` for every complete group, in order,
    /// without duplicates.
    pub fn destinations(&self, backup_dir: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        for (dest, _) in self.groups.iter().filter_map(CommonDirs::target) {
            let path = backup_dir.join(dest);
            if !out.contains(&path) {
                out.push(path);
            }
        }
        out
    }

    /// Create every missing destination directory.
    pub fn prepare_destinations(&self, backup_dir: &Path) -> Result<(), PlanError> {
        for path in self.destinations(backup_dir) {
            if path.exists() {
                continue;
            }
            info!("Creating directory '{}'", path.display());
            std::fs::create_dir_all(&path)
                .map_err(|source| PlanError::Destination { path, source })?;
        }
        Ok(())
    }
}

/// Commands for one `<dir>` entry; empty when the entry is incomplete.
fn entry_commands(
    entry: &DirEntry,
    dest: &str,
    working_dir: &Path,
    backup_dir: &Path,
    settings: &Settings,
) -> Vec<Command> {
    let (Some(src_dir), Some(actions)) = (entry.src_dir.as_deref(), entry.actions.as_deref())
    else {
        warn!("skipping <dir> without srcDir/actions: {entry:?}");
        return Vec::new();
    };

    let archive = backup_dir
        .join(dest)
        .join(format!("{}.tar", entry.effective_archive_name(src_dir)));
    let vars = ActionVars {
        archive: archive.to_string_lossy().into_owned(),
        dir: src_dir.trim().to_string(),
        exclude: render_excludes(entry.exclude.as_deref()),
    };

    let actions: Vec<&str> = actions
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect();
    if actions.len() > MAX_ACTIONS {
        warn!(
            "'{src_dir}': ignoring actions past the third: {:?}",
            &actions[MAX_ACTIONS..]
        );
    }

    actions
        .iter()
        .take(MAX_ACTIONS)
        .enumerate()
        .map(|(i, action)| {
            let line = render_action(action, &vars);
            if i == 0 {
                archive_command(line, working_dir, backup_dir, settings)
            } else {
                Command::new(line, working_dir)
            }
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <backup>
          <commonDirs destination="system" changeTo="/">
            <dir srcDir="etc" actions="tar,gzip,gzip-verify"
                 exclude="etc/ssl/private, etc/shadow"/>
            <dir srcDir="var/www" archiveName="www" actions="tar"/>
          </commonDirs>
          <commonDirs destination="home" changeTo="/home">
            <dir srcDir="alice" actions="tar,gzip"/>
          </commonDirs>
        </backup>
    "#;

    fn commands(xml: &str) -> Vec<Command> {
        Plan::parse(xml)
            .unwrap()
            .commands(Path::new("/b"), &Settings::default())
    }

    fn lines(xml: &str) -> Vec<String> {
        commands(xml).into_iter().map(|c| c.line).collect()
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn parses_groups_and_attributes() {
        let plan = Plan::parse(SAMPLE).unwrap();
        assert_eq!(plan.groups.len(), 2);
        let g = &plan.groups[0];
        assert_eq!(g.destination.as_deref(), Some("system"));
        assert_eq!(g.change_to.as_deref(), Some("/"));
        assert_eq!(g.dirs.len(), 2);
        assert_eq!(g.dirs[1].archive_name.as_deref(), Some("www"));
        assert_eq!(
            g.dirs[0].exclude.as_deref(),
            Some("etc/ssl/private, etc/shadow")
        );
    }

    #[test]
    fn empty_root_has_no_groups() {
        assert!(Plan::parse("<backup/>").unwrap().groups.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(Plan::parse("<backup><commonDirs></backup>").is_err());
    }

    #[test]
    fn foreign_elements_between_groups_are_ignored() {
        let xml = r#"<backup>
            <commonDirs destination="x" changeTo="/"><dir srcDir="a" actions="tar"/></commonDirs>
            <note>kept for humans</note>
            <commonDirs destination="y" changeTo="/"><dir srcDir="b" actions="tar"/></commonDirs>
        </backup>"#;
        assert_eq!(lines(xml), vec!["tar -cvf /b/x/a.tar a", "tar -cvf /b/y/b.tar b"]);
    }

    #[test]
    fn foreign_elements_between_dirs_are_ignored() {
        let xml = r#"<backup>
            <commonDirs destination="x" changeTo="/">
              <dir srcDir="a" actions="tar"/>
              <file name="notes.txt"/>
              <dir srcDir="b" actions="tar"/>
            </commonDirs>
        </backup>"#;
        assert_eq!(lines(xml), vec!["tar -cvf /b/x/a.tar a", "tar -cvf /b/x/b.tar b"]);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Plan::load(Path::new("/tmp/no-such-plan-abc123.xml")).unwrap_err();
        assert!(matches!(err, PlanError::Read { .. }));
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    #[test]
    fn commands_keep_document_order() {
        assert_eq!(lines(SAMPLE), vec![
            "tar -cvf /b/system/etc.tar --exclude etc/ssl/private --exclude etc/shadow etc",
            "gzip /b/system/etc.tar",
            "gzip -t /b/system/etc.tar.gz",
            "tar -cvf /b/system/www.tar var/www",
            "tar -cvf /b/home/alice.tar alice",
            "gzip /b/home/alice.tar",
        ]);
    }

    #[test]
    fn commands_run_in_change_to() {
        let cmds = commands(SAMPLE);
        assert!(cmds[..4].iter().all(|c| c.working_dir == Path::new("/")));
        assert!(cmds[4..].iter().all(|c| c.working_dir == Path::new("/home")));
    }

    #[test]
    fn only_archive_command_logs_stdout() {
        let cmds = commands(SAMPLE);
        assert_eq!(
            cmds[0].stdout_log.as_deref(),
            Some(Path::new("/b/archive-filelist.log"))
        );
        assert!(cmds[0].log_prefix.contains(&cmds[0].line));
        assert!(cmds[1].stdout_log.is_none());
        assert!(cmds[2].stdout_log.is_none());
    }

    #[test]
    fn group_without_change_to_is_skipped() {
        let xml = r#"<b><commonDirs destination="x"><dir srcDir="a" actions="tar"/></commonDirs></b>"#;
        assert!(commands(xml).is_empty());
    }

    #[test]
    fn dir_without_actions_is_skipped() {
        let xml = r#"<b><commonDirs destination="x" changeTo="/"><dir srcDir="a"/><dir srcDir="c" actions="tar"/></commonDirs></b>"#;
        assert_eq!(lines(xml), vec!["tar -cvf /b/x/c.tar c"]);
    }

    #[test]
    fn nested_src_dir_is_flattened_into_archive_name() {
        let xml = r#"<b><commonDirs destination="x" changeTo="/"><dir srcDir="/usr/local/" actions="tar"/></commonDirs></b>"#;
        assert_eq!(lines(xml), vec!["tar -cvf /b/x/usr-local.tar /usr/local/"]);
    }

    #[test]
    fn extra_actions_are_ignored() {
        let xml = r#"<b><commonDirs destination="x" changeTo="/"><dir srcDir="a" actions="tar,gzip,gzip-verify,gzip"/></commonDirs></b>"#;
        assert_eq!(commands(xml).len(), 3);
    }

    #[test]
    fn custom_templates_are_accepted() {
        let xml = r#"<b><commonDirs destination="x" changeTo="/"><dir srcDir="a" actions="tar -cf {archive} {dir}, xz {archive}"/></commonDirs></b>"#;
        assert_eq!(lines(xml), vec!["tar -cf /b/x/a.tar a", "xz /b/x/a.tar"]);
    }

    // ── Destinations ──────────────────────────────────────────────────────────

    #[test]
    fn incomplete_groups_have_no_target() {
        let plan = Plan::parse(
            r#"<b><commonDirs destination="x"/><commonDirs changeTo="/"/><commonDirs destination="" changeTo="/"/></b>"#,
        )
        .unwrap();
        assert!(plan.groups.iter().all(|g| g.target().is_none()));
        assert!(plan.destinations(Path::new("/b")).is_empty());
    }

    #[test]
    fn destinations_are_deduplicated() {
        let xml = r#"<b>
            <commonDirs destination="x" changeTo="/"/>
            <commonDirs destination="y" changeTo="/"/>
            <commonDirs destination="x" changeTo="/tmp"/>
            <commonDirs destination="z"/>
        </b>"#;
        let plan = Plan::parse(xml).unwrap();
        assert_eq!(plan.destinations(Path::new("/b")), vec![
            PathBuf::from("/b/x"),
            PathBuf::from("/b/y"),
        ]);
    }

    #[test]
    fn prepare_destinations_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let plan = Plan::parse(SAMPLE).unwrap();
        plan.prepare_destinations(dir.path()).unwrap();
        assert!(dir.path().join("system").is_dir());
        assert!(dir.path().join("home").is_dir());

        // Running again is a no-op.
        plan.prepare_destinations(dir.path()).unwrap();
    }
}

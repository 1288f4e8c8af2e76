//! `backupper init` — scaffold an example plan.
//!
//! The generated file archives `/etc` and the invoking user's home directory
//! and documents every attribute, so it can be trimmed down rather than
//! written from scratch.

use std::path::Path;

use anyhow::{Context, Result, bail};
use quick_xml::escape::escape;

use crate::ui::StageOutcome;

/// Render the starter plan.  `home` is the user's home directory, if known.
pub fn template(home: Option<&Path>) -> String {
    let (home_parent, home_name) = home
        .and_then(|h| Some((h.parent()?, h.file_name()?)))
        .map_or_else(
            || ("/home".to_string(), "user".to_string()),
            |(p, n)| (p.display().to_string(), n.to_string_lossy().into_owned()),
        );
    let home_parent = escape(&home_parent);
    let home_name = escape(&home_name);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!--
  backupper plan.

  <commonDirs>
    destination  subdirectory of BACKUP-<timestamp> receiving the archives
    changeTo     working directory for the commands of this group

  <dir>
    srcDir       directory to archive, relative to changeTo
    archiveName  archive file name without .tar (default: srcDir)
    actions      comma separated: archive[,compress[,verify]]
                 builtin: tar, gzip, gzip-verify
                 or a template using {{archive}} {{dir}} {{exclude}} {{zip_archive}}
    exclude      comma separated paths passed to tar via exclude options
-->
<backup>
  <commonDirs destination="system" changeTo="/">
    <dir srcDir="etc" actions="tar,gzip,gzip-verify" exclude="etc/ssl/private"/>
  </commonDirs>
  <commonDirs destination="home" changeTo="{home_parent}">
    <dir srcDir="{home_name}" actions="tar,gzip,gzip-verify"
         exclude="{home_name}/.cache"/>
  </commonDirs>
</backup>
"#
    )
}

/// Write the starter plan to `output`, refusing to overwrite.
pub fn run(output: &Path) -> Result<()> {
    let outcome = match write_template(output) {
        Ok(()) => StageOutcome::ok(format!("Created {}", output.display())),
        Err(e) => StageOutcome::failed_with("Init", format!("{e:#}")),
    };
    outcome.print();
    if outcome.failed() {
        bail!("init failed");
    }
    Ok(())
}

fn write_template(output: &Path) -> Result<()> {
    if output.exists() {
        bail!(
            "'{}' already exists, refusing to overwrite",
            output.display()
        );
    }
    let home = dirs_next::home_dir();
    std::fs::write(output, template(home.as_deref()))
        .with_context(|| format!("writing {}", output.display()))
}

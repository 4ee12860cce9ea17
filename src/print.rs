//! Sending the finished document to a printer
//!
//! Dispatch is fire-and-forget: the print command is spawned and its exit
//! status is never collected.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::{Error, Result};

/// Build the print command for `path`
///
/// `custom` is a program followed by leading arguments; the document path is
/// appended. Without it the host's default print command is used.
pub fn print_command(path: &Path, custom: Option<&[String]>) -> Result<Command> {
    if let Some(parts) = custom {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| Error::Print("print command is empty".to_string()))?;
        let mut command = Command::new(program);
        command.args(args).arg(path);
        return Ok(command);
    }

    #[cfg(target_os = "windows")]
    {
        let mut command = Command::new("powershell");
        command.args(["-NoProfile", "-Command", "Start-Process", "-Verb", "Print", "-FilePath"]);
        command.arg(path);
        Ok(command)
    }
    #[cfg(not(target_os = "windows"))]
    {
        let mut command = Command::new("lpr");
        command.arg(path);
        Ok(command)
    }
}

/// Print `path` on the default (or configured) printer
pub fn print_document(path: &Path, custom: Option<&[String]>) -> Result<()> {
    let mut command = print_command(path, custom)?;
    info!("Sending {} to the printer", path.display());
    command
        .spawn()
        .map_err(|e| Error::Print(format!("{:?}: {}", command.get_program(), e)))?;
    Ok(())
}

/// Open a file with the system default application
pub fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::status::{Errno, NssError, NssResult};
use anyhow::{self as ah, Context as _};
use log::{debug, warn};
use std::{
    ffi::OsStr,
    io::{BufRead as _, BufReader, ErrorKind, Read, Write as _},
    os::unix::{ffi::OsStrExt as _, fs::PermissionsExt as _},
    path::Path,
    process::{Child, Command, Stdio},
    time::Duration,
};

/// Environment variable that disables this module.
///
/// It is set for every external command we run, so that identity lookups
/// done by the command itself do not recurse into the command.
pub const DISABLE_ENV: &str = "NSS_EXTERNAL_DISABLE";

/// Maximum length of `NSS_EXTERNAL_DISABLE=1 <command> <arg>`, exclusive.
pub const MAX_INVOCATION_LEN: usize = 8192;

/// Lines grow in steps of this many bytes.
const LINE_CHUNK: usize = 128;

/// Spawn attempts while the command file is busy being written.
const SPAWN_ATTEMPTS: usize = 3;

/// One line of external command output, without the line feed.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Line(Vec<u8>);

impl Line {
    pub fn new(raw: Vec<u8>) -> Self {
        Self(raw)
    }

    /// All raw bytes of the line.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The line as a C string sees it: Everything up to the first NUL byte.
    pub fn text(&self) -> &[u8] {
        match self.0.iter().position(|&c| c == 0) {
            Some(end) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// The complete output of one external command invocation.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RecordSet {
    lines: Vec<Line>,
}

impl RecordSet {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    /// Get the line at `pos`, or `None` past the last line.
    pub fn get(&self, pos: usize) -> Option<&Line> {
        self.lines.get(pos)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }
}

/// Length of the invocation, counted as `NSS_EXTERNAL_DISABLE=1 <command> <arg>`.
pub fn invocation_len(command: &Path, arg: &[u8]) -> usize {
    DISABLE_ENV.len() + "=1 ".len() + command.as_os_str().len() + " ".len() + arg.len()
}

/// Check whether `command` is an existing file with any execute bit set.
pub fn is_executable(command: &Path) -> bool {
    match std::fs::metadata(command) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

fn push_line(lines: &mut Vec<Line>, line: Vec<u8>) -> NssResult<()> {
    lines.try_reserve(1).map_err(|_| NssError::TRANSIENT)?;
    lines.push(Line(line));
    Ok(())
}

/// Read everything from `reader` and split it into lines on `\n`.
///
/// A last line without line feed is kept.
/// On any failure, everything read so far is discarded.
pub fn capture_lines(reader: impl Read) -> NssResult<Vec<Line>> {
    let mut reader = BufReader::new(reader);
    let mut lines = Vec::new();
    let mut line: Vec<u8> = Vec::new();
    loop {
        let chunk = match reader.fill_buf() {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Failed to read external command output: {e}");
                return Err(NssError::TRANSIENT);
            }
        };
        if chunk.is_empty() {
            break;
        }
        let count = chunk.len();
        for &c in chunk {
            if c == b'\n' {
                push_line(&mut lines, std::mem::take(&mut line))?;
            } else {
                if line.len() == line.capacity() {
                    line.try_reserve_exact(LINE_CHUNK)
                        .map_err(|_| NssError::TRANSIENT)?;
                }
                line.push(c);
            }
        }
        reader.consume(count);
    }
    if !line.is_empty() {
        push_line(&mut lines, line)?;
    }
    Ok(lines)
}

fn spawn(command: &Path, arg: &[u8]) -> ah::Result<Child> {
    let mut attempt = 1;
    loop {
        let res = Command::new(command)
            .arg(OsStr::from_bytes(arg))
            .env(DISABLE_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();
        match res {
            // The command file may be in the middle of being replaced.
            Err(e) if e.raw_os_error() == Some(libc::ETXTBSY) && attempt < SPAWN_ATTEMPTS => {
                attempt += 1;
                std::thread::sleep(Duration::from_millis(10));
            }
            res => return res.with_context(|| format!("Spawn external command {command:?}")),
        }
    }
}

/// Run `command` with the single argument `arg` and capture its output lines.
///
/// The call blocks until the command has terminated.
pub fn run_command(command: &Path, arg: &[u8]) -> NssResult<RecordSet> {
    if invocation_len(command, arg) >= MAX_INVOCATION_LEN {
        debug!("Invocation of {command:?} is too long.");
        return Err(NssError::Unavailable(Errno::NoEnt));
    }
    if !is_executable(command) {
        debug!("External command {command:?} is not available.");
        return Err(NssError::Unavailable(Errno::NoEnt));
    }

    // Don't let pending output show up twice or out of order.
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    debug!(
        "Running {command:?} '{}'",
        String::from_utf8_lossy(arg).escape_debug()
    );
    let mut child = match spawn(command, arg) {
        Ok(child) => child,
        Err(e) => {
            warn!("{e:#}");
            return Err(NssError::Unavailable(Errno::NoEnt));
        }
    };

    // The pipe is closed when capture_lines() returns.
    let lines = match child.stdout.take() {
        Some(stdout) => capture_lines(stdout),
        None => Err(NssError::TRANSIENT),
    };

    match child.wait().context("Wait for external command") {
        Ok(status) if !status.success() => {
            debug!("External command {command:?} exited with {status}.");
        }
        Ok(_) => (),
        Err(e) => warn!("{e:#}"),
    }

    Ok(RecordSet::new(lines?))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{io::Cursor, path::PathBuf};
    use tempfile::TempDir;

    /// Write an executable shell script.
    pub fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perm = std::fs::metadata(&path).unwrap().permissions();
        perm.set_mode(0o755);
        std::fs::set_permissions(&path, perm).unwrap();
        path
    }

    fn texts(set: &RecordSet) -> Vec<String> {
        set.iter()
            .map(|l| String::from_utf8(l.as_bytes().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_capture_lines() {
        let lines = capture_lines(Cursor::new(b"a\nb\n\nc:d\n")).unwrap();
        assert_eq!(
            lines,
            [Line::from("a"), Line::from("b"), Line::from(""), Line::from("c:d")]
        );

        let lines = capture_lines(Cursor::new(b"no newline")).unwrap();
        assert_eq!(lines, [Line::from("no newline")]);

        assert!(capture_lines(Cursor::new(b"")).unwrap().is_empty());
        assert_eq!(capture_lines(Cursor::new(b"\n")).unwrap(), [Line::from("")]);
    }

    #[test]
    fn test_capture_long_line() {
        let long = "x".repeat(LINE_CHUNK * 10 + 3);
        let lines = capture_lines(Cursor::new(format!("{long}\nshort\n"))).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].as_bytes(), long.as_bytes());
        assert_eq!(lines[1].as_bytes(), b"short");
    }

    #[test]
    fn test_line_text() {
        let line = Line::new(b"abc\0def".to_vec());
        assert_eq!(line.text(), b"abc");
        assert_eq!(line.as_bytes().len(), 7);
        assert_eq!(Line::from("abc").text(), b"abc");
    }

    #[test]
    fn test_run_command() {
        let dir = TempDir::new().unwrap();
        let cmd = script(
            &dir,
            "cmd",
            "echo \"disable=$NSS_EXTERNAL_DISABLE\"\necho \"argc=$# arg=$1\"\nprintf 'last'",
        );
        let set = run_command(&cmd, b"alice").unwrap();
        assert_eq!(texts(&set), ["disable=1", "argc=1 arg=alice", "last"]);
        assert_eq!(set.len(), 3);
        assert!(set.get(3).is_none());

        let set = run_command(&cmd, b"").unwrap();
        assert_eq!(texts(&set)[1], "argc=1 arg=");
    }

    #[test]
    fn test_run_command_empty_output() {
        let dir = TempDir::new().unwrap();
        let cmd = script(&dir, "cmd", "exit 1");
        let set = run_command(&cmd, b"x").unwrap();
        assert!(set.is_empty());
        assert!(set.get(0).is_none());
    }

    #[test]
    fn test_run_command_unavailable() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert_eq!(
            run_command(&missing, b"x"),
            Err(NssError::Unavailable(Errno::NoEnt))
        );

        let not_exec = dir.path().join("not_exec");
        std::fs::write(&not_exec, "#!/bin/sh\necho hi\n").unwrap();
        assert!(!is_executable(&not_exec));
        assert_eq!(
            run_command(&not_exec, b"x"),
            Err(NssError::Unavailable(Errno::NoEnt))
        );

        assert!(!is_executable(dir.path()));
    }

    #[test]
    fn test_run_command_too_long() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let cmd = script(&dir, "cmd", &format!("touch '{}'", marker.display()));

        let fixed = invocation_len(&cmd, b"");
        let longest = vec![b'a'; MAX_INVOCATION_LEN - fixed - 1];
        assert!(run_command(&cmd, &longest).is_ok());
        assert!(marker.exists());
        std::fs::remove_file(&marker).unwrap();

        let too_long = vec![b'a'; MAX_INVOCATION_LEN - fixed];
        assert_eq!(
            run_command(&cmd, &too_long),
            Err(NssError::Unavailable(Errno::NoEnt))
        );
        assert!(!marker.exists());
    }
}

// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate implements the configuration file parsing of `nss-external`.
//!
//! Defaults for a missing configuration file
//! or missing individual configuration entries are implemented here.

#![forbid(unsafe_code)]

mod ini;

use crate::ini::Ini;
use anyhow::{self as ah, format_err as err, Context as _};
use std::path::{Path, PathBuf};

/// The default configuration path, relative to the install prefix.
const CONF_PATH: &str = "etc/nss-external.conf";

/// The directory holding the default external commands.
const COMMAND_DIR: &str = "/etc/nss-external";

/// Accounts with a lower UID are never returned.
pub const DEFAULT_MIN_UID: u32 = 500;

/// Groups with a lower GID are never returned.
pub const DEFAULT_MIN_GID: u32 = 500;

/// Identity database served by an external command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RecordKind {
    /// User accounts, passwd(5).
    Passwd,
    /// Groups, group(5).
    Group,
    /// Shadow credentials, shadow(5).
    Shadow,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::Passwd, Self::Group, Self::Shadow];

    /// Database name as used in nsswitch.conf and in the configuration file.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Passwd => "passwd",
            Self::Group => "group",
            Self::Shadow => "shadow",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = ah::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "passwd" => Ok(Self::Passwd),
            "group" => Ok(Self::Group),
            "shadow" => Ok(Self::Shadow),
            other => Err(err!(
                "Database '{other}' is not valid. Valid values are: passwd, group, shadow."
            )),
        }
    }
}

fn parse_bool(s: &str) -> ah::Result<bool> {
    let s = s.to_lowercase();
    let s = s.trim();
    match s {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(err!("Invalid boolean string")),
    }
}

fn parse_u32(s: &str) -> ah::Result<u32> {
    let s = s.trim();
    if let Some(s) = s.strip_prefix("0x") {
        Ok(u32::from_str_radix(s, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn default_command(kind: RecordKind) -> PathBuf {
    Path::new(COMMAND_DIR).join(kind.name())
}

fn get_debug(ini: &Ini) -> ah::Result<bool> {
    if let Some(debug) = ini.get("GENERAL", "debug") {
        return parse_bool(debug).context("[GENERAL] debug");
    }
    Ok(false)
}

fn get_command(ini: &Ini, kind: RecordKind) -> ah::Result<PathBuf> {
    if let Some(command) = ini.get("COMMANDS", kind.name()) {
        let command = Path::new(command.trim());
        if !command.is_absolute() {
            return Err(err!(
                "[COMMANDS] {kind}={command:?} is not an absolute path"
            ));
        }
        return Ok(command.to_path_buf());
    }
    Ok(default_command(kind))
}

fn get_min_uid(ini: &Ini) -> ah::Result<u32> {
    if let Some(min_uid) = ini.get("LIMITS", "min-uid") {
        return parse_u32(min_uid).context("[LIMITS] min-uid");
    }
    Ok(DEFAULT_MIN_UID)
}

fn get_min_gid(ini: &Ini) -> ah::Result<u32> {
    if let Some(min_gid) = ini.get("LIMITS", "min-gid") {
        return parse_u32(min_gid).context("[LIMITS] min-gid");
    }
    Ok(DEFAULT_MIN_GID)
}

/// Parsed nss-external.conf.
#[derive(Clone, Debug)]
pub struct Config {
    path: Option<PathBuf>,
    debug: bool,
    passwd_command: PathBuf,
    group_command: PathBuf,
    shadow_command: PathBuf,
    min_uid: u32,
    min_gid: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration instance with all-default values.
    pub fn new() -> Self {
        Self {
            path: None,
            debug: false,
            passwd_command: default_command(RecordKind::Passwd),
            group_command: default_command(RecordKind::Group),
            shadow_command: default_command(RecordKind::Shadow),
            min_uid: DEFAULT_MIN_UID,
            min_gid: DEFAULT_MIN_GID,
        }
    }

    /// Get the default configuration file path.
    pub fn get_default_path() -> PathBuf {
        // The build-time environment variable NSS_EXTERNAL_CONF_PREFIX can be
        // used to give an additional prefix.
        let prefix = option_env!("NSS_EXTERNAL_CONF_PREFIX").unwrap_or("/");
        let mut path = PathBuf::new();
        path.push(prefix);
        path.push(CONF_PATH);
        path
    }

    /// Get the actual path the configuration was read from.
    pub fn get_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// (Re-)load a configuration from a file.
    ///
    /// A missing file is not an error. All options keep their defaults then.
    pub fn load(&mut self, path: &Path) -> ah::Result<()> {
        match std::fs::metadata(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                *self = Self::new();
            }
            _ => {
                let ini = Ini::new_from_file(path)
                    .with_context(|| format!("Failed to load configuration {path:?}"))?;
                self.load_ini(&ini)?;
            }
        }
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// (Re-)load a configuration from a string in configuration file syntax.
    pub fn load_str(&mut self, content: &str) -> ah::Result<()> {
        let mut ini = Ini::new();
        ini.parse_str(content)?;
        self.load_ini(&ini)
    }

    /// (Re-)load a configuration from a parsed [Ini] instance.
    fn load_ini(&mut self, ini: &Ini) -> ah::Result<()> {
        let debug = get_debug(ini)?;
        let passwd_command = get_command(ini, RecordKind::Passwd)?;
        let group_command = get_command(ini, RecordKind::Group)?;
        let shadow_command = get_command(ini, RecordKind::Shadow)?;
        let min_uid = get_min_uid(ini)?;
        let min_gid = get_min_gid(ini)?;

        self.debug = debug;
        self.passwd_command = passwd_command;
        self.group_command = group_command;
        self.shadow_command = shadow_command;
        self.min_uid = min_uid;
        self.min_gid = min_gid;
        Ok(())
    }

    /// Get the `debug` option from `[GENERAL]` section.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Get the external command for a database from the `[COMMANDS]` section.
    pub fn command(&self, kind: RecordKind) -> &Path {
        match kind {
            RecordKind::Passwd => &self.passwd_command,
            RecordKind::Group => &self.group_command,
            RecordKind::Shadow => &self.shadow_command,
        }
    }

    /// Override the external command for a database.
    pub fn set_command(&mut self, kind: RecordKind, command: &Path) {
        let command = command.to_path_buf();
        match kind {
            RecordKind::Passwd => self.passwd_command = command,
            RecordKind::Group => self.group_command = command,
            RecordKind::Shadow => self.shadow_command = command,
        }
    }

    /// Get the `min-uid` option from `[LIMITS]` section.
    pub fn min_uid(&self) -> u32 {
        self.min_uid
    }

    /// Override the `min-uid` option.
    pub fn set_min_uid(&mut self, min_uid: u32) {
        self.min_uid = min_uid;
    }

    /// Get the `min-gid` option from `[LIMITS]` section.
    pub fn min_gid(&self) -> u32 {
        self.min_gid
    }

    /// Override the `min-gid` option.
    pub fn set_min_gid(&mut self, min_gid: u32) {
        self.min_gid = min_gid;
    }
}


// vim: ts=4 sw=4 expandtab

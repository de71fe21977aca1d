// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![forbid(unsafe_code)]

use anyhow::{self as ah, Context as _};
use clap::Parser;
use log::debug;
use nss_external_conf::{Config, RecordKind};
use nss_external_engine::{
    Group, NssError, NssResult, Passwd, Record, Resolver, Sessions, Shadow,
};
use std::{path::PathBuf, process::ExitCode};

/// Environment variable with the `env_logger` filter.
const LOG_ENV: &str = "NSS_EXTERNAL_LOG";

/// Exit code for entries that do not exist.
const EXIT_NOT_FOUND: u8 = 2;

/// Query the external identity commands the way the NSS module does.
#[derive(Parser, Debug)]
struct Opts {
    /// Override the default path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial entry buffer size, in bytes.
    ///
    /// The buffer is doubled for as long as an entry does not fit.
    #[arg(long, default_value_t = 1024)]
    capacity: usize,

    /// Show detailed information about what happens internally.
    #[arg(long)]
    verbose: bool,

    /// Show version information and exit.
    #[arg(long, short = 'v')]
    version: bool,

    /// The database to query: passwd, group or shadow.
    #[arg(required_unless_present = "version")]
    database: Option<RecordKind>,

    /// User or group name, or a numeric UID/GID.
    ///
    /// If not given, then all entries are listed.
    key: Option<String>,
}

impl Opts {
    /// Get the configuration path from command line or default.
    pub fn get_config(&self) -> PathBuf {
        if let Some(config) = &self.config {
            config.clone()
        } else {
            Config::get_default_path()
        }
    }
}

/// Run `op` with a buffer of `capacity` bytes and double the buffer
/// for as long as the entry does not fit.
fn with_growing_buffer<T>(
    capacity: usize,
    mut op: impl FnMut(usize) -> NssResult<T>,
) -> NssResult<T> {
    let mut capacity = capacity.max(1);
    loop {
        match op(capacity) {
            Err(e) if e.is_buffer_too_small() => {
                capacity = capacity.checked_mul(2).ok_or(e)?;
                debug!("Retrying with a {capacity} bytes buffer.");
            }
            res => return res,
        }
    }
}

fn list<R: Record>(res: &Resolver<'_>, capacity: usize) -> ah::Result<()> {
    let kind = R::SCHEMA.kind;
    res.begin(kind)
        .with_context(|| format!("Begin listing {kind}"))?;
    let mut count = 0_usize;
    let result = loop {
        match with_growing_buffer(capacity, |capacity| res.next::<R>(capacity)) {
            Ok(record) => {
                println!("{record}");
                count += 1;
            }
            Err(NssError::NotFound) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    res.end(kind)
        .with_context(|| format!("End listing {kind}"))?;
    debug!("Listed {count} {kind} entries.");
    result.with_context(|| format!("List {kind} entry {}", count + 1))
}

fn show<R: Record>(record: NssResult<R>, kind: RecordKind, key: &str) -> ah::Result<()> {
    let record = record.with_context(|| format!("Look up {kind} '{key}'"))?;
    println!("{record}");
    Ok(())
}

fn lookup(res: &Resolver<'_>, kind: RecordKind, key: &str, capacity: usize) -> ah::Result<()> {
    let name = key.as_bytes();
    match (kind, key.parse::<u32>()) {
        (RecordKind::Passwd, Ok(uid)) => show(
            with_growing_buffer(capacity, |c| res.passwd_by_uid(uid, c)),
            kind,
            key,
        ),
        (RecordKind::Passwd, Err(_)) => show(
            with_growing_buffer(capacity, |c| res.passwd_by_name(name, c)),
            kind,
            key,
        ),
        (RecordKind::Group, Ok(gid)) => show(
            with_growing_buffer(capacity, |c| res.group_by_gid(gid, c)),
            kind,
            key,
        ),
        (RecordKind::Group, Err(_)) => show(
            with_growing_buffer(capacity, |c| res.group_by_name(name, c)),
            kind,
            key,
        ),
        (RecordKind::Shadow, _) => show(
            with_growing_buffer(capacity, |c| res.shadow_by_name(name, c)),
            kind,
            key,
        ),
    }
}

fn run(opts: &Opts, kind: RecordKind) -> ah::Result<()> {
    // Read the nss-external.conf configuration file.
    let mut conf = Config::new();
    conf.load(&opts.get_config())
        .context("Configuration file")?;

    let sessions = Sessions::new();
    let res = Resolver::new(&conf, &sessions);

    match &opts.key {
        Some(key) => lookup(&res, kind, key, opts.capacity),
        None => match kind {
            RecordKind::Passwd => list::<Passwd>(&res, opts.capacity),
            RecordKind::Group => list::<Group>(&res, opts.capacity),
            RecordKind::Shadow => list::<Shadow>(&res, opts.capacity),
        },
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();

    if opts.version {
        println!("nss-external-query version {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let default_filter = if opts.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, default_filter))
        .format_timestamp(None)
        .init();

    let Some(kind) = opts.database else {
        return ExitCode::FAILURE;
    };
    match run(&opts, kind) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            if e.downcast_ref::<NssError>() == Some(&NssError::NotFound) {
                ExitCode::from(EXIT_NOT_FOUND)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}


// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    command::{run_command, DISABLE_ENV},
    cursor::Sessions,
    group::Group,
    passwd::Passwd,
    record::Record,
    shadow::Shadow,
    status::{Errno, NssError, NssResult},
};
use log::debug;
use nss_external_conf::{Config, RecordKind};

/// The calling process, as far as the gates are concerned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Caller {
    /// The kill switch environment variable is set.
    pub disabled: bool,
    /// The effective user is root.
    pub privileged: bool,
}

impl Caller {
    /// Inspect the calling process.
    pub fn current() -> Self {
        Self {
            disabled: std::env::var_os(DISABLE_ENV).is_some(),
            privileged: nix::unistd::geteuid().is_root(),
        }
    }
}

/// The public operations of all record kinds.
pub struct Resolver<'a> {
    conf: &'a Config,
    sessions: &'a Sessions,
    caller: Caller,
}

impl<'a> Resolver<'a> {
    /// Create a resolver for the calling process.
    pub fn new(conf: &'a Config, sessions: &'a Sessions) -> Self {
        Self::with_caller(conf, sessions, Caller::current())
    }

    pub fn with_caller(conf: &'a Config, sessions: &'a Sessions, caller: Caller) -> Self {
        Self {
            conf,
            sessions,
            caller,
        }
    }

    fn min_id(&self, kind: RecordKind) -> Option<u32> {
        match kind {
            RecordKind::Passwd => Some(self.conf.min_uid()),
            RecordKind::Group => Some(self.conf.min_gid()),
            RecordKind::Shadow => None,
        }
    }

    fn accepts<R: Record>(&self, record: &R) -> bool {
        match (self.min_id(R::SCHEMA.kind), record.id()) {
            (Some(min), Some(id)) => id >= min,
            _ => true,
        }
    }

    fn gate(&self, kind: RecordKind) -> NssResult<()> {
        if self.caller.disabled {
            return Err(NssError::NotFound);
        }
        if kind == RecordKind::Shadow && !self.caller.privileged {
            debug!("Access to {kind} entries requires root.");
            return Err(NssError::Unavailable(Errno::Perm));
        }
        Ok(())
    }

    /// Run the command of `R` with `arg` and pack its first line.
    fn query<R: Record>(&self, arg: &[u8], capacity: usize) -> NssResult<R> {
        let kind = R::SCHEMA.kind;
        self.gate(kind)?;
        let records = run_command(self.conf.command(kind), arg)?;
        let Some(line) = records.get(0) else {
            return Err(NssError::NotFound);
        };
        if records.len() > 1 {
            debug!(
                "Ignoring {} extra lines of {kind} lookup.",
                records.len() - 1
            );
        }
        let record = R::pack(line, capacity)?;
        if !self.accepts(&record) {
            debug!("Rejecting {kind} entry below the threshold.");
            return Err(NssError::NotFound);
        }
        Ok(record)
    }

    fn query_id<R: Record>(&self, id: u32, capacity: usize) -> NssResult<R> {
        if self.caller.disabled {
            return Err(NssError::NotFound);
        }
        if let Some(min) = self.min_id(R::SCHEMA.kind) {
            if id < min {
                return Err(NssError::NotFound);
            }
        }
        self.query(id.to_string().as_bytes(), capacity)
    }

    pub fn passwd_by_name(&self, name: &[u8], capacity: usize) -> NssResult<Passwd> {
        self.query(name, capacity)
    }

    pub fn passwd_by_uid(&self, uid: u32, capacity: usize) -> NssResult<Passwd> {
        self.query_id(uid, capacity)
    }

    pub fn group_by_name(&self, name: &[u8], capacity: usize) -> NssResult<Group> {
        self.query(name, capacity)
    }

    pub fn group_by_gid(&self, gid: u32, capacity: usize) -> NssResult<Group> {
        self.query_id(gid, capacity)
    }

    pub fn shadow_by_name(&self, name: &[u8], capacity: usize) -> NssResult<Shadow> {
        self.query(name, capacity)
    }

    /// Start enumerating all entries of `kind`.
    pub fn begin(&self, kind: RecordKind) -> NssResult<()> {
        self.gate(kind)?;
        self.sessions.lock(kind).begin(self.conf.command(kind));
        Ok(())
    }

    /// Get the next enumerated entry of kind `R`.
    pub fn next<R: Record>(&self, capacity: usize) -> NssResult<R> {
        let kind = R::SCHEMA.kind;
        self.gate(kind)?;
        self.sessions
            .lock(kind)
            .next(capacity, |record: &R| self.accepts(record))
    }

    /// Stop enumerating entries of `kind`.
    pub fn end(&self, kind: RecordKind) -> NssResult<()> {
        if self.caller.disabled {
            return Err(NssError::NotFound);
        }
        self.sessions.lock(kind).end();
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab

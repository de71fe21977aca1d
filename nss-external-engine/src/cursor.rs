// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    command::{run_command, RecordSet},
    record::Record,
    status::{Errno, NssError, NssResult},
};
use log::debug;
use nss_external_conf::RecordKind;
use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

/// Enumeration state of one record kind.
#[derive(Debug, Default)]
pub struct Cursor {
    records: Option<RecordSet>,
    pos: usize,
}

impl Cursor {
    pub const fn new() -> Self {
        Self {
            records: None,
            pos: 0,
        }
    }

    /// Run the enumeration `command` and start a new scan over its output.
    ///
    /// Any previous scan is released first.
    /// If the command can't be run, the cursor stays closed
    /// and the next [Cursor::next] reports the service as unavailable.
    pub fn begin(&mut self, command: &Path) {
        self.end();
        match run_command(command, b"") {
            Ok(records) => self.open(records),
            Err(e) => debug!("Enumeration via {command:?} not possible: {e}"),
        }
    }

    /// Start a new scan over `records`.
    pub fn open(&mut self, records: RecordSet) {
        self.records = Some(records);
        self.pos = 0;
    }

    /// Pack the next record that is accepted by `accept`.
    ///
    /// Records that are not accepted are skipped.
    /// A transient error, including a too small buffer, leaves the position
    /// untouched, so that the caller can retry the same record.
    /// Every other outcome moves on to the next line.
    pub fn next<R: Record>(
        &mut self,
        capacity: usize,
        accept: impl Fn(&R) -> bool,
    ) -> NssResult<R> {
        let Some(records) = &self.records else {
            return Err(NssError::Unavailable(Errno::NoEnt));
        };
        loop {
            let Some(line) = records.get(self.pos) else {
                return Err(NssError::NotFound);
            };
            match R::pack(line, capacity) {
                Err(e @ NssError::TryAgain(_)) => return Err(e),
                Err(e) => {
                    debug!("Malformed {} line {}.", R::SCHEMA.kind, self.pos + 1);
                    self.pos += 1;
                    return Err(e);
                }
                Ok(record) => {
                    self.pos += 1;
                    if accept(&record) {
                        return Ok(record);
                    }
                    debug!("Skipping {} entry below the threshold.", R::SCHEMA.kind);
                }
            }
        }
    }

    /// Release the scan. Ending a closed cursor is fine.
    pub fn end(&mut self) {
        self.records = None;
        self.pos = 0;
    }

    pub fn is_open(&self) -> bool {
        self.records.is_some()
    }

    /// Index of the next line to be packed.
    pub fn position(&self) -> usize {
        self.pos
    }
}

/// The enumeration cursors of all record kinds.
///
/// Each kind has its own lock, so that scanning one kind never blocks another.
#[derive(Debug, Default)]
pub struct Sessions {
    passwd: Mutex<Cursor>,
    group: Mutex<Cursor>,
    shadow: Mutex<Cursor>,
}

impl Sessions {
    pub const fn new() -> Self {
        Self {
            passwd: Mutex::new(Cursor::new()),
            group: Mutex::new(Cursor::new()),
            shadow: Mutex::new(Cursor::new()),
        }
    }

    /// Lock the cursor of `kind`.
    pub fn lock(&self, kind: RecordKind) -> MutexGuard<'_, Cursor> {
        let mutex = match kind {
            RecordKind::Passwd => &self.passwd,
            RecordKind::Group => &self.group,
            RecordKind::Shadow => &self.shadow,
        };
        // The cursor is consistent between any two statements.
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}


// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    record::{parse_id, show, Arena, FieldRule, Packed, Record, Schema},
    split::Span,
    status::NssResult,
};
use nss_external_conf::RecordKind;

/// A packed user account, passwd(5).
#[derive(Clone, Debug)]
pub struct Passwd {
    arena: Arena,
    name: Span,
    passwd: Span,
    uid: u32,
    gid: u32,
    gecos: Span,
    dir: Span,
    shell: Span,
}

impl Passwd {
    pub fn name(&self) -> &[u8] {
        self.arena.field(self.name)
    }

    pub fn passwd(&self) -> &[u8] {
        self.arena.field(self.passwd)
    }

    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    pub fn gecos(&self) -> &[u8] {
        self.arena.field(self.gecos)
    }

    pub fn dir(&self) -> &[u8] {
        self.arena.field(self.dir)
    }

    pub fn shell(&self) -> &[u8] {
        self.arena.field(self.shell)
    }
}

impl Record for Passwd {
    const SCHEMA: Schema = Schema {
        kind: RecordKind::Passwd,
        fields: &[
            FieldRule::Text, // name
            FieldRule::Text, // password
            FieldRule::Id,   // uid
            FieldRule::Id,   // gid
            FieldRule::Text, // gecos
            FieldRule::Text, // home directory
            FieldRule::Text, // shell
        ],
    };

    fn from_packed(packed: Packed) -> NssResult<Self> {
        let uid = parse_id(packed.field(2))?;
        let gid = parse_id(packed.field(3))?;
        let f = &packed.fields;
        Ok(Self {
            name: f[0],
            passwd: f[1],
            uid,
            gid,
            gecos: f[4],
            dir: f[5],
            shell: f[6],
            arena: packed.arena,
        })
    }

    fn id(&self) -> Option<u32> {
        Some(self.uid)
    }

    fn arena(&self) -> &Arena {
        &self.arena
    }
}

impl std::fmt::Display for Passwd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}",
            show(self.name()),
            show(self.passwd()),
            self.uid,
            self.gid,
            show(self.gecos()),
            show(self.dir()),
            show(self.shell()),
        )
    }
}


// vim: ts=4 sw=4 expandtab

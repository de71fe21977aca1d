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

/// A packed group, group(5).
///
/// The arena starts with one pointer slot per member plus at least one
/// terminating null slot. The members themselves live in the text region.
#[derive(Clone, Debug)]
pub struct Group {
    arena: Arena,
    name: Span,
    passwd: Span,
    gid: u32,
    members: Vec<Span>,
}

impl Group {
    pub fn name(&self) -> &[u8] {
        self.arena.field(self.name)
    }

    pub fn passwd(&self) -> &[u8] {
        self.arena.field(self.passwd)
    }

    pub fn gid(&self) -> u32 {
        self.gid
    }

    /// The group members, in the order of the member list.
    pub fn members(&self) -> impl Iterator<Item = &[u8]> {
        self.members.iter().map(|m| self.arena.field(*m))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

impl Record for Group {
    const SCHEMA: Schema = Schema {
        kind: RecordKind::Group,
        fields: &[
            FieldRule::Text, // name
            FieldRule::Text, // password
            FieldRule::Id,   // gid
            FieldRule::List, // members
        ],
    };

    fn from_packed(packed: Packed) -> NssResult<Self> {
        let gid = parse_id(packed.field(2))?;
        Ok(Self {
            name: packed.fields[0],
            passwd: packed.fields[1],
            gid,
            members: packed.list,
            arena: packed.arena,
        })
    }

    fn id(&self) -> Option<u32> {
        Some(self.gid)
    }

    fn arena(&self) -> &Arena {
        &self.arena
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}:{}:{}:",
            show(self.name()),
            show(self.passwd()),
            self.gid
        )?;
        for (i, member) in self.members().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", show(member))?;
        }
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    record::{parse_opt_signed, parse_opt_unsigned, show, Arena, FieldRule, Packed, Record, Schema},
    split::Span,
    status::NssResult,
};
use nss_external_conf::RecordKind;

/// A packed shadow password entry, shadow(5).
///
/// Empty aging fields are -1 and an empty flag field is `u64::MAX`,
/// so that they are distinguishable from zero.
#[derive(Clone, Debug)]
pub struct Shadow {
    arena: Arena,
    name: Span,
    pwdp: Span,
    last_change: i64,
    min: i64,
    max: i64,
    warn: i64,
    inactive: i64,
    expire: i64,
    flag: u64,
}

impl Shadow {
    pub fn name(&self) -> &[u8] {
        self.arena.field(self.name)
    }

    /// The password hash.
    pub fn pwdp(&self) -> &[u8] {
        self.arena.field(self.pwdp)
    }

    pub fn last_change(&self) -> i64 {
        self.last_change
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn warn(&self) -> i64 {
        self.warn
    }

    pub fn inactive(&self) -> i64 {
        self.inactive
    }

    pub fn expire(&self) -> i64 {
        self.expire
    }

    pub fn flag(&self) -> u64 {
        self.flag
    }
}

impl Record for Shadow {
    const SCHEMA: Schema = Schema {
        kind: RecordKind::Shadow,
        fields: &[
            FieldRule::Text,        // name
            FieldRule::Text,        // password hash
            FieldRule::OptSigned,   // date of last change
            FieldRule::OptSigned,   // minimum age
            FieldRule::OptSigned,   // maximum age
            FieldRule::OptSigned,   // warning period
            FieldRule::OptSigned,   // inactivity period
            FieldRule::OptSigned,   // expiration date
            FieldRule::OptUnsigned, // reserved flag
        ],
    };

    fn from_packed(packed: Packed) -> NssResult<Self> {
        Ok(Self {
            name: packed.fields[0],
            pwdp: packed.fields[1],
            last_change: parse_opt_signed(packed.field(2))?,
            min: parse_opt_signed(packed.field(3))?,
            max: parse_opt_signed(packed.field(4))?,
            warn: parse_opt_signed(packed.field(5))?,
            inactive: parse_opt_signed(packed.field(6))?,
            expire: parse_opt_signed(packed.field(7))?,
            flag: parse_opt_unsigned(packed.field(8))?,
            arena: packed.arena,
        })
    }

    fn id(&self) -> Option<u32> {
        None
    }

    fn arena(&self) -> &Arena {
        &self.arena
    }
}

impl std::fmt::Display for Shadow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        fn signed(v: i64) -> String {
            if v == -1 {
                String::new()
            } else {
                v.to_string()
            }
        }
        write!(
            f,
            "{}:{}:{}:{}:{}:{}:{}:{}:",
            show(self.name()),
            show(self.pwdp()),
            signed(self.last_change),
            signed(self.min),
            signed(self.max),
            signed(self.warn),
            signed(self.inactive),
            signed(self.expire),
        )?;
        if self.flag != u64::MAX {
            write!(f, "{}", self.flag)?;
        }
        Ok(())
    }
}


// vim: ts=4 sw=4 expandtab

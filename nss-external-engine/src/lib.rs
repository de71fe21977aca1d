// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate implements the record acquisition of `nss-external`:
//! Running the external commands, capturing their output and
//! packing the output lines into `passwd`, `group` and `shadow` entries.
//!
//! Nothing in here touches caller memory.
//! Packed entries are owned arenas that the C ABI layer copies out.

#![forbid(unsafe_code)]

pub mod command;
pub mod cursor;
pub mod group;
pub mod lookup;
pub mod passwd;
pub mod record;
pub mod shadow;
pub mod split;
pub mod status;

pub use crate::{
    cursor::Sessions,
    group::Group,
    lookup::{Caller, Resolver},
    passwd::Passwd,
    record::{Arena, Record},
    shadow::Shadow,
    split::Span,
    status::{Errno, NssError, NssResult, NssStatus},
};
pub use nss_external_conf::RecordKind;

// vim: ts=4 sw=4 expandtab

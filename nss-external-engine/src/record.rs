// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    command::Line,
    split::{count_delim, split_in_place, Span},
    status::{NssError, NssResult},
};
use nss_external_conf::RecordKind;

/// Size of one member pointer slot at the start of a packed group.
pub const PTR_SIZE: usize = std::mem::size_of::<*mut libc::c_char>();

/// Delimiter between the fields of a line.
pub const FIELD_DELIM: u8 = b':';

/// Delimiter between the entries of a list field.
pub const LIST_DELIM: u8 = b',';

/// How a single field of a line is interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldRule {
    /// Arbitrary text.
    Text,
    /// Mandatory unsigned 32 bit number.
    Id,
    /// Optional signed number. Empty means -1.
    OptSigned,
    /// Optional unsigned number. Empty means the maximum value.
    OptUnsigned,
    /// Comma separated list of names.
    List,
}

fn number_text(field: &[u8]) -> NssResult<&str> {
    std::str::from_utf8(field).map_err(|_| NssError::NotFound)
}

/// Parse a mandatory id field.
pub fn parse_id(field: &[u8]) -> NssResult<u32> {
    number_text(field)?
        .parse()
        .map_err(|_| NssError::NotFound)
}

/// Parse an optional signed field. Empty means -1.
pub fn parse_opt_signed(field: &[u8]) -> NssResult<i64> {
    if field.is_empty() {
        return Ok(-1);
    }
    number_text(field)?
        .parse()
        .map_err(|_| NssError::NotFound)
}

/// Parse an optional unsigned field. Empty means the maximum value.
pub fn parse_opt_unsigned(field: &[u8]) -> NssResult<u64> {
    if field.is_empty() {
        return Ok(u64::MAX);
    }
    number_text(field)?
        .parse()
        .map_err(|_| NssError::NotFound)
}

impl FieldRule {
    /// Check that `field` can be interpreted by this rule.
    pub fn check(&self, field: &[u8]) -> NssResult<()> {
        match self {
            Self::Text | Self::List => Ok(()),
            Self::Id => parse_id(field).map(|_| ()),
            Self::OptSigned => parse_opt_signed(field).map(|_| ()),
            Self::OptUnsigned => parse_opt_unsigned(field).map(|_| ()),
        }
    }
}

/// Line layout of one record kind.
#[derive(Clone, Copy, Debug)]
pub struct Schema {
    pub kind: RecordKind,
    pub fields: &'static [FieldRule],
}

impl Schema {
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Index of the list field, if this kind has one.
    pub fn list_field(&self) -> Option<usize> {
        self.fields.iter().position(|r| *r == FieldRule::List)
    }
}

/// Owned destination memory of one packed record.
///
/// The layout is what the caller buffer receives:
/// `slots` zeroed pointer slots, followed by the line text,
/// with every delimiter replaced by a NUL byte, followed by a final NUL byte.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Arena {
    bytes: Vec<u8>,
    slots: usize,
}

impl Arena {
    /// All bytes, including the slot region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes the record occupies in the caller buffer.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of pointer slots reserved at the start.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Byte offset of the slot region's end.
    pub fn text_offset(&self) -> usize {
        self.slots * PTR_SIZE
    }

    /// Get the text of a field.
    pub fn field(&self, span: Span) -> &[u8] {
        &self.bytes[span.range()]
    }

    /// Byte offset of a field slice obtained from this arena.
    pub fn offset_of(&self, field: &[u8]) -> Option<usize> {
        let base = self.bytes.as_ptr() as usize;
        let addr = field.as_ptr() as usize;
        let offset = addr.checked_sub(base)?;
        if offset.checked_add(field.len())? < self.bytes.len() {
            Some(offset)
        } else {
            None
        }
    }
}

/// A line split into fields inside of its [Arena].
#[derive(Debug)]
pub struct Packed {
    pub arena: Arena,
    pub fields: Vec<Span>,
    pub list: Vec<Span>,
}

impl Packed {
    pub fn field(&self, index: usize) -> &[u8] {
        self.arena.field(self.fields[index])
    }
}

/// Split a line into the fields of `schema` and pack them for a caller
/// buffer of `capacity` bytes.
///
/// Fails with [NssError::NotFound] if the line does not match the schema
/// and with [NssError::BUFFER_TOO_SMALL] if the record does not fit.
/// Nothing is allocated before both checks passed.
pub fn pack(schema: &Schema, line: &Line, capacity: usize) -> NssResult<Packed> {
    let text = line.text();

    let count = if text.is_empty() {
        0
    } else {
        count_delim(text, FIELD_DELIM) + 1
    };
    if count != schema.field_count() {
        return Err(NssError::NotFound);
    }
    for (rule, field) in schema.fields.iter().zip(text.split(|&c| c == FIELD_DELIM)) {
        rule.check(field)?;
    }

    // One slot per list entry plus the terminating null pointer.
    // Two slots at least, so that a single entry still is terminated.
    let slots = match schema.list_field() {
        Some(index) => {
            let list = text
                .split(|&c| c == FIELD_DELIM)
                .nth(index)
                .unwrap_or_default();
            count_delim(list, LIST_DELIM) + 2
        }
        None => 0,
    };
    let offset = slots * PTR_SIZE;
    let needed = offset + text.len() + 1;
    if needed > capacity {
        return Err(NssError::BUFFER_TOO_SMALL);
    }

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(needed)
        .map_err(|_| NssError::TRANSIENT)?;
    bytes.resize(offset, 0);
    bytes.extend_from_slice(text);
    bytes.push(0);

    let fields = split_in_place(&mut bytes, Span::new(offset, text.len()), FIELD_DELIM)?;
    debug_assert_eq!(fields.len(), schema.field_count());
    let list = match schema.list_field() {
        Some(index) => split_in_place(&mut bytes, fields[index], LIST_DELIM)?,
        None => Vec::new(),
    };
    debug_assert!(slots == 0 || list.len() < slots);

    Ok(Packed {
        arena: Arena { bytes, slots },
        fields,
        list,
    })
}

/// A record that can be packed from one line of external command output.
pub trait Record: Sized + std::fmt::Display {
    const SCHEMA: Schema;

    /// Build the typed record from a line that matched [Record::SCHEMA].
    fn from_packed(packed: Packed) -> NssResult<Self>;

    /// The numeric id the threshold gate applies to, if any.
    fn id(&self) -> Option<u32>;

    fn arena(&self) -> &Arena;

    fn pack(line: &Line, capacity: usize) -> NssResult<Self> {
        Self::from_packed(pack(&Self::SCHEMA, line, capacity)?)
    }
}

/// Format a field for display.
pub(crate) fn show(field: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(field)
}


// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::status::{NssError, NssResult};
use std::ops::Range;

/// Location of a field inside of a byte buffer.
///
/// The terminator following the field is not part of the span.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Span {
    start: usize,
    len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Split the `region` of `buf` on every occurrence of `delim`.
///
/// Each delimiter is overwritten with a NUL byte, so that every field
/// becomes a terminated string of its own.
/// Empty fields between two delimiters or at the region boundaries are kept.
/// An empty region has no fields at all.
///
/// The returned spans are offsets into `buf`.
pub fn split_in_place(buf: &mut [u8], region: Span, delim: u8) -> NssResult<Vec<Span>> {
    debug_assert_ne!(delim, 0);
    if region.is_empty() {
        return Ok(Vec::new());
    }

    let count = buf[region.range()].iter().filter(|&&c| c == delim).count() + 1;
    let mut fields = Vec::new();
    fields
        .try_reserve_exact(count)
        .map_err(|_| NssError::TRANSIENT)?;

    let mut start = region.start();
    for i in region.range() {
        if buf[i] == delim {
            buf[i] = 0;
            fields.push(Span::new(start, i - start));
            start = i + 1;
        }
    }
    fields.push(Span::new(start, region.end() - start));

    Ok(fields)
}

/// Number of occurrences of `delim` in `buf`.
pub fn count_delim(buf: &[u8], delim: u8) -> usize {
    buf.iter().filter(|&&c| c == delim).count()
}


// vim: ts=4 sw=4 expandtab

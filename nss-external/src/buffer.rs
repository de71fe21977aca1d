// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use libc::{c_char, size_t};
use nss_external_engine::{Arena, NssError, NssResult};
use std::{ffi::CStr, mem::align_of, ptr::copy_nonoverlapping};

/// The memory a caller provides for the strings of one entry.
pub struct CallerBuffer {
    base: *mut c_char,
    capacity: usize,
}

impl CallerBuffer {
    /// Wrap a caller buffer.
    ///
    /// If `aligned` is true, leading bytes are skipped until the start is
    /// suitable for an array of pointers. Skipped bytes count against the
    /// capacity.
    ///
    /// # Safety
    ///
    /// `buffer` must be null or valid for writes of `buflen` bytes
    /// for the lifetime of the returned object.
    pub unsafe fn new(buffer: *mut c_char, buflen: size_t, aligned: bool) -> NssResult<Self> {
        if buffer.is_null() {
            return Err(NssError::TRANSIENT);
        }
        let pad = if aligned {
            buffer.align_offset(align_of::<*mut c_char>())
        } else {
            0
        };
        if pad > buflen {
            return Ok(Self {
                base: buffer,
                capacity: 0,
            });
        }
        Ok(Self {
            // SAFETY: pad is within the buffer.
            base: unsafe { buffer.add(pad) },
            capacity: buflen - pad,
        })
    }

    /// Usable bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy `arena` to the start of the buffer.
    pub fn store<'a>(&self, arena: &'a Arena) -> NssResult<Stored<'a>> {
        if arena.len() > self.capacity {
            return Err(NssError::BUFFER_TOO_SMALL);
        }
        // SAFETY:
        // The buffer is valid for `capacity` bytes and does not overlap
        // with the arena, which is owned by us.
        unsafe {
            copy_nonoverlapping(arena.as_bytes().as_ptr(), self.base.cast::<u8>(), arena.len());
        }
        Ok(Stored {
            base: self.base,
            arena,
        })
    }
}

/// An arena that has been copied into the caller buffer.
pub struct Stored<'a> {
    base: *mut c_char,
    arena: &'a Arena,
}

impl Stored<'_> {
    /// Pointer to the copy of `field` in the caller buffer.
    ///
    /// `field` must have been obtained from the stored arena.
    pub fn ptr(&self, field: &[u8]) -> NssResult<*mut c_char> {
        let offset = self.arena.offset_of(field).ok_or(NssError::TRANSIENT)?;
        // SAFETY: offset is inside of the copied arena.
        Ok(unsafe { self.base.add(offset) })
    }

    /// Write the pointers of `fields` into the slot region
    /// and return the pointer array.
    ///
    /// The slots following the last field stay null.
    pub fn slots<'f>(
        &self,
        fields: impl Iterator<Item = &'f [u8]>,
    ) -> NssResult<*mut *mut c_char> {
        let array = self.base.cast::<*mut c_char>();
        for (index, field) in fields.enumerate() {
            // Keep the last slot as terminator.
            if index + 1 >= self.arena.slots() {
                return Err(NssError::TRANSIENT);
            }
            let ptr = self.ptr(field)?;
            // SAFETY:
            // The slot region is at the aligned buffer start
            // and holds `slots()` pointers.
            unsafe { array.add(index).write(ptr) };
        }
        Ok(array)
    }
}

/// Get the bytes of a C string argument.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL terminated string.
pub unsafe fn key<'a>(ptr: *const c_char) -> NssResult<&'a [u8]> {
    if ptr.is_null() {
        return Err(NssError::NotFound);
    }
    // SAFETY: See the function contract.
    Ok(unsafe { CStr::from_ptr(ptr) }.to_bytes())
}


// vim: ts=4 sw=4 expandtab

// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{
    buffer::{key, CallerBuffer},
    entry,
};
use libc::{c_char, c_int, gid_t, group, size_t};
use nss_external_engine::{Group, NssError, NssResult, Record as _, RecordKind, Resolver};

/// Copy `gr` into the caller memory.
/// The member pointer array is placed at the start of the buffer.
///
/// # Safety
///
/// `result` must be null or valid for writes.
unsafe fn store(gr: &Group, buf: &CallerBuffer, result: *mut group) -> NssResult<()> {
    if result.is_null() {
        return Err(NssError::TRANSIENT);
    }
    let out = buf.store(gr.arena())?;
    let value = group {
        gr_name: out.ptr(gr.name())?,
        gr_passwd: out.ptr(gr.passwd())?,
        gr_gid: gr.gid(),
        gr_mem: out.slots(gr.members())?,
    };
    // SAFETY: See the function contract.
    unsafe { result.write(value) };
    Ok(())
}

/// Store the next enumerated entry.
/// A null `result` is rejected before the scan moves on.
///
/// # Safety
///
/// `result` must be null or valid for writes.
/// `buffer` must be null or valid for writes of `buflen` bytes.
unsafe fn next(
    res: &Resolver<'_>,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
) -> NssResult<()> {
    // SAFETY: See the function contract.
    unsafe {
        let buf = CallerBuffer::new(buffer, buflen, true)?;
        if result.is_null() {
            return Err(NssError::TRANSIENT);
        }
        let gr = res.next::<Group>(buf.capacity())?;
        store(&gr, &buf, result)
    }
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getgrnam_r(
    name: *const c_char,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry(errnop, |res| {
        // SAFETY: glibc passes valid pointers.
        unsafe {
            let buf = CallerBuffer::new(buffer, buflen, true)?;
            let gr = res.group_by_name(key(name)?, buf.capacity())?;
            store(&gr, &buf, result)
        }
    })
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getgrgid_r(
    gid: gid_t,
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry(errnop, |res| {
        // SAFETY: glibc passes valid pointers.
        unsafe {
            let buf = CallerBuffer::new(buffer, buflen, true)?;
            let gr = res.group_by_gid(gid, buf.capacity())?;
            store(&gr, &buf, result)
        }
    })
}

#[no_mangle]
pub extern "C" fn _nss_external_setgrent(_stayopen: c_int) -> c_int {
    entry(std::ptr::null_mut(), |res| res.begin(RecordKind::Group))
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getgrent_r(
    result: *mut group,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry(errnop, |res| {
        // SAFETY: glibc passes valid pointers.
        unsafe { next(res, result, buffer, buflen) }
    })
}

#[no_mangle]
pub extern "C" fn _nss_external_endgrent() -> c_int {
    entry(std::ptr::null_mut(), |res| res.end(RecordKind::Group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch,
        tests::{config, script, USER},
    };
    use nss_external_engine::{command::Line, record::PTR_SIZE, Sessions};
    use std::{ffi::CStr, mem::zeroed, ptr::null_mut};
    use tempfile::TempDir;

    const LINE: &str = "devs:*:700:ann,ben,cid,dan";

    /// Read the member list of `gr`.
    unsafe fn members(gr: &group) -> Vec<String> {
        let mut list = Vec::new();
        let mut slot = gr.gr_mem;
        // SAFETY: The list is null terminated.
        unsafe {
            while !(*slot).is_null() {
                list.push(CStr::from_ptr(*slot).to_string_lossy().into_owned());
                slot = slot.add(1);
            }
        }
        list
    }

    #[test]
    fn test_store() {
        let gr = Group::pack(&Line::from(LINE), 1024).unwrap();
        let mut mem = vec![0xAA_u64; 16];
        let buf = unsafe { CallerBuffer::new(mem.as_mut_ptr().cast(), 128, true) }.unwrap();

        assert_eq!(
            unsafe { store(&gr, &buf, null_mut()) },
            Err(NssError::TRANSIENT)
        );

        let mut out: group = unsafe { zeroed() };
        unsafe { store(&gr, &buf, &mut out) }.unwrap();
        unsafe {
            assert_eq!(CStr::from_ptr(out.gr_name).to_bytes(), b"devs");
            assert_eq!(CStr::from_ptr(out.gr_passwd).to_bytes(), b"*");
            assert_eq!(out.gr_gid, 700);
            assert_eq!(out.gr_mem.cast::<u64>(), mem.as_mut_ptr());
            assert_eq!(members(&out), ["ann", "ben", "cid", "dan"]);
        }
    }

    #[test]
    fn test_store_empty_member_list() {
        let gr = Group::pack(&Line::from("none:x:701:"), 1024).unwrap();
        let mut mem = vec![0xAA_u64; 8];
        let buf = unsafe { CallerBuffer::new(mem.as_mut_ptr().cast(), 64, true) }.unwrap();
        let mut out: group = unsafe { zeroed() };
        unsafe { store(&gr, &buf, &mut out) }.unwrap();
        assert!(unsafe { members(&out) }.is_empty());
    }

    #[test]
    fn test_enumerate() {
        let dir = TempDir::new().unwrap();
        let conf = config(&script(&dir, "cmd", &format!("{LINE}\n")));
        let sessions = Sessions::new();
        let needed = 5 * PTR_SIZE + LINE.len() + 1;
        let mut mem = vec![0_u64; needed.div_ceil(8) + 1];
        let buffer = mem.as_mut_ptr().cast::<c_char>();
        let mut out: group = unsafe { zeroed() };
        let mut errno: c_int = 0;

        let mut call = |op: &mut dyn FnMut(&Resolver<'_>) -> NssResult<()>| {
            errno = 0;
            let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, op);
            (status, errno)
        };

        assert_eq!(call(&mut |res| res.begin(RecordKind::Group)), (1, 0));

        // One byte short.
        assert_eq!(
            call(&mut |res| unsafe { next(res, &mut out, buffer, needed - 1) }),
            (-2, libc::ERANGE)
        );
        // No result location.
        assert_eq!(
            call(&mut |res| unsafe { next(res, null_mut(), buffer, needed) }),
            (-2, libc::EAGAIN)
        );
        assert_eq!(sessions.lock(RecordKind::Group).position(), 0);

        assert_eq!(
            call(&mut |res| unsafe { next(res, &mut out, buffer, needed) }),
            (1, 0)
        );
        unsafe {
            assert_eq!(CStr::from_ptr(out.gr_name).to_bytes(), b"devs");
            assert_eq!(out.gr_gid, 700);
            assert_eq!(members(&out), ["ann", "ben", "cid", "dan"]);
        }

        assert_eq!(
            call(&mut |res| unsafe { next(res, &mut out, buffer, needed) }),
            (0, libc::ENOENT)
        );
        assert_eq!(call(&mut |res| res.end(RecordKind::Group)), (1, 0));
        assert_eq!(call(&mut |res| res.end(RecordKind::Group)), (1, 0));
    }
}

// vim: ts=4 sw=4 expandtab

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
use libc::{c_char, c_int, c_long, c_ulong, size_t, spwd};
use nss_external_engine::{NssError, NssResult, Record as _, RecordKind, Resolver, Shadow};

fn long(value: i64) -> NssResult<c_long> {
    c_long::try_from(value).map_err(|_| NssError::NotFound)
}

fn ulong(value: u64) -> NssResult<c_ulong> {
    if value == u64::MAX {
        Ok(c_ulong::MAX)
    } else {
        c_ulong::try_from(value).map_err(|_| NssError::NotFound)
    }
}

/// Copy `sp` into the caller memory.
///
/// # Safety
///
/// `result` must be null or valid for writes.
unsafe fn store(sp: &Shadow, buf: &CallerBuffer, result: *mut spwd) -> NssResult<()> {
    if result.is_null() {
        return Err(NssError::TRANSIENT);
    }
    let out = buf.store(sp.arena())?;
    let value = spwd {
        sp_namp: out.ptr(sp.name())?,
        sp_pwdp: out.ptr(sp.pwdp())?,
        sp_lstchg: long(sp.last_change())?,
        sp_min: long(sp.min())?,
        sp_max: long(sp.max())?,
        sp_warn: long(sp.warn())?,
        sp_inact: long(sp.inactive())?,
        sp_expire: long(sp.expire())?,
        sp_flag: ulong(sp.flag())?,
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
    result: *mut spwd,
    buffer: *mut c_char,
    buflen: size_t,
) -> NssResult<()> {
    // SAFETY: See the function contract.
    unsafe {
        let buf = CallerBuffer::new(buffer, buflen, false)?;
        if result.is_null() {
            return Err(NssError::TRANSIENT);
        }
        let sp = res.next::<Shadow>(buf.capacity())?;
        store(&sp, &buf, result)
    }
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getspnam_r(
    name: *const c_char,
    result: *mut spwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry(errnop, |res| {
        // SAFETY: glibc passes valid pointers.
        unsafe {
            let buf = CallerBuffer::new(buffer, buflen, false)?;
            let sp = res.shadow_by_name(key(name)?, buf.capacity())?;
            store(&sp, &buf, result)
        }
    })
}

#[no_mangle]
pub extern "C" fn _nss_external_setspent(_stayopen: c_int) -> c_int {
    entry(std::ptr::null_mut(), |res| res.begin(RecordKind::Shadow))
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getspent_r(
    result: *mut spwd,
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
pub extern "C" fn _nss_external_endspent() -> c_int {
    entry(std::ptr::null_mut(), |res| res.end(RecordKind::Shadow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch,
        tests::{config, script, ROOT, USER},
    };
    use nss_external_engine::{command::Line, Sessions};
    use std::{ffi::CStr, mem::zeroed, ptr::null_mut};
    use tempfile::TempDir;

    const LINE: &str = "alice:$6$salt$hash:19000:0:99999:7:::";

    #[test]
    fn test_store() {
        let sp = Shadow::pack(&Line::from(LINE), 1024).unwrap();
        let mut mem = vec![0xAA_u8; 64];
        let buf = unsafe { CallerBuffer::new(mem.as_mut_ptr().cast(), 64, false) }.unwrap();

        assert_eq!(
            unsafe { store(&sp, &buf, null_mut()) },
            Err(NssError::TRANSIENT)
        );

        let mut out: spwd = unsafe { zeroed() };
        unsafe { store(&sp, &buf, &mut out) }.unwrap();
        unsafe {
            assert_eq!(CStr::from_ptr(out.sp_namp).to_bytes(), b"alice");
            assert_eq!(CStr::from_ptr(out.sp_pwdp).to_bytes(), b"$6$salt$hash");
        }
        assert_eq!(out.sp_lstchg, 19000);
        assert_eq!(out.sp_min, 0);
        assert_eq!(out.sp_max, 99999);
        assert_eq!(out.sp_warn, 7);
        assert_eq!(out.sp_inact, -1);
        assert_eq!(out.sp_expire, -1);
        assert_eq!(out.sp_flag, c_ulong::MAX);
    }

    #[test]
    fn test_enumerate_requires_root() {
        let dir = TempDir::new().unwrap();
        let conf = config(&script(&dir, "cmd", &format!("{LINE}\n")));
        let sessions = Sessions::new();
        let mut mem = vec![0_u8; 128];
        let mut out: spwd = unsafe { zeroed() };
        let mut errno: c_int = 0;

        let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, |res| {
            res.begin(RecordKind::Shadow)
        });
        assert_eq!((status, errno), (-1, libc::EPERM));
        let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, |res| unsafe {
            next(res, &mut out, mem.as_mut_ptr().cast(), mem.len())
        });
        assert_eq!((status, errno), (-1, libc::EPERM));

        let status = dispatch(ROOT, || Some(&conf), &sessions, &mut errno, |res| {
            res.begin(RecordKind::Shadow)
        });
        assert_eq!(status, 1);
        let status = dispatch(ROOT, || Some(&conf), &sessions, &mut errno, |res| unsafe {
            next(res, &mut out, mem.as_mut_ptr().cast(), mem.len())
        });
        assert_eq!(status, 1);
        assert_eq!(unsafe { CStr::from_ptr(out.sp_namp) }.to_bytes(), b"alice");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(long(-1), Ok(-1));
        assert_eq!(long(19000), Ok(19000));
        assert_eq!(ulong(u64::MAX), Ok(c_ulong::MAX));
        assert_eq!(ulong(0), Ok(0));
    }
}

// vim: ts=4 sw=4 expandtab

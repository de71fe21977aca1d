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
use libc::{c_char, c_int, passwd, size_t, uid_t};
use nss_external_engine::{NssError, NssResult, Passwd, Record as _, RecordKind, Resolver};

/// Copy `pw` into the caller memory.
///
/// # Safety
///
/// `result` must be null or valid for writes.
unsafe fn store(pw: &Passwd, buf: &CallerBuffer, result: *mut passwd) -> NssResult<()> {
    if result.is_null() {
        return Err(NssError::TRANSIENT);
    }
    let out = buf.store(pw.arena())?;
    let value = passwd {
        pw_name: out.ptr(pw.name())?,
        pw_passwd: out.ptr(pw.passwd())?,
        pw_uid: pw.uid(),
        pw_gid: pw.gid(),
        pw_gecos: out.ptr(pw.gecos())?,
        pw_dir: out.ptr(pw.dir())?,
        pw_shell: out.ptr(pw.shell())?,
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
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
) -> NssResult<()> {
    // SAFETY: See the function contract.
    unsafe {
        let buf = CallerBuffer::new(buffer, buflen, false)?;
        if result.is_null() {
            return Err(NssError::TRANSIENT);
        }
        let pw = res.next::<Passwd>(buf.capacity())?;
        store(&pw, &buf, result)
    }
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getpwnam_r(
    name: *const c_char,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry(errnop, |res| {
        // SAFETY: glibc passes valid pointers.
        unsafe {
            let buf = CallerBuffer::new(buffer, buflen, false)?;
            let pw = res.passwd_by_name(key(name)?, buf.capacity())?;
            store(&pw, &buf, result)
        }
    })
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getpwuid_r(
    uid: uid_t,
    result: *mut passwd,
    buffer: *mut c_char,
    buflen: size_t,
    errnop: *mut c_int,
) -> c_int {
    entry(errnop, |res| {
        // SAFETY: glibc passes valid pointers.
        unsafe {
            let buf = CallerBuffer::new(buffer, buflen, false)?;
            let pw = res.passwd_by_uid(uid, buf.capacity())?;
            store(&pw, &buf, result)
        }
    })
}

#[no_mangle]
pub extern "C" fn _nss_external_setpwent(_stayopen: c_int) -> c_int {
    entry(std::ptr::null_mut(), |res| res.begin(RecordKind::Passwd))
}

/// # Safety
///
/// Called by glibc with valid pointers.
#[no_mangle]
pub unsafe extern "C" fn _nss_external_getpwent_r(
    result: *mut passwd,
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
pub extern "C" fn _nss_external_endpwent() -> c_int {
    entry(std::ptr::null_mut(), |res| res.end(RecordKind::Passwd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch,
        tests::{config, script, USER},
    };
    use nss_external_conf::Config;
    use nss_external_engine::{command::Line, Sessions};
    use std::{ffi::CStr, mem::zeroed, ptr::null_mut};
    use tempfile::TempDir;

    #[test]
    fn test_store() {
        let pw = Passwd::pack(&Line::from("alice:x:1000:100:Alice A:/home/alice:/bin/sh"), 1024)
            .unwrap();
        let mut mem = vec![0xAA_u8; 64];
        let buf = unsafe { CallerBuffer::new(mem.as_mut_ptr().cast(), 64, false) }.unwrap();

        assert_eq!(
            unsafe { store(&pw, &buf, null_mut()) },
            Err(NssError::TRANSIENT)
        );

        let mut out: passwd = unsafe { zeroed() };
        unsafe { store(&pw, &buf, &mut out) }.unwrap();
        unsafe {
            assert_eq!(CStr::from_ptr(out.pw_name).to_bytes(), b"alice");
            assert_eq!(CStr::from_ptr(out.pw_passwd).to_bytes(), b"x");
            assert_eq!(out.pw_uid, 1000);
            assert_eq!(out.pw_gid, 100);
            assert_eq!(CStr::from_ptr(out.pw_gecos).to_bytes(), b"Alice A");
            assert_eq!(CStr::from_ptr(out.pw_dir).to_bytes(), b"/home/alice");
            assert_eq!(CStr::from_ptr(out.pw_shell).to_bytes(), b"/bin/sh");
            assert_eq!(out.pw_name, mem.as_mut_ptr().cast::<c_char>());
        }

        let small = unsafe { CallerBuffer::new(mem.as_mut_ptr().cast(), 8, false) }.unwrap();
        assert_eq!(
            unsafe { store(&pw, &small, &mut out) },
            Err(NssError::BUFFER_TOO_SMALL)
        );
    }

    #[test]
    fn test_enumerate_skips_system_accounts() {
        let dir = TempDir::new().unwrap();
        let output = "root:x:0:0::/root:/bin/sh\nbob:x:1001:100::/home/bob:/bin/sh\n";
        let conf = config(&script(&dir, "cmd", output));
        let sessions = Sessions::new();
        let mut mem = vec![0_u8; 256];
        let mut out: passwd = unsafe { zeroed() };
        let mut errno: c_int = 0;

        let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, |res| {
            res.begin(RecordKind::Passwd)
        });
        assert_eq!(status, 1);

        let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, |res| unsafe {
            next(res, &mut out, mem.as_mut_ptr().cast(), mem.len())
        });
        assert_eq!(status, 1);
        assert_eq!(unsafe { CStr::from_ptr(out.pw_name) }.to_bytes(), b"bob");

        let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, |res| unsafe {
            next(res, &mut out, mem.as_mut_ptr().cast(), mem.len())
        });
        assert_eq!((status, errno), (0, libc::ENOENT));
    }

    #[test]
    fn test_enumerate_without_begin() {
        let conf = Config::new();
        let sessions = Sessions::new();
        let mut mem = vec![0_u8; 64];
        let mut out: passwd = unsafe { zeroed() };
        let mut errno: c_int = 0;
        let status = dispatch(USER, || Some(&conf), &sessions, &mut errno, |res| unsafe {
            next(res, &mut out, mem.as_mut_ptr().cast(), mem.len())
        });
        assert_eq!((status, errno), (-1, libc::ENOENT));
    }
}

// vim: ts=4 sw=4 expandtab

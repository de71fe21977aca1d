// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! glibc NSS module `external`.
//!
//! Add `external` to the `passwd`, `group` and `shadow` lines of
//! `/etc/nsswitch.conf` to resolve identities by running the commands
//! configured in `nss-external.conf`.

mod buffer;
mod group;
mod passwd;
mod shadow;

use libc::c_int;
use log::warn;
use nss_external_conf::Config;
use nss_external_engine::{Errno, NssError, NssResult, NssStatus, Caller, Resolver, Sessions};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::OnceLock,
};

/// Environment variable with the `env_logger` filter.
const LOG_ENV: &str = "NSS_EXTERNAL_LOG";

/// Enumeration state of this process.
static SESSIONS: Sessions = Sessions::new();

/// Configuration of this process. `None` if it is unusable.
static CONFIG: OnceLock<Option<Config>> = OnceLock::new();

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "off" };
    // The host program may have its own logger.
    let _ = env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, default))
        .format_timestamp(None)
        .try_init();
}

fn config() -> Option<&'static Config> {
    CONFIG
        .get_or_init(|| {
            let path = Config::get_default_path();
            let mut conf = Config::new();
            let res = conf.load(&path);
            init_logging(res.is_ok() && conf.debug());
            match res {
                Ok(()) => Some(conf),
                Err(e) => {
                    warn!("Unusable configuration: {e:#}");
                    None
                }
            }
        })
        .as_ref()
}

/// Run one NSS operation with the given process state
/// and translate its outcome for glibc.
///
/// `conf` is only consulted if the kill switch is not set.
fn dispatch<'a>(
    caller: Caller,
    conf: impl FnOnce() -> Option<&'a Config>,
    sessions: &'a Sessions,
    errnop: *mut c_int,
    op: impl FnOnce(&Resolver<'_>) -> NssResult<()>,
) -> c_int {
    let res = catch_unwind(AssertUnwindSafe(|| {
        // The kill switch wins over an unusable configuration.
        if caller.disabled {
            return Err(NssError::NotFound);
        }
        let conf = conf().ok_or(NssError::Unavailable(Errno::NoEnt))?;

        // SAFETY: Flushing all C streams has no preconditions.
        unsafe { libc::fflush(std::ptr::null_mut()) };

        op(&Resolver::with_caller(conf, sessions, caller))
    }))
    .unwrap_or_else(|_| {
        warn!("Operation panicked.");
        Err(NssError::Unavailable(Errno::NoEnt))
    });

    match res {
        Ok(()) => NssStatus::Success.into(),
        Err(e) => {
            if !errnop.is_null() {
                // SAFETY: glibc passes a valid errno location.
                unsafe { errnop.write(e.errno().raw()) };
            }
            e.status().into()
        }
    }
}

/// Run one NSS operation of this process.
fn entry(errnop: *mut c_int, op: impl FnOnce(&Resolver<'_>) -> NssResult<()>) -> c_int {
    dispatch(Caller::current(), config, &SESSIONS, errnop, op)
}


// vim: ts=4 sw=4 expandtab

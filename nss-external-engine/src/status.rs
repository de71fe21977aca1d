// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Result status of an NSS operation, as `enum nss_status` in glibc's `<nss.h>`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(i32)]
pub enum NssStatus {
    /// Transient failure. The caller may retry.
    TryAgain = -2,
    /// The service can not be consulted at all.
    Unavailable = -1,
    /// No such entry.
    NotFound = 0,
    Success = 1,
}

impl From<NssStatus> for i32 {
    fn from(status: NssStatus) -> i32 {
        status as _
    }
}

/// Diagnostic code attached to a failure, reported to the caller as `errno`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Errno {
    /// Temporarily out of resources.
    Again,
    /// The caller supplied buffer is too small.
    Range,
    /// Entry or external command not found.
    NoEnt,
    /// Permission denied.
    Perm,
}

impl Errno {
    pub fn raw(&self) -> i32 {
        match self {
            Self::Again => libc::EAGAIN,
            Self::Range => libc::ERANGE,
            Self::NoEnt => libc::ENOENT,
            Self::Perm => libc::EPERM,
        }
    }
}

/// Failure of an NSS operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NssError {
    /// Transient failure. Retrying the same call may succeed.
    /// [Errno::Range] means that the caller must retry with a larger buffer.
    TryAgain(Errno),
    /// No such entry, or end of enumeration.
    NotFound,
    /// The external command can not be consulted.
    Unavailable(Errno),
}

impl NssError {
    /// The destination buffer is too small for the record.
    pub const BUFFER_TOO_SMALL: Self = Self::TryAgain(Errno::Range);

    /// Allocation failed or the destination is invalid.
    pub const TRANSIENT: Self = Self::TryAgain(Errno::Again);

    pub fn is_buffer_too_small(&self) -> bool {
        *self == Self::BUFFER_TOO_SMALL
    }

    pub fn status(&self) -> NssStatus {
        match self {
            Self::TryAgain(_) => NssStatus::TryAgain,
            Self::NotFound => NssStatus::NotFound,
            Self::Unavailable(_) => NssStatus::Unavailable,
        }
    }

    pub fn errno(&self) -> Errno {
        match self {
            Self::TryAgain(errno) | Self::Unavailable(errno) => *errno,
            Self::NotFound => Errno::NoEnt,
        }
    }
}

impl std::fmt::Display for NssError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Self::TryAgain(Errno::Range) => write!(f, "Buffer too small"),
            Self::TryAgain(_) => write!(f, "Temporary failure, try again"),
            Self::NotFound => write!(f, "Entry not found"),
            Self::Unavailable(Errno::Perm) => write!(f, "Permission denied"),
            Self::Unavailable(_) => write!(f, "Service unavailable"),
        }
    }
}

impl std::error::Error for NssError {}

/// Result of an NSS operation.
pub type NssResult<T> = Result<T, NssError>;


// vim: ts=4 sw=4 expandtab

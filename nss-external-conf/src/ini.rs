// -*- coding: utf-8 -*-
//
// Copyright (C) 2024 - 2026 Michael Büsch <m@bues.ch>
//
// Licensed under the Apache License version 2.0
// or the MIT license, at your option.
// SPDX-License-Identifier: Apache-2.0 OR MIT

use anyhow::{self as ah, format_err as err, Context as _};
use std::{collections::HashMap, io::Read as _, path::Path};

/// Simple `.ini` file parser.
///
/// A line ending in a backslash is continued on the next line.
/// Leading white space of the continuation line is dropped.
pub struct Ini {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Ini {
    pub fn new() -> Self {
        Self {
            sections: HashMap::new(),
        }
    }

    pub fn new_from_file(path: &Path) -> ah::Result<Self> {
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .context("Open configuration file")?;
        let mut buf = vec![];
        file.read_to_end(&mut buf)
            .context("Read configuration file")?;
        let content =
            String::from_utf8(buf).context("Configuration content file to UTF-8 conversion")?;
        let mut this = Self::new();
        this.parse_str(&content)?;
        Ok(this)
    }

    /// Join continued lines into logical lines.
    ///
    /// Returns the logical line and whether it was continued.
    fn logical_lines(content: &str) -> ah::Result<Vec<(String, bool)>> {
        let mut ret = Vec::with_capacity(32);
        let mut pending: Option<String> = None;
        for line in content.lines() {
            let piece = match &pending {
                Some(_) => line.trim_start(),
                None => line,
            };
            let is_comment = pending.is_none() && piece.trim_start().starts_with('#');
            if !is_comment {
                if let Some(head) = piece.strip_suffix('\\') {
                    pending.get_or_insert_with(String::new).push_str(head);
                    continue;
                }
            }
            match pending.take() {
                Some(mut joined) => {
                    joined.push_str(piece);
                    ret.push((joined, true));
                }
                None => ret.push((piece.to_string(), false)),
            }
        }
        if pending.is_some() {
            return Err(err!("Line continuation at the end of the file"));
        }
        Ok(ret)
    }

    pub fn parse_str(&mut self, content: &str) -> ah::Result<()> {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut in_section: Option<String> = None;
        for (line, continued) in Self::logical_lines(content)? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') {
                if continued {
                    return Err(err!("Line continuation in section header: '{line}'"));
                }
                let Some(sname) = line
                    .strip_prefix('[')
                    .and_then(|l| l.strip_suffix(']'))
                    .map(str::trim)
                else {
                    return Err(err!("Invalid section name: '{line}'"));
                };
                if sname.is_empty() {
                    return Err(err!("Section name is empty: '{line}'"));
                }
                if sections.contains_key(sname) {
                    return Err(err!("Duplicate section name: '{line}'"));
                }
                sections.insert(sname.to_string(), HashMap::new());
                in_section = Some(sname.to_string());
                continue;
            }
            let Some(section) = in_section.as_ref().and_then(|s| sections.get_mut(s)) else {
                return Err(err!("Option is not inside of a section: '{line}'"));
            };
            let Some((name, value)) = line.split_once('=') else {
                return Err(err!("Option has no equal sign '=': '{line}'"));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(err!("Option name is empty: '{line}'"));
            }
            section.insert(name.to_string(), value.trim().to_string());
        }
        self.sections = sections;
        Ok(())
    }

    /// Get the value of an option from the given section.
    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(option))
            .map(|v| v.as_str())
    }

    /// Check whether the given section is present.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections() {
        let mut ini = Ini::new();
        ini.parse_str("# comment\n[A]\nx = 1\n\n[B]\n  y=  two words  \n")
            .unwrap();
        assert!(ini.has_section("A"));
        assert!(ini.has_section("B"));
        assert!(!ini.has_section("C"));
        assert_eq!(ini.get("A", "x"), Some("1"));
        assert_eq!(ini.get("B", "y"), Some("two words"));
        assert_eq!(ini.get("A", "y"), None);
    }

    #[test]
    fn test_line_continuation() {
        let mut ini = Ini::new();
        let content = "\
[section1]
key1 = value1\\
       value2
key2 = this is a \\
       very long \\
       value

[section2]
key3 = no_continuation
";
        ini.parse_str(content).unwrap();
        assert_eq!(ini.get("section1", "key1"), Some("value1value2"));
        assert_eq!(ini.get("section1", "key2"), Some("this is a very long value"));
        assert_eq!(ini.get("section2", "key3"), Some("no_continuation"));
    }

    #[test]
    fn test_errors() {
        let mut ini = Ini::new();
        assert!(ini.parse_str("[section]\nkey = value\\").is_err());
        assert!(ini.parse_str("[section\\\n]").is_err());
        assert!(ini.parse_str("[section]\n# comment\\").is_ok());
        assert!(ini.parse_str("key = outside").is_err());
        assert!(ini.parse_str("[A]\n[A]\n").is_err());
        assert!(ini.parse_str("[]\n").is_err());
        assert!(ini.parse_str("[A]\nnoequals\n").is_err());
        assert!(ini.parse_str("[A]\n = x\n").is_err());
    }
}

// vim: ts=4 sw=4 expandtab

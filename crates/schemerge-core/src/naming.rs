use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Naming convention conversion applied uniformly to a working set of tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// `userRoles` -> `user_roles`.
    ToSeparated,
    /// `user_roles` -> `userRoles`.
    ToCompact,
    #[default]
    None,
}

impl NamingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingMode::ToSeparated => "to_separated",
            NamingMode::ToCompact => "to_compact",
            NamingMode::None => "none",
        }
    }
}

impl FromStr for NamingMode {
    type Err = Error;

    /// Accepts the serialized names, with `-` allowed for `_`.
    fn from_str(value: &str) -> Result<Self> {
        match value.trim().replace('-', "_").as_str() {
            "to_separated" => Ok(NamingMode::ToSeparated),
            "to_compact" => Ok(NamingMode::ToCompact),
            "none" => Ok(NamingMode::None),
            other => Err(Error::InvalidConfig(format!("unknown naming mode: {other}"))),
        }
    }
}

const SEPARATOR: char = '_';

/// Convert a table identifier between the compact and separated conventions.
///
/// The first character always keeps its case; only internal capitals mark
/// word boundaries. A separator is only consumed when a letter follows it, so
/// `oauth_2_token` becomes `oauth_2Token` rather than guessing at the digit.
pub fn normalize(name: &str, mode: NamingMode) -> String {
    match mode {
        NamingMode::ToSeparated => to_separated(name),
        NamingMode::ToCompact => to_compact(name),
        NamingMode::None => name.to_string(),
    }
}

fn to_separated(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (idx, ch) in name.chars().enumerate() {
        if idx > 0 && ch.is_ascii_uppercase() {
            out.push(SEPARATOR);
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn to_compact(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == SEPARATOR {
            if let Some(next) = chars.peek().copied() {
                if next.is_ascii_alphabetic() {
                    chars.next();
                    out.push(next.to_ascii_uppercase());
                    continue;
                }
            }
        }
        out.push(ch);
    }
    out
}

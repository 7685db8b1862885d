//! Schema description language.
//!
//! ```text
//! desc  := entry ("," entry)*
//! entry := name ":" code | name "[" desc? "]" | name
//! ```
//!
//! A bare name is a string column, `name[...]` a nested view column.

use crate::context::empty_meta;
use crate::error::{Error, Result};
use crate::item::ItemType;
use crate::view::{make_meta, View, MC_NAME, MC_SUBV, MC_TYPE};

/// Parse a description into a meta view.
pub fn parse_desc(desc: &str) -> Result<View> {
    let bytes = desc.as_bytes();
    let mut pos = 0;
    if bytes.is_empty() {
        return Ok(empty_meta());
    }
    let meta = parse_list(desc, &mut pos)?;
    if pos < bytes.len() {
        return Err(bad(desc, pos));
    }
    Ok(meta)
}

fn bad(desc: &str, pos: usize) -> Error {
    Error::Desc {
        desc: desc.to_string(),
        pos,
    }
}

fn parse_list(desc: &str, pos: &mut usize) -> Result<View> {
    let bytes = desc.as_bytes();
    let mut entries: Vec<(String, ItemType, View)> = Vec::new();

    loop {
        let from = *pos;
        while *pos < bytes.len() && !b":,[]".contains(&bytes[*pos]) {
            *pos += 1;
        }
        let name = desc[from..*pos].to_string();

        match bytes.get(*pos) {
            Some(b'[') => {
                *pos += 1;
                let sub = if bytes.get(*pos) == Some(&b']') {
                    empty_meta()
                } else {
                    parse_list(desc, pos)?
                };
                if bytes.get(*pos) != Some(&b']') {
                    return Err(bad(desc, *pos));
                }
                *pos += 1;
                entries.push((name, ItemType::View, sub));
            }
            Some(b':') => {
                *pos += 1;
                let ty = bytes.get(*pos).map_or(ItemType::Error, |c| ItemType::from_code(*c));
                if matches!(ty, ItemType::Error | ItemType::Unknown) {
                    return Err(bad(desc, *pos));
                }
                *pos += 1;
                entries.push((name, ty, empty_meta()));
            }
            _ => entries.push((name, ItemType::Str, empty_meta())),
        }

        if bytes.get(*pos) != Some(&b',') {
            break;
        }
        *pos += 1;
        if *pos >= bytes.len() || bytes[*pos] == b']' {
            break;
        }
    }

    let refs: Vec<(&str, ItemType, View)> = entries
        .iter()
        .map(|(n, t, s)| (n.as_str(), *t, s.clone()))
        .collect();
    Ok(make_meta(&refs))
}

fn meta_row(meta: &View, row: usize) -> (String, u8, View) {
    let name = meta.get(row, MC_NAME).as_str().unwrap_or_default().to_string();
    let code = meta
        .get(row, MC_TYPE)
        .as_str()
        .and_then(|s| s.bytes().next())
        .unwrap_or(b'?');
    let sub = meta.get(row, MC_SUBV).into_view().unwrap_or_else(empty_meta);
    (name, code, sub)
}

/// Canonical description of a meta view.
pub fn describe(meta: &View) -> String {
    let mut out = String::new();
    for r in 0..meta.size() {
        if r > 0 {
            out.push(',');
        }
        let (name, code, sub) = meta_row(meta, r);
        out.push_str(&name);
        if code == b'V' && sub.size() > 0 {
            out.push('[');
            out.push_str(&describe(&sub));
            out.push(']');
        } else {
            out.push(':');
            out.push(code as char);
        }
    }
    out
}

/// Type codes only, nested views in parentheses, e.g. `IS(SI)`.
pub fn structure(meta: &View) -> String {
    let mut out = String::new();
    for r in 0..meta.size() {
        let (_, code, sub) = meta_row(meta, r);
        if code == b'V' && sub.size() > 0 {
            out.push('(');
            out.push_str(&structure(&sub));
            out.push(')');
        } else {
            out.push(code as char);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_descriptions() {
        let meta = parse_desc("a:I,b,c[d:D,e[f:B]],g:V").unwrap();
        assert_eq!(meta.size(), 4);
        assert_eq!(describe(&meta), "a:I,b:S,c[d:D,e[f:B]],g:V");
        assert_eq!(structure(&meta), "IS(D(B))V");
    }

    #[test]
    fn empty_forms() {
        assert_eq!(parse_desc("").unwrap().size(), 0);
        let meta = parse_desc("a[]").unwrap();
        assert_eq!(meta.size(), 1);
        assert_eq!(describe(&meta), "a:V");
        assert_eq!(describe(&parse_desc("x,").unwrap()), "x:S");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_desc("a:Q"), Err(Error::Desc { pos: 2, .. })));
        assert!(parse_desc("a:I]").is_err());
        assert!(parse_desc("a[b:I").is_err());
        assert!(parse_desc("a:").is_err());
        assert!(parse_desc("a:IX").is_err());
    }

    #[test]
    fn meta_meta_describes_itself() {
        let mm = crate::context::meta_meta();
        assert_eq!(describe(&mm), "name:S,type:S,subv:V");
    }
}

//! Name handling shared by both conversion directions.

use std::cmp::Ordering;

/// Output stem used when a group name reduces to nothing.
pub const DEFAULT_STEM: &str = "-";

/// Characters replaced with `_` when deriving a material name.
const MATERIAL_SEPARATORS: [char; 7] = [' ', ';', ',', '+', '\r', '\t', '\n'];

/// Compare two strings treating runs of ASCII digits as numbers.
///
/// `Hull_2` sorts before `Hull_10`. Numeric runs that compare equal by value
/// fall back to their textual form so `01` and `1` still have a stable order.
#[must_use]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_digits(x), is_digits(y)) {
                    (true, true) => cmp_digits(x, y),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn is_digits(chunk: &str) -> bool {
    chunk.starts_with(|c: char| c.is_ascii_digit())
}

fn cmp_digits(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

/// Splits a string into alternating digit and non-digit runs.
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

/// Strip a trailing `_<integer>` LOD/part suffix from a group name.
///
/// `Hull_2` becomes `Hull`, `Hull_a` is returned unchanged.
#[must_use]
pub fn real_group_name(group: &str) -> &str {
    match group.rsplit_once('_') {
        Some((stem, suffix)) if suffix.parse::<i32>().is_ok() => stem,
        _ => group,
    }
}

/// File stem of the mdb a group is written to.
#[must_use]
pub fn output_stem(group: &str) -> &str {
    let stem = real_group_name(group);
    if stem.trim().is_empty() {
        DEFAULT_STEM
    } else {
        stem
    }
}

/// Final path component, accepting both `/` and `\` separators.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Replace the extension of the final path component, adding one if absent.
#[must_use]
pub fn change_extension(path: &str, extension: &str) -> String {
    let name_start = path.len() - file_name(path).len();
    let base = match path[name_start..].rfind('.') {
        Some(dot) => &path[..name_start + dot],
        None => path,
    };
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{extension}")
    }
}

/// Derive a material display name from a texture reference.
///
/// Separator characters become `_`, then directories and the extension are
/// dropped: `tex/Hull Plate.tga` gives `Hull_Plate`.
#[must_use]
pub fn material_name_from_texture(texture: &str) -> String {
    let cleaned: String = texture
        .chars()
        .map(|c| if MATERIAL_SEPARATORS.contains(&c) { '_' } else { c })
        .collect();
    let name = file_name(&cleaned);
    match name.rfind('.') {
        Some(dot) => name[..dot].to_string(),
        None => name.to_string(),
    }
}

//! Text form of the index: one `DIR(...)` or `FILE(...)` record per line,
//! meant to be expanded as C macros by the engine.

use crate::index::ResourceIndex;

pub const NULL_NAME: &str = "NULL";

/// Quotes `value` as a C string literal.
///
/// Bytes outside printable ASCII become three digit octal escapes, which,
/// unlike `\x`, cannot swallow a following hex digit.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');

    for byte in value.bytes() {
        match byte {
            b'\\' => quoted.push_str("\\\\"),
            b'"' => quoted.push_str("\\\""),
            b'\t' => quoted.push_str("\\t"),
            b'\n' => quoted.push_str("\\n"),
            b'\r' => quoted.push_str("\\r"),
            0x20..=0x7e => quoted.push(byte as char),
            _ => quoted.push_str(&format!("\\{byte:03o}")),
        }
    }

    quoted.push('"');
    quoted
}

pub fn render(index: &ResourceIndex) -> String {
    let mut lines = Vec::with_capacity(index.dirs.len() + index.files.len());

    for dir in &index.dirs {
        let name = dir
            .name
            .as_deref()
            .map(quote)
            .unwrap_or_else(|| NULL_NAME.to_string());
        lines.push(format!(
            "DIR({:5}, {}, {}, {}, {}, {})",
            dir.index,
            name,
            dir.subdirs.offset,
            dir.subdirs.count,
            dir.files.offset,
            dir.files.count
        ));

        for file in index.files_of(dir) {
            lines.push(format!(
                "FILE({:4}, {}, {}, {})",
                file.index,
                quote(file.content_id.as_str()),
                quote(&file.name),
                quote(&file.source_path.to_string_lossy())
            ));
        }
    }

    lines.join("\n")
}

use std::num::ParseIntError;
use std::path::PathBuf;

use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::index::format::NULL_NAME;
use crate::index::{ContentId, DirRow, FileRow, ResourceIndex, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Quoted(String),
    Bare(String),
}

/// An index read back from its text form, with the engine's path lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndex {
    index: ResourceIndex,
}

impl ParsedIndex {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut dirs: Vec<DirRow> = Vec::new();
        let mut files: Vec<FileRow> = Vec::new();

        for (line_index, raw_line) in text.lines().enumerate() {
            let line = line_index + 1;
            let record = raw_line.trim();
            if record.is_empty() {
                continue;
            }

            if let Some(body) = record_body(record, "DIR") {
                let dir = parse_dir(line, body)?;
                ensure!(
                    dir.index == dirs.len(),
                    IndexOutOfOrderSnafu {
                        line,
                        expected: dirs.len(),
                        found: dir.index,
                    }
                );
                ensure!(
                    dir.name.is_some() || dir.index == 0,
                    UnnamedDirectorySnafu { line }
                );
                dirs.push(dir);
            } else if let Some(body) = record_body(record, "FILE") {
                let file = parse_file(line, body)?;
                ensure!(
                    file.index == files.len(),
                    IndexOutOfOrderSnafu {
                        line,
                        expected: files.len(),
                        found: file.index,
                    }
                );
                let owner = dirs.last().context(OrphanFileSnafu { line })?;
                ensure!(
                    owner.files.range().contains(&file.index),
                    OrphanFileSnafu { line }
                );
                files.push(file);
            } else {
                return UnknownRecordSnafu { line }.fail();
            }
        }

        ensure!(!dirs.is_empty(), MissingRootSnafu);
        for dir in &dirs {
            ensure!(
                dir.subdirs.range().end <= dirs.len() && dir.files.range().end <= files.len(),
                SpanOutOfBoundsSnafu { dir: dir.index }
            );
        }

        Ok(Self {
            index: ResourceIndex { dirs, files },
        })
    }

    pub fn dirs(&self) -> &[DirRow] {
        &self.index.dirs
    }

    pub fn files(&self) -> &[FileRow] {
        &self.index.files
    }

    pub fn into_index(self) -> ResourceIndex {
        self.index
    }

    /// Resolves a `/` separated directory path, starting from the root.
    pub fn lookup_dir(&self, path: &str) -> Option<&DirRow> {
        path.split('/')
            .filter(|name| !name.is_empty())
            .try_fold(&self.index.dirs[0], |dir, name| {
                self.index
                    .subdirs_of(dir)
                    .iter()
                    .find(|subdir| subdir.name.as_deref() == Some(name))
            })
    }

    /// Resolves a `/` separated file path, starting from the root.
    pub fn lookup_file(&self, path: &str) -> Option<&FileRow> {
        let (parent, name) = match path.trim_matches('/').rsplit_once('/') {
            Some((parent, name)) => (parent, name),
            None => ("", path.trim_matches('/')),
        };
        let dir = self.lookup_dir(parent)?;

        self.index
            .files_of(dir)
            .iter()
            .find(|file| file.name == name)
    }
}

fn record_body<'a>(record: &'a str, tag: &str) -> Option<&'a str> {
    record
        .strip_prefix(tag)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_dir(line: usize, body: &str) -> Result<DirRow, ParseError> {
    let fields = split_fields(line, body)?;
    ensure!(
        fields.len() == 6,
        FieldCountSnafu {
            line,
            expected: 6usize,
            found: fields.len(),
        }
    );

    let name = match &fields[1] {
        Field::Bare(token) if token == NULL_NAME => None,
        Field::Quoted(name) => Some(name.clone()),
        Field::Bare(_) => return InvalidFieldSnafu { line, field: "name" }.fail(),
    };

    Ok(DirRow {
        index: number(line, &fields[0], "index")?,
        name,
        subdirs: span(
            number(line, &fields[2], "subdir offset")?,
            number(line, &fields[3], "subdir count")?,
        ),
        files: span(
            number(line, &fields[4], "file offset")?,
            number(line, &fields[5], "file count")?,
        ),
    })
}

fn parse_file(line: usize, body: &str) -> Result<FileRow, ParseError> {
    let fields = split_fields(line, body)?;
    ensure!(
        fields.len() == 4,
        FieldCountSnafu {
            line,
            expected: 4usize,
            found: fields.len(),
        }
    );

    let content_id = ContentId::parse(quoted(line, &fields[1], "content id")?)
        .context(InvalidFieldSnafu {
            line,
            field: "content id",
        })?;

    Ok(FileRow {
        index: number(line, &fields[0], "index")?,
        content_id,
        name: quoted(line, &fields[2], "name")?.to_string(),
        source_path: PathBuf::from(quoted(line, &fields[3], "source path")?),
    })
}

fn span(offset: usize, count: usize) -> Span {
    Span { offset, count }
}

fn number(line: usize, field: &Field, name: &'static str) -> Result<usize, ParseError> {
    match field {
        Field::Bare(token) => token
            .parse()
            .context(InvalidNumberSnafu { line, field: name }),
        Field::Quoted(_) => InvalidFieldSnafu { line, field: name }.fail(),
    }
}

fn quoted<'a>(line: usize, field: &'a Field, name: &'static str) -> Result<&'a str, ParseError> {
    match field {
        Field::Quoted(value) => Ok(value),
        Field::Bare(_) => InvalidFieldSnafu { line, field: name }.fail(),
    }
}

/// Splits a record body on commas outside of string literals and unescapes
/// the literals.
fn split_fields(line: usize, body: &str) -> Result<Vec<Field>, ParseError> {
    let mut fields = Vec::new();
    let mut bytes = body.bytes().peekable();

    loop {
        while bytes.next_if(|b| b.is_ascii_whitespace()).is_some() {}

        let field = if bytes.next_if_eq(&b'"').is_some() {
            let mut value = Vec::new();
            loop {
                match bytes.next().context(UnterminatedStringSnafu { line })? {
                    b'"' => break,
                    b'\\' => value.push(unescape(line, &mut bytes)?),
                    byte => value.push(byte),
                }
            }
            let value = String::from_utf8(value).ok().context(InvalidUtf8Snafu { line })?;
            Field::Quoted(value)
        } else {
            let mut token = Vec::new();
            while let Some(byte) = bytes.next_if(|&b| b != b',') {
                token.push(byte);
            }
            Field::Bare(String::from_utf8_lossy(&token).trim().to_string())
        };
        fields.push(field);

        while bytes.next_if(|b| b.is_ascii_whitespace()).is_some() {}
        match bytes.next() {
            None => break,
            Some(b',') => continue,
            Some(_) => return InvalidFieldSnafu { line, field: "separator" }.fail(),
        }
    }

    Ok(fields)
}

fn unescape(
    line: usize,
    bytes: &mut std::iter::Peekable<std::str::Bytes<'_>>,
) -> Result<u8, ParseError> {
    let escaped = bytes.next().context(UnterminatedStringSnafu { line })?;
    let byte = match escaped {
        b'\\' => b'\\',
        b'"' => b'"',
        b't' => b'\t',
        b'n' => b'\n',
        b'r' => b'\r',
        b'0'..=b'7' => {
            let mut value = u32::from(escaped - b'0');
            for _ in 0..2 {
                match bytes.next_if(|b| (b'0'..=b'7').contains(b)) {
                    Some(digit) => value = value * 8 + u32::from(digit - b'0'),
                    None => break,
                }
            }
            u8::try_from(value)
                .ok()
                .context(InvalidEscapeSnafu { line })?
        }
        _ => return InvalidEscapeSnafu { line }.fail(),
    };
    Ok(byte)
}

#[derive(Debug, Snafu)]
pub enum ParseError {
    #[snafu(display("Line {}: unknown record", line))]
    UnknownRecordError { line: usize },
    #[snafu(display("Line {}: expected {} fields, found {}", line, expected, found))]
    FieldCountError {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[snafu(display("Line {}: malformed {}", line, field))]
    InvalidFieldError { line: usize, field: &'static str },
    #[snafu(display("Line {}: {} is not a number", line, field))]
    InvalidNumberError {
        line: usize,
        field: &'static str,
        source: ParseIntError,
    },
    #[snafu(display("Line {}: unterminated string literal", line))]
    UnterminatedStringError { line: usize },
    #[snafu(display("Line {}: invalid escape sequence", line))]
    InvalidEscapeError { line: usize },
    #[snafu(display("Line {}: string literal is not valid UTF-8", line))]
    InvalidUtf8Error { line: usize },
    #[snafu(display("Line {}: expected index {}, found {}", line, expected, found))]
    IndexOutOfOrderError {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[snafu(display("Line {}: only the root directory may be unnamed", line))]
    UnnamedDirectoryError { line: usize },
    #[snafu(display("Line {}: file record outside its directory's file span", line))]
    OrphanFileError { line: usize },
    #[snafu(display("Directory {} references entries past the end of a table", dir))]
    SpanOutOfBoundsError { dir: usize },
    #[snafu(display("Index has no root directory"))]
    MissingRootError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::format::{quote, render};
    use rstest::rstest;

    const EMPTY_ID: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn sample() -> String {
        [
            "DIR(    0, NULL, 1, 2, 0, 1)".to_string(),
            format!(r#"FILE(   0, "{EMPTY_ID}", "readme.txt", "/res/readme.txt")"#),
            r#"DIR(    1, "gfx", 3, 1, 1, 2)"#.to_string(),
            format!(r#"FILE(   1, "{EMPTY_ID}", "a.png", "/res/gfx/a.png")"#),
            format!(r#"FILE(   2, "{EMPTY_ID}", "b.png", "/res/gfx/b.png")"#),
            r#"DIR(    2, "sfx", 0, 0, 3, 1)"#.to_string(),
            format!(r#"FILE(   3, "{EMPTY_ID}", "boom.ogg", "/res/sfx/boom.ogg")"#),
            r#"DIR(    3, "ui", 0, 0, 4, 1)"#.to_string(),
            format!(r#"FILE(   4, "{EMPTY_ID}", "weird \"name\"\t\303\251", "/res/gfx/ui/w")"#),
        ]
        .join("\n")
    }

    #[test]
    fn parse_reads_all_records() {
        let parsed = ParsedIndex::parse(&sample()).expect("Parse failed");

        assert_eq!(parsed.dirs().len(), 4);
        assert_eq!(parsed.files().len(), 5);
        assert_eq!(parsed.dirs()[0].name, None);
        assert_eq!(parsed.dirs()[1].subdirs, Span { offset: 3, count: 1 });
        assert_eq!(parsed.files()[4].name, "weird \"name\"\té");
    }

    #[rstest]
    #[case("readme.txt", Some(0))]
    #[case("gfx/a.png", Some(1))]
    #[case("gfx/b.png", Some(2))]
    #[case("sfx/boom.ogg", Some(3))]
    #[case("gfx/ui/weird \"name\"\té", Some(4))]
    #[case("/gfx/a.png", Some(1))]
    #[case("gfx/missing.png", None)]
    #[case("sfx/a.png", None)]
    #[case("ui/weird", None)]
    #[case("gfx", None)]
    fn lookup_file_walks_spans(#[case] path: &str, #[case] expected: Option<usize>) {
        let parsed = ParsedIndex::parse(&sample()).unwrap();

        assert_eq!(parsed.lookup_file(path).map(|file| file.index), expected);
    }

    #[rstest]
    #[case("", Some(0))]
    #[case("gfx", Some(1))]
    #[case("gfx/ui", Some(3))]
    #[case("ui", None)]
    fn lookup_dir_walks_spans(#[case] path: &str, #[case] expected: Option<usize>) {
        let parsed = ParsedIndex::parse(&sample()).unwrap();

        assert_eq!(parsed.lookup_dir(path).map(|dir| dir.index), expected);
    }

    #[test]
    fn render_then_parse_preserves_tricky_names() {
        let name = "quote\" back\\ nl\n ctl\x01 utf8 ü";
        let text = format!(
            "DIR(    0, NULL, 0, 0, 0, 1)\nFILE(   0, \"{EMPTY_ID}\", {}, {})",
            quote(name),
            quote("/a, b/c")
        );

        let parsed = ParsedIndex::parse(&text).unwrap();

        assert_eq!(parsed.files()[0].name, name);
        assert_eq!(parsed.files()[0].source_path, PathBuf::from("/a, b/c"));
        assert_eq!(render(&parsed.clone().into_index()), text);
    }

    #[rstest]
    #[case("", "MissingRootError")]
    #[case("DIR(    0, NULL, 0, 0, 0)", "FieldCountError")]
    #[case("DIR(    1, NULL, 0, 0, 0, 0)", "IndexOutOfOrderError")]
    #[case("DIR(    0, \"x\", 0, 0, 0, 0)\nDIR(    1, NULL, 0, 0, 0, 0)", "UnnamedDirectoryError")]
    #[case("DIR(    0, NULL, 1, 1, 0, 0)", "SpanOutOfBoundsError")]
    #[case("DIR(    0, NULL, 0, 0, 0, 0)\nFILE(   0, \"00\", \"a\", \"/a\")", "InvalidFieldError")]
    #[case("DIR(    0, NULL, x, 0, 0, 0)", "InvalidNumberError")]
    #[case("DIR(    0, \"unterminated, 0, 0, 0, 0)", "UnterminatedStringError")]
    #[case("DIR(    0, \"bad\\q\", 0, 0, 0, 0)", "InvalidEscapeError")]
    #[case("DIR(    0, \"\\377\", 0, 0, 0, 0)", "InvalidUtf8Error")]
    #[case("LINK(0)", "UnknownRecordError")]
    fn parse_rejects_malformed_text(#[case] text: &str, #[case] expected: &str) {
        let error = ParsedIndex::parse(text).expect_err("Parse should fail");

        assert!(
            format!("{error:?}").starts_with(expected),
            "expected {expected}, got {error:?}"
        );
    }

    #[test]
    fn file_outside_its_directory_span_is_rejected() {
        let text = format!(
            "DIR(    0, NULL, 1, 1, 0, 0)\nFILE(   0, \"{EMPTY_ID}\", \"a\", \"/a\")\nDIR(    1, \"d\", 0, 0, 0, 1)"
        );

        let result = ParsedIndex::parse(&text);

        assert!(matches!(result, Err(ParseError::OrphanFileError { line: 2 })));
    }
}

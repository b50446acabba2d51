//! Result rendering: `%`-directive templates and source-line extraction.
//!
//! Templates are compiled up front so malformed format strings fail
//! before any query runs. `%s` re-reads the source file with a
//! forward-only line cursor, which is sound because result rows arrive
//! ordered by `(file, line, column)`.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use anyhow::{bail, Context, Result};

use super::mode;
use super::query::SearchRow;

/// A `%` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// `%f` file name
    File,
    /// `%l` line
    Line,
    /// `%c` column
    Column,
    /// `%C` context
    Context,
    /// `%n` symbol
    Symbol,
    /// `%m` pretty-printed mode
    Mode,
    /// `%k` kind code
    Kind,
    /// `%s` source line text
    Source,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Field(Field),
}

enum State {
    Literal,
    AfterPercent,
    AfterBackslash,
}

/// Compile a format template into render pieces.
///
/// Escapes `\t`, `\r`, `\n` translate; any other escaped character is
/// taken literally. An unknown directive or a trailing `%` is fatal.
pub fn compile_format(fmt: &str) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut state = State::Literal;

    for ch in fmt.chars() {
        match state {
            State::Literal => match ch {
                '%' => state = State::AfterPercent,
                '\\' => state = State::AfterBackslash,
                c => text.push(c),
            },
            State::AfterPercent => {
                let field = match ch {
                    'f' => Field::File,
                    'l' => Field::Line,
                    'c' => Field::Column,
                    'C' => Field::Context,
                    'n' => Field::Symbol,
                    'm' => Field::Mode,
                    'k' => Field::Kind,
                    's' => Field::Source,
                    c => bail!("invalid format specification: %{}", c),
                };
                if !text.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut text)));
                }
                pieces.push(Piece::Field(field));
                state = State::Literal;
            }
            State::AfterBackslash => {
                text.push(match ch {
                    't' => '\t',
                    'r' => '\r',
                    'n' => '\n',
                    c => c,
                });
                state = State::Literal;
            }
        }
    }

    if matches!(state, State::AfterPercent) {
        bail!("unexpected end of format string");
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }

    Ok(pieces)
}

struct OpenSource {
    name: String,
    reader: BufReader<File>,
    lnum: u64,
    line: String,
}

/// Cursor-advancing reader over at most one open source file.
#[derive(Default)]
pub struct SourceLines {
    open: Option<OpenSource>,
}

impl SourceLines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the text of `name:lnum` without its trailing newline.
    ///
    /// Lines strictly before the cursor cannot be revisited; a request
    /// past end-of-file yields an empty string.
    fn line(&mut self, name: &str, lnum: u64) -> Result<&str> {
        let reopen = match &self.open {
            Some(src) => src.name != name,
            None => true,
        };
        if reopen {
            let file =
                File::open(name).with_context(|| format!("unable to open source: {}", name))?;
            self.open = Some(OpenSource {
                name: name.to_string(),
                reader: BufReader::new(file),
                lnum: 0,
                line: String::new(),
            });
        }

        let src = match self.open.as_mut() {
            Some(src) => src,
            None => bail!("no open source file"),
        };

        while src.lnum < lnum {
            src.line.clear();
            let n = src
                .reader
                .read_line(&mut src.line)
                .with_context(|| format!("unable to read source: {}", src.name))?;
            if n == 0 {
                return Ok("");
            }
            src.lnum += 1;
        }

        if src.line.ends_with('\n') {
            src.line.pop();
        }
        Ok(&src.line)
    }
}

/// Render one result row through the compiled template.
pub fn render_row(
    pieces: &[Piece],
    row: &SearchRow,
    source: &mut SourceLines,
    out: &mut impl Write,
) -> Result<()> {
    for piece in pieces {
        match piece {
            Piece::Text(text) => out.write_all(text.as_bytes())?,
            Piece::Field(Field::File) => out.write_all(row.file.as_bytes())?,
            Piece::Field(Field::Line) => write!(out, "{}", row.line)?,
            Piece::Field(Field::Column) => write!(out, "{}", row.column)?,
            Piece::Field(Field::Context) => out.write_all(row.context.as_bytes())?,
            Piece::Field(Field::Symbol) => out.write_all(row.symbol.as_bytes())?,
            Piece::Field(Field::Mode) => out.write_all(mode::render(row.mode).as_bytes())?,
            Piece::Field(Field::Kind) => write!(out, "{}", char::from(row.kind as u8))?,
            Piece::Field(Field::Source) => {
                let text = source.line(&row.file, row.line as u64)?;
                out.write_all(text.as_bytes())?;
            }
        }
    }
    out.write_all(b"\n")?;
    Ok(())
}

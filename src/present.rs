//! Plain rendering of answers, one line per row.

use std::io::{self, Write};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    pipeline::{Answer, ErrorKind},
    sql::Cell,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

pub fn render<W: Write>(out: &mut W, answer: &Answer, format: Format) -> io::Result<()> {
    match format {
        Format::Text => render_text(out, answer),
        Format::Json => render_json(out, answer),
    }
}

fn render_text<W: Write>(out: &mut W, answer: &Answer) -> io::Result<()> {
    if let Some(sql) = &answer.sql {
        writeln!(out, "Generated SQL Query: {sql}")?;
    }

    match &answer.outcome {
        Ok(response) => {
            writeln!(out, "The Response is:")?;
            for row in &response.rows {
                writeln!(out, "{}", row_repr(row))?;
            }
        }
        Err(e) => writeln!(out, "An error occurred: {e}")?,
    }

    Ok(())
}

#[derive(Serialize)]
struct JsonAnswer<'a> {
    question: &'a str,
    sql: Option<&'a str>,
    #[serde(flatten)]
    body: JsonBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonBody<'a> {
    Rows {
        header: &'a [String],
        rows: &'a [Vec<Cell>],
    },
    Error {
        error: JsonError,
    },
}

#[derive(Serialize)]
struct JsonError {
    kind: ErrorKind,
    message: String,
}

fn render_json<W: Write>(out: &mut W, answer: &Answer) -> io::Result<()> {
    let body = match &answer.outcome {
        Ok(response) => JsonBody::Rows {
            header: &response.header,
            rows: &response.rows,
        },
        Err(e) => JsonBody::Error {
            error: JsonError {
                kind: e.kind(),
                message: e.to_string(),
            },
        },
    };
    let json = JsonAnswer {
        question: &answer.question,
        sql: answer.sql.as_deref(),
        body,
    };

    serde_json::to_writer(&mut *out, &json)?;
    writeln!(out)
}

/// A row rendered like a tuple: `(5,)`, `(1, 'Alice', None)`.
pub fn row_repr(row: &[Cell]) -> String {
    match row {
        [single] => format!("({},)", cell_repr(single)),
        cells => format!("({})", cells.iter().map(cell_repr).join(", ")),
    }
}

fn cell_repr(cell: &Cell) -> String {
    match cell {
        Cell::Null => "None".to_string(),
        Cell::Integer(i) => i.to_string(),
        Cell::Real(f) if f.is_nan() => "nan".to_string(),
        Cell::Real(f) if f.is_infinite() && f.is_sign_positive() => "inf".to_string(),
        Cell::Real(f) if f.is_infinite() => "-inf".to_string(),
        Cell::Real(f) => float_repr(*f),
        Cell::Text(s) => text_repr(s),
        Cell::Blob(b) => blob_repr(b),
    }
}

/// Shortest round-trip digits, positional for exponents in `-4..16` and
/// otherwise scientific with a signed, two-digit minimum exponent: `1e+20`.
fn float_repr(f: f64) -> String {
    let scientific = format!("{f:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if (-4..16).contains(&exponent) {
        let positional = f.to_string();
        if positional.contains('.') {
            positional
        } else {
            positional + ".0"
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
    }
}

fn text_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut repr = String::with_capacity(s.len() + 2);
    repr.push(quote);
    for c in s.chars() {
        match c {
            '\\' => repr.push_str("\\\\"),
            '\n' => repr.push_str("\\n"),
            '\r' => repr.push_str("\\r"),
            '\t' => repr.push_str("\\t"),
            c if c == quote => {
                repr.push('\\');
                repr.push(c);
            }
            c if c.is_control() => repr.push_str(&format!("\\x{:02x}", c as u32)),
            c => repr.push(c),
        }
    }
    repr.push(quote);
    repr
}

fn blob_repr(bytes: &[u8]) -> String {
    let mut repr = String::from("b'");
    for &b in bytes {
        match b {
            b'\\' => repr.push_str("\\\\"),
            b'\'' => repr.push_str("\\'"),
            b'\n' => repr.push_str("\\n"),
            b'\r' => repr.push_str("\\r"),
            b'\t' => repr.push_str("\\t"),
            0x20..=0x7e => repr.push(b as char),
            _ => repr.push_str(&format!("\\x{b:02x}")),
        }
    }
    repr.push('\'');
    repr
}

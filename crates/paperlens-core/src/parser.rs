//! Reading `.bib` text into raw bibliography records
//!
//! Covers the common surface of the format: `@type{key, name = value}`
//! entries, braced, quoted and bare values, `#` concatenation and `@string`
//! macros. `@comment` and `@preamble` blocks are skipped. Values come back
//! with their delimiting braces or quotes removed and inner text verbatim;
//! cleaning is left to [`crate::bibtex`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SyntaxError;

/// One `name = value` pair as read from the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    pub value: JsonValue,
}

/// A bibliography record before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "type", default)]
    pub entry_type: String,
    pub fields: Vec<RawField>,
}

impl RawRecord {
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            entry_type: entry_type.into(),
            fields: Vec::new(),
        }
    }

    /// Append a string-valued field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(RawField {
            name: name.into(),
            value: JsonValue::String(value.into()),
        });
        self
    }
}

/// Read every entry in `input`
pub fn parse_records(input: &str) -> Result<Vec<RawRecord>, SyntaxError> {
    Reader::new(input).read_all()
}

struct Reader<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    macros: HashMap<String, String>,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            macros: HashMap::new(),
        }
    }

    fn read_all(mut self) -> Result<Vec<RawRecord>, SyntaxError> {
        let mut records = Vec::new();

        while let Some(at) = self.src[self.pos..].find('@') {
            self.pos += at + 1;
            self.skip_ws();
            let kind = self.read_ident();
            if kind.is_empty() {
                // A stray '@' in free text, e.g. an email address
                continue;
            }
            self.skip_ws();
            let close = match self.peek() {
                Some(b'{') => b'}',
                Some(b'(') => b')',
                _ => continue,
            };
            self.pos += 1;

            match kind.to_ascii_lowercase().as_str() {
                "comment" | "preamble" => self.skip_group(close)?,
                "string" => self.read_macro(close)?,
                _ => {
                    if let Some(record) = self.read_entry(kind, close)? {
                        records.push(record);
                    }
                }
            }
        }

        Ok(records)
    }

    /// `Ok(None)` when the text after `@kind{` does not start like an entry.
    /// The reader is then left just inside the delimiter so a real entry
    /// following it is still found.
    fn read_entry(&mut self, kind: &str, close: u8) -> Result<Option<RawRecord>, SyntaxError> {
        let entry_start = self.pos;
        self.skip_ws();

        let key_start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b",={@".contains(&b) || b == close {
                break;
            }
            self.pos += 1;
        }
        let key_end = self.pos;
        self.skip_ws();

        let key = match self.peek() {
            // No key: the first token was a field name
            Some(b'=') => {
                self.pos = key_start;
                None
            }
            Some(b',') => {
                self.pos += 1;
                Some(&self.src[key_start..key_end]).filter(|key| !key.is_empty())
            }
            Some(b) if b == close => {
                Some(&self.src[key_start..key_end]).filter(|key| !key.is_empty())
            }
            Some(_) => {
                self.pos = key_start;
                return Ok(None);
            }
            None => return Err(self.error_at(entry_start, "unterminated entry")),
        }
        .map(str::to_string);

        let mut fields = Vec::new();
        loop {
            self.skip_ws_and_commas();
            match self.peek() {
                None => return Err(self.error_at(entry_start, "unterminated entry")),
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {}
            }

            let name = self.read_name();
            if name.is_empty() {
                return Err(self.error("expected a field name"));
            }
            self.skip_ws();
            if self.peek() != Some(b'=') {
                return Err(self.error(format!("expected '=' after field '{name}'")));
            }
            self.pos += 1;

            let value = self.read_value()?;
            fields.push(RawField {
                name: name.to_string(),
                value: JsonValue::String(value),
            });
        }

        Ok(Some(RawRecord {
            key,
            entry_type: kind.to_string(),
            fields,
        }))
    }

    fn read_macro(&mut self, close: u8) -> Result<(), SyntaxError> {
        self.skip_ws();
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error("expected a @string name"));
        }
        self.skip_ws();
        if self.peek() != Some(b'=') {
            return Err(self.error(format!("expected '=' after @string '{name}'")));
        }
        self.pos += 1;
        let name = name.to_ascii_lowercase();
        let value = self.read_value()?;

        self.skip_ws_and_commas();
        if self.peek() != Some(close) {
            return Err(self.error("unterminated @string"));
        }
        self.pos += 1;
        self.macros.insert(name, value);
        Ok(())
    }

    /// Value parts joined by `#`
    fn read_value(&mut self) -> Result<String, SyntaxError> {
        let mut value = String::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'{') => value.push_str(self.read_delimited(b'}')?),
                Some(b'"') => value.push_str(self.read_delimited(b'"')?),
                Some(b) if is_bare(b) => {
                    let start = self.pos;
                    while self.peek().is_some_and(is_bare) {
                        self.pos += 1;
                    }
                    let word = &self.src[start..self.pos];
                    match self.macros.get(&word.to_ascii_lowercase()) {
                        Some(expansion) => value.push_str(expansion),
                        None => value.push_str(word),
                    }
                }
                _ => return Err(self.error("expected a field value")),
            }

            self.skip_ws();
            if self.peek() == Some(b'#') {
                self.pos += 1;
                continue;
            }
            return Ok(value);
        }
    }

    /// Text between the opening delimiter at `pos` and `close`, honouring
    /// nested braces
    fn read_delimited(&mut self, close: u8) -> Result<&'a str, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let mut depth = 0usize;

        while let Some(b) = self.peek() {
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                _ if b == close && depth == 0 => {
                    let inner = &self.src[open + 1..self.pos];
                    self.pos += 1;
                    return Ok(inner);
                }
                _ => {}
            }
            self.pos += 1;
        }

        Err(self.error_at(open, "unterminated value"))
    }

    fn skip_group(&mut self, close: u8) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut depth = 0usize;

        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                _ if b == close && depth == 0 => return Ok(()),
                _ => {}
            }
        }

        Err(self.error_at(start, "unterminated block"))
    }

    fn read_ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn read_name(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|b| {
            !b.is_ascii_whitespace() && !b"=,{}()\"#".contains(&b)
        }) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_ws_and_commas(&mut self) {
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_whitespace() || b == b',')
        {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> SyntaxError {
        let line = self.bytes[..pos.min(self.bytes.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        SyntaxError::new(line, message)
    }
}

fn is_bare(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"_-:./+".contains(&b)
}

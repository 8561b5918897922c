//! Best-effort reconstruction of JSON values from an incomplete prefix.
//!
//! Tool-call arguments arrive as arbitrary fragments of one JSON document.
//! [`reconstruct`] turns whatever has arrived so far into the most complete
//! value derivable from it, so live consumers can render arguments before the
//! call finishes.
//!
//! Rules, in short:
//! - complete input parses exactly (plain `serde_json`);
//! - open strings, arrays and objects are virtually closed at end of input;
//! - a trailing key without a value, a partial literal (`tru`) or an
//!   unparseable partial number (`-`, `1.`) is omitted, and so is a value
//!   whose opening token has arrived with nothing after it;
//! - on a syntax error, top-level entries completed before the failing one
//!   are kept and the rest is dropped;
//! - anything unusable yields an empty object.

use serde_json::{Map, Number, Value};

/// Nesting limit. Matches `serde_json`'s own recursion limit.
const MAX_DEPTH: usize = 128;

/// Reconstruct the best-effort value for a (possibly incomplete) JSON buffer.
///
/// Never panics and runs in time linear in `buffer`.
pub fn reconstruct(buffer: &str) -> Value {
    if buffer.bytes().all(is_json_whitespace) {
        return empty_object();
    }
    if let Ok(value) = serde_json::from_str::<Value>(buffer) {
        return value;
    }
    Parser::new(buffer).parse_document()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn is_json_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Outcome of parsing one value.
#[derive(Debug)]
enum Parsed {
    /// The value ended inside the buffer.
    Complete(Value),
    /// End of input was reached inside the value; this is the virtual close.
    Partial(Value),
    /// End of input was reached before anything worth keeping.
    Empty,
}

/// Input that can never become valid JSON, however much more arrives.
#[derive(Debug)]
struct Syntax;

type Step = Result<Parsed, Syntax>;

/// How a container body stopped.
enum Body {
    Closed,
    Eof,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(is_json_whitespace) {
            self.pos += 1;
        }
    }

    /// Parse the whole buffer. Containers at the top level salvage the
    /// entries that completed before a syntax error.
    fn parse_document(&mut self) -> Value {
        self.skip_ws();
        let step = match self.peek() {
            Some(b'{') => self.parse_object(0, true),
            Some(b'[') => self.parse_array(0, true),
            _ => self.parse_value(0),
        };
        match step {
            Ok(Parsed::Complete(value)) | Ok(Parsed::Partial(value)) => value,
            Ok(Parsed::Empty) | Err(Syntax) => empty_object(),
        }
    }

    fn parse_value(&mut self, depth: usize) -> Step {
        self.skip_ws();
        match self.peek() {
            None => Ok(Parsed::Empty),
            Some(b'{') => self.parse_object(depth + 1, false),
            Some(b'[') => self.parse_array(depth + 1, false),
            Some(b'"') => self.parse_string(),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b't') => self.parse_literal("true", Value::Bool(true)),
            Some(b'f') => self.parse_literal("false", Value::Bool(false)),
            Some(b'n') => self.parse_literal("null", Value::Null),
            Some(_) => Err(Syntax),
        }
    }

    fn parse_object(&mut self, depth: usize, salvage: bool) -> Step {
        if depth > MAX_DEPTH {
            return Err(Syntax);
        }
        self.pos += 1;
        self.skip_ws();
        if self.peek().is_none() {
            return Ok(if salvage {
                Parsed::Partial(empty_object())
            } else {
                Parsed::Empty
            });
        }
        let mut map = Map::new();
        match self.object_body(depth, &mut map) {
            Ok(Body::Closed) => Ok(Parsed::Complete(Value::Object(map))),
            // Nested and nothing kept yet: omit, same as a bare `{`.
            Ok(Body::Eof) if map.is_empty() && !salvage => Ok(Parsed::Empty),
            Ok(Body::Eof) => Ok(Parsed::Partial(Value::Object(map))),
            Err(Syntax) if salvage => Ok(Parsed::Partial(Value::Object(map))),
            Err(Syntax) => Err(Syntax),
        }
    }

    fn object_body(&mut self, depth: usize, map: &mut Map<String, Value>) -> Result<Body, Syntax> {
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Body::Closed);
        }
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Ok(Body::Eof),
                Some(b'"') => {}
                Some(_) => return Err(Syntax),
            }
            let key = match self.parse_string()? {
                Parsed::Complete(Value::String(key)) => key,
                _ => return Ok(Body::Eof),
            };
            self.skip_ws();
            match self.peek() {
                None => return Ok(Body::Eof),
                Some(b':') => self.pos += 1,
                Some(_) => return Err(Syntax),
            }
            match self.parse_value(depth)? {
                Parsed::Complete(value) => {
                    map.insert(key, value);
                }
                Parsed::Partial(value) => {
                    map.insert(key, value);
                    return Ok(Body::Eof);
                }
                Parsed::Empty => return Ok(Body::Eof),
            }
            self.skip_ws();
            match self.peek() {
                None => return Ok(Body::Eof),
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Body::Closed);
                }
                Some(_) => return Err(Syntax),
            }
        }
    }

    fn parse_array(&mut self, depth: usize, salvage: bool) -> Step {
        if depth > MAX_DEPTH {
            return Err(Syntax);
        }
        self.pos += 1;
        self.skip_ws();
        if self.peek().is_none() {
            return Ok(if salvage {
                Parsed::Partial(Value::Array(Vec::new()))
            } else {
                Parsed::Empty
            });
        }
        let mut items = Vec::new();
        match self.array_body(depth, &mut items) {
            Ok(Body::Closed) => Ok(Parsed::Complete(Value::Array(items))),
            Ok(Body::Eof) if items.is_empty() && !salvage => Ok(Parsed::Empty),
            Ok(Body::Eof) => Ok(Parsed::Partial(Value::Array(items))),
            Err(Syntax) if salvage => Ok(Parsed::Partial(Value::Array(items))),
            Err(Syntax) => Err(Syntax),
        }
    }

    fn array_body(&mut self, depth: usize, items: &mut Vec<Value>) -> Result<Body, Syntax> {
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Body::Closed);
        }
        loop {
            match self.parse_value(depth)? {
                Parsed::Complete(value) => items.push(value),
                Parsed::Partial(value) => {
                    items.push(value);
                    return Ok(Body::Eof);
                }
                Parsed::Empty => return Ok(Body::Eof),
            }
            self.skip_ws();
            match self.peek() {
                None => return Ok(Body::Eof),
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Body::Closed);
                }
                Some(_) => return Err(Syntax),
            }
        }
    }

    fn parse_string(&mut self) -> Step {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let start = self.pos;
            while self.peek().is_some_and(|b| b != b'"' && b != b'\\') {
                self.pos += 1;
            }
            // Both ends sit on ASCII bytes or the end of input, so this slice
            // is always on char boundaries.
            out.push_str(&self.src[start..self.pos]);
            let Some(b) = self.peek() else {
                return Ok(partial_string(out));
            };
            self.pos += 1;
            if b == b'"' {
                return Ok(Parsed::Complete(Value::String(out)));
            }
            let Some(escape) = self.peek() else {
                return Ok(partial_string(out));
            };
            self.pos += 1;
            match escape {
                b'"' => out.push('"'),
                b'\\' => out.push('\\'),
                b'/' => out.push('/'),
                b'b' => out.push('\u{8}'),
                b'f' => out.push('\u{c}'),
                b'n' => out.push('\n'),
                b'r' => out.push('\r'),
                b't' => out.push('\t'),
                b'u' => match self.unicode_escape()? {
                    Some(ch) => out.push(ch),
                    None => return Ok(partial_string(out)),
                },
                _ => return Err(Syntax),
            }
        }
    }

    /// Decode the body of a `\u` escape. `None` means input ended inside it.
    fn unicode_escape(&mut self) -> Result<Option<char>, Syntax> {
        let Some(code) = self.hex4()? else {
            return Ok(None);
        };
        if !(0xD800..=0xDBFF).contains(&code) {
            return Ok(Some(char::from_u32(code).unwrap_or('\u{FFFD}')));
        }

        // High surrogate: a low surrogate escape should follow.
        let resume = self.pos;
        match (self.peek(), self.bytes.get(self.pos + 1).copied()) {
            (None, _) | (Some(b'\\'), None) => return Ok(None),
            (Some(b'\\'), Some(b'u')) => {}
            _ => return Ok(Some('\u{FFFD}')),
        }
        self.pos += 2;
        let Some(low) = self.hex4()? else {
            return Ok(None);
        };
        if (0xDC00..=0xDFFF).contains(&low) {
            let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
            return Ok(Some(char::from_u32(combined).unwrap_or('\u{FFFD}')));
        }
        self.pos = resume;
        Ok(Some('\u{FFFD}'))
    }

    fn hex4(&mut self) -> Result<Option<u32>, Syntax> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(b) = self.peek() else {
                return Ok(None);
            };
            let digit = char::from(b).to_digit(16).ok_or(Syntax)?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(Some(code))
    }

    fn parse_number(&mut self) -> Step {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| matches!(b, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        let parsed = serde_json::from_str::<Number>(text).ok();
        match (parsed, self.peek().is_none()) {
            (Some(number), false) => Ok(Parsed::Complete(Value::Number(number))),
            (Some(number), true) => Ok(Parsed::Partial(Value::Number(number))),
            (None, true) => Ok(Parsed::Empty),
            (None, false) => Err(Syntax),
        }
    }

    fn parse_literal(&mut self, literal: &str, value: Value) -> Step {
        let rest = &self.bytes[self.pos..];
        let expected = literal.as_bytes();
        if rest.starts_with(expected) {
            self.pos += expected.len();
            return Ok(Parsed::Complete(value));
        }
        if expected.starts_with(rest) {
            self.pos = self.bytes.len();
            return Ok(Parsed::Empty);
        }
        Err(Syntax)
    }
}

fn partial_string(out: String) -> Parsed {
    if out.is_empty() {
        Parsed::Empty
    } else {
        Parsed::Partial(Value::String(out))
    }
}

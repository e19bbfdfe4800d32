//! Scanner and value tree for event payloads
//!
//! The grammar in [`super::grammar`] walks a [`Cursor`] over the payload text
//! and produces [`Fields`], a list of `name: value` pairs whose values are
//! [`Value`] trees.

/// A parsed field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    List(Vec<Value>),
    /// `Path(inner)`, e.g. `Option::Some(0)`
    Wrapped { path: String, inner: Box<Value> },
    /// `Path { fields }`, e.g. a nested struct literal
    Struct { path: String, fields: Fields },
    /// `None` or `Option::None`
    None,
    /// A bare identifier or path such as `Modes::Major`
    Path(String),
    /// Text that did not fit the value grammar
    Opaque(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer value, looking through a `Some(..)` wrapper.
    pub fn unwrap_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Wrapped { path, inner } if is_some_path(path) => inner.unwrap_int(),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

pub(crate) fn is_some_path(path: &str) -> bool {
    last_segment(path) == "Some"
}

pub(crate) fn is_none_path(path: &str) -> bool {
    last_segment(path) == "None"
}

/// Ordered `name: value` pairs of one payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.0.push((name.into(), value));
    }

    /// First value recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Integer field narrowed to `T`. Values outside the range of `T`
    /// saturate; missing and non-numeric values read as zero.
    pub fn number<T: FieldInt>(&self, name: &str) -> T {
        self.get(name)
            .and_then(Value::unwrap_int)
            .map(T::saturating_from)
            .unwrap_or_default()
    }

    /// A 7-bit MIDI data byte (note, velocity, controller value), clamped
    /// to 0..=127.
    pub fn data_byte(&self, name: &str) -> u8 {
        self.number::<u8>(name).min(0x7F)
    }
}

/// Integer types a payload field can be read as.
pub trait FieldInt: Default {
    fn saturating_from(n: i64) -> Self;
}

macro_rules! impl_field_int {
    ($($ty:ty),*) => {
        $(
            impl FieldInt for $ty {
                fn saturating_from(n: i64) -> Self {
                    n.clamp(<$ty>::MIN as i64, <$ty>::MAX as i64) as $ty
                }
            }
        )*
    };
}

impl_field_int!(u8, u16, u32, i16);

/// Character cursor over a payload string.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.src[start..end]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Consume `expected` if it is the next character.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn eat_str(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    pub fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => return None,
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        Some(self.slice(start, self.pos))
    }

    /// `ident ("::" ident)*`
    pub fn path(&mut self) -> Option<&'a str> {
        let start = self.pos;
        self.ident()?;
        loop {
            let checkpoint = self.pos;
            if self.eat_str("::") && self.ident().is_some() {
                continue;
            }
            self.reset(checkpoint);
            break;
        }
        Some(self.slice(start, self.pos))
    }

    /// `[+-]?[0-9]+`, rejected when it overflows `i64`.
    pub fn integer(&mut self) -> Option<i64> {
        let start = self.pos;
        if !self.eat('-') {
            self.eat('+');
        }
        let digits = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == digits {
            self.reset(start);
            return None;
        }
        match self.slice(start, self.pos).parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.reset(start);
                None
            }
        }
    }

    /// Skip to the next top-level `,` (consumed) or `close` (left in place).
    /// Brackets are balanced on the way so nested commas are stepped over.
    /// Returns the skipped text without the delimiter.
    pub fn skip_to_delimiter(&mut self, close: Option<char>) -> &'a str {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            if depth == 0 && (c == ',' || Some(c) == close) {
                break;
            }
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
        let skipped = self.slice(start, self.pos);
        self.eat(',');
        skipped
    }
}

//! Token-based type-string parser.
//!
//! Type strings are recursive expressions such as
//! `Map(LowCardinality(String), Array(Nullable(Int64)))`. The tokenizer
//! splits identifiers, numbers, quoted strings and punctuation; the parser
//! dispatches on the identifier and recurses for parametric types.
//!
//! Aliases are expanded here: `Nested(name T, ...)` becomes
//! `Array(Tuple(name T, ...))` and the geo types become their tuple/array
//! expansions, so the rest of the crate never sees them.

use super::{
    EnumItem,
    TupleElement,
    Type,
};
use crate::{
    Error,
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    Number(i64),
    Quoted(&'a str),
    LPar,
    RPar,
    Comma,
    Assign,
    Eos,
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next(&mut self) -> Result<Token<'a>> {
        let bytes = self.input.as_bytes();

        while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace()
        {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return Ok(Token::Eos);
        }

        let start = self.pos;
        match bytes[self.pos] {
            b'(' => {
                self.pos += 1;
                Ok(Token::LPar)
            }
            b')' => {
                self.pos += 1;
                Ok(Token::RPar)
            }
            b',' => {
                self.pos += 1;
                Ok(Token::Comma)
            }
            b'=' => {
                self.pos += 1;
                Ok(Token::Assign)
            }
            b'\'' => {
                self.pos += 1;
                while self.pos < bytes.len() && bytes[self.pos] != b'\'' {
                    self.pos += 1;
                }
                if self.pos >= bytes.len() {
                    return Err(Error::UnknownType(self.input.to_string()));
                }
                let value = &self.input[start + 1..self.pos];
                self.pos += 1;
                Ok(Token::Quoted(value))
            }
            b'-' | b'0'..=b'9' => {
                self.pos += 1;
                while self.pos < bytes.len()
                    && bytes[self.pos].is_ascii_digit()
                {
                    self.pos += 1;
                }
                let text = &self.input[start..self.pos];
                let value = text.parse::<i64>().map_err(|_| {
                    Error::UnknownType(self.input.to_string())
                })?;
                Ok(Token::Number(value))
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                while self.pos < bytes.len()
                    && (bytes[self.pos].is_ascii_alphanumeric()
                        || bytes[self.pos] == b'_'
                        || bytes[self.pos] == b'.')
                {
                    self.pos += 1;
                }
                Ok(Token::Name(&self.input[start..self.pos]))
            }
            _ => Err(Error::UnknownType(self.input.to_string())),
        }
    }
}

pub(crate) struct TypeParser<'a> {
    input: &'a str,
    tokens: Tokenizer<'a>,
    peeked: Option<Token<'a>>,
}

impl<'a> TypeParser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, tokens: Tokenizer::new(input), peeked: None }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(Error::UnknownType(self.input.to_string()))
    }

    fn next(&mut self) -> Result<Token<'a>> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.tokens.next(),
        }
    }

    fn peek(&mut self) -> Result<Token<'a>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.tokens.next()?);
        }
        Ok(self.peeked.unwrap())
    }

    fn expect(&mut self, token: Token<'a>) -> Result<()> {
        if self.next()? != token {
            return self.fail();
        }
        Ok(())
    }

    fn expect_name(&mut self) -> Result<&'a str> {
        match self.next()? {
            Token::Name(name) => Ok(name),
            _ => self.fail(),
        }
    }

    fn expect_number(&mut self) -> Result<i64> {
        match self.next()? {
            Token::Number(value) => Ok(value),
            _ => self.fail(),
        }
    }

    fn expect_quoted(&mut self) -> Result<String> {
        match self.next()? {
            Token::Quoted(value) => Ok(value.to_string()),
            _ => self.fail(),
        }
    }

    /// Parse a full type expression and require end of input.
    pub(crate) fn parse(&mut self) -> Result<Type> {
        let ty = self.parse_type()?;
        match self.next()? {
            Token::Eos => Ok(ty),
            _ => self.fail(),
        }
    }

    fn parse_type(&mut self) -> Result<Type> {
        let name = self.expect_name()?;
        self.parse_type_named(name)
    }

    fn parse_type_named(&mut self, name: &'a str) -> Result<Type> {
        let simple = match name {
            "UInt8" => Some(Type::UInt8),
            "UInt16" => Some(Type::UInt16),
            "UInt32" => Some(Type::UInt32),
            "UInt64" => Some(Type::UInt64),
            "UInt128" => Some(Type::UInt128),
            "UInt256" => Some(Type::UInt256),
            "Int8" => Some(Type::Int8),
            "Int16" => Some(Type::Int16),
            "Int32" => Some(Type::Int32),
            "Int64" => Some(Type::Int64),
            "Int128" => Some(Type::Int128),
            "Int256" => Some(Type::Int256),
            "Float32" => Some(Type::Float32),
            "Float64" => Some(Type::Float64),
            "Bool" => Some(Type::Bool),
            "String" => Some(Type::String),
            "UUID" => Some(Type::Uuid),
            "IPv4" => Some(Type::Ipv4),
            "IPv6" => Some(Type::Ipv6),
            "Date" => Some(Type::Date),
            "Date32" => Some(Type::Date32),
            _ => None,
        };
        if let Some(ty) = simple {
            // Simple types take no parameters.
            if self.peek()? == Token::LPar {
                return self.fail();
            }
            return Ok(ty);
        }

        match name {
            "FixedString" => {
                self.expect(Token::LPar)?;
                let size = self.expect_number()?;
                self.expect(Token::RPar)?;
                if size <= 0 {
                    return self.fail();
                }
                Ok(Type::FixedString { size: size as usize })
            }
            "DateTime" => {
                if self.peek()? != Token::LPar {
                    return Ok(Type::DateTime { timezone: None });
                }
                self.expect(Token::LPar)?;
                let timezone = self.expect_quoted()?;
                self.expect(Token::RPar)?;
                Ok(Type::DateTime { timezone: Some(timezone) })
            }
            "DateTime64" => {
                self.expect(Token::LPar)?;
                let precision = self.expect_number()?;
                if !(0..=18).contains(&precision) {
                    return self.fail();
                }
                let timezone = if self.peek()? == Token::Comma {
                    self.expect(Token::Comma)?;
                    Some(self.expect_quoted()?)
                } else {
                    None
                };
                self.expect(Token::RPar)?;
                Ok(Type::DateTime64 { precision: precision as u8, timezone })
            }
            "Decimal" => {
                self.expect(Token::LPar)?;
                let precision = self.expect_number()?;
                self.expect(Token::Comma)?;
                let scale = self.expect_number()?;
                self.expect(Token::RPar)?;
                self.decimal(precision, scale)
            }
            "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
                self.expect(Token::LPar)?;
                let scale = self.expect_number()?;
                self.expect(Token::RPar)?;
                let precision = match name {
                    "Decimal32" => 9,
                    "Decimal64" => 18,
                    "Decimal128" => 38,
                    _ => 76,
                };
                self.decimal(precision, scale)
            }
            "Enum8" => Ok(Type::Enum8 { items: self.parse_enum_items()? }),
            "Enum16" => Ok(Type::Enum16 { items: self.parse_enum_items()? }),
            "Nullable" => {
                self.expect(Token::LPar)?;
                let nested = self.parse_type()?;
                self.expect(Token::RPar)?;
                Ok(Type::Nullable { nested_type: Box::new(nested) })
            }
            "Array" => {
                self.expect(Token::LPar)?;
                let item = self.parse_type()?;
                self.expect(Token::RPar)?;
                Ok(Type::Array { item_type: Box::new(item) })
            }
            "LowCardinality" => {
                self.expect(Token::LPar)?;
                let nested = self.parse_type()?;
                self.expect(Token::RPar)?;
                Ok(Type::LowCardinality { nested_type: Box::new(nested) })
            }
            "Map" => {
                self.expect(Token::LPar)?;
                let key = self.parse_type()?;
                self.expect(Token::Comma)?;
                let value = self.parse_type()?;
                self.expect(Token::RPar)?;
                Ok(Type::Map {
                    key_type: Box::new(key),
                    value_type: Box::new(value),
                })
            }
            "Tuple" => {
                Ok(Type::Tuple { elements: self.parse_tuple_elements()? })
            }
            "Nested" => {
                // Nested(name T, ...) is Array(Tuple(name T, ...)) on the
                // wire; expand it here so there is no runtime difference.
                let elements = self.parse_tuple_elements()?;
                Ok(Type::Array {
                    item_type: Box::new(Type::Tuple { elements }),
                })
            }
            "Variant" => {
                self.expect(Token::LPar)?;
                let mut variants = vec![self.parse_type()?];
                while self.peek()? == Token::Comma {
                    self.expect(Token::Comma)?;
                    variants.push(self.parse_type()?);
                }
                self.expect(Token::RPar)?;
                // Discriminators are one byte with 0xFF reserved for null.
                if variants.len() > 255 {
                    return self.fail();
                }
                Ok(Type::Variant { variants })
            }
            "Dynamic" | "JSON" => {
                // Parameters like Dynamic(max_types=32) are server tuning
                // hints with no effect on the wire layout; skip them.
                if self.peek()? == Token::LPar {
                    self.skip_balanced()?;
                }
                Ok(if name == "Dynamic" { Type::Dynamic } else { Type::Json })
            }
            "SimpleAggregateFunction" => {
                // SimpleAggregateFunction(func, T) serializes exactly as T.
                self.expect(Token::LPar)?;
                self.expect_name()?;
                self.expect(Token::Comma)?;
                let inner = self.parse_type()?;
                self.expect(Token::RPar)?;
                Ok(inner)
            }
            "Point" => Ok(point()),
            "Ring" => Ok(Type::Array { item_type: Box::new(point()) }),
            "Polygon" => Ok(Type::Array {
                item_type: Box::new(Type::Array {
                    item_type: Box::new(point()),
                }),
            }),
            "MultiPolygon" => Ok(Type::Array {
                item_type: Box::new(Type::Array {
                    item_type: Box::new(Type::Array {
                        item_type: Box::new(point()),
                    }),
                }),
            }),
            _ => self.fail(),
        }
    }

    fn decimal(&self, precision: i64, scale: i64) -> Result<Type> {
        if !(1..=76).contains(&precision)
            || !(0..=precision).contains(&scale)
        {
            return self.fail();
        }
        Ok(Type::Decimal { precision: precision as u8, scale: scale as u8 })
    }

    fn parse_enum_items(&mut self) -> Result<Vec<EnumItem>> {
        self.expect(Token::LPar)?;
        let mut items = Vec::new();
        loop {
            let name = self.expect_quoted()?;
            self.expect(Token::Assign)?;
            let value = self.expect_number()?;
            if i16::try_from(value).is_err() {
                return self.fail();
            }
            items.push(EnumItem { name, value: value as i16 });
            match self.next()? {
                Token::Comma => continue,
                Token::RPar => break,
                _ => return self.fail(),
            }
        }
        Ok(items)
    }

    fn parse_tuple_elements(&mut self) -> Result<Vec<TupleElement>> {
        self.expect(Token::LPar)?;
        let mut elements = Vec::new();
        loop {
            // `name Type` or bare `Type`: two consecutive identifiers mean
            // the first one is the element name.
            let first = self.expect_name()?;
            let element = if matches!(self.peek()?, Token::Name(_)) {
                TupleElement {
                    name: Some(first.to_string()),
                    ty: self.parse_type()?,
                }
            } else {
                TupleElement { name: None, ty: self.parse_type_named(first)? }
            };
            elements.push(element);
            match self.next()? {
                Token::Comma => continue,
                Token::RPar => break,
                _ => return self.fail(),
            }
        }
        Ok(elements)
    }

    fn skip_balanced(&mut self) -> Result<()> {
        self.expect(Token::LPar)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next()? {
                Token::LPar => depth += 1,
                Token::RPar => depth -= 1,
                Token::Eos => return self.fail(),
                _ => {}
            }
        }
        Ok(())
    }
}

fn point() -> Type {
    Type::Tuple {
        elements: vec![
            TupleElement { name: None, ty: Type::Float64 },
            TupleElement { name: None, ty: Type::Float64 },
        ],
    }
}

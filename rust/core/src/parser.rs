// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization of the `DATA;` section of an ISO-10303-21 file.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while1},
    character::complete::{char, digit1, multispace1, one_of},
    combinator::{map, map_opt, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::EntityId;

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(EntityId),
    /// String literal: 'text' (doubled quotes still escaped)
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .TRUE., .ELEMENT.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCPARAMETERVALUE(0.), IFCBOOLEAN(.T.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// A parsed `#id=TYPE(args);` statement
pub type RawEntity<'a> = (EntityId, &'a str, Vec<Token<'a>>);

/// Skip whitespace and `/* ... */` comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

fn entity_id(input: &str) -> IResult<&str, EntityId> {
    preceded(
        char('#'),
        map_opt(digit1, |s: &str| lexical_core::parse::<EntityId>(s.as_bytes()).ok()),
    )(input)
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(entity_id, Token::EntityRef)(input)
}

/// Parse string content up to the closing quote; `''` is an escaped quote
fn string_content(input: &str) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Ok((&input[i..], &input[..i]));
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse string literal: 'text'
fn string_literal(input: &str) -> IResult<&str, Token> {
    map(
        delimited(char('\''), string_content, char('\'')),
        Token::String,
    )(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.E-05
fn float(input: &str) -> IResult<&str, Token> {
    map_opt(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| {
            lexical_core::parse::<f64>(s.as_bytes())
                .ok()
                .or_else(|| s.parse::<f64>().ok())
                .map(Token::Float)
        },
    )(input)
}

/// Parse integer: 42, -42
fn integer(input: &str) -> IResult<&str, Token> {
    map_opt(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().ok().map(Token::Integer)
    })(input)
}

/// Parse enum: .TRUE., .ELEMENT.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        separated_list0(char(','), token),
        preceded(ws, char(')')),
    )(input)
}

/// Parse typed value: IFCPARAMETERVALUE(0.), IFCBOOLEAN(.T.)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(
        pair(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            preceded(ws, arguments),
        ),
        |(type_name, args)| Token::TypedValue(type_name, args),
    )(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // float before integer, both start with digits
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            value(Token::Null, char('$')),
            value(Token::Derived, char('*')),
        )),
        ws,
    )(input)
}

fn entity_statement(input: &str) -> IResult<&str, RawEntity> {
    tuple((
        delimited(ws, entity_id, ws),
        preceded(
            char('='),
            delimited(
                ws,
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
                ws,
            ),
        ),
        terminated(arguments, pair(ws, char(';'))),
    ))(input)
}

/// Parse a complete entity statement
/// Example: #123=IFCWALL('guid','owner',$,$,'name',$,$,$);
pub fn parse_entity(input: &str) -> Result<RawEntity<'_>> {
    entity_statement(input)
        .map(|(_, entity)| entity)
        .map_err(|e| Error::parse(0, format!("Failed to parse entity: {}", e)))
}

/// Byte length of a statement up to and including its `;`, ignoring quoted text
fn statement_len(input: &str) -> Option<usize> {
    let mut in_string = false;
    for (i, byte) in input.bytes().enumerate() {
        match byte {
            b'\'' => in_string = !in_string,
            b';' if !in_string => return Some(i + 1),
            _ => {}
        }
    }
    None
}

/// Iterates the entity statements of the `DATA;` section
pub struct EntityScanner<'a> {
    content: &'a str,
    remaining: &'a str,
    finished: bool,
}

impl<'a> EntityScanner<'a> {
    /// Position the scanner at the start of the `DATA;` section
    pub fn new(content: &'a str) -> Result<Self> {
        let start = memchr::memmem::find(content.as_bytes(), b"DATA;")
            .ok_or(Error::MissingDataSection)?;
        Ok(Self {
            content,
            remaining: &content[start + "DATA;".len()..],
            finished: false,
        })
    }

    fn position(&self) -> usize {
        self.content.len() - self.remaining.len()
    }

    fn fail(&mut self, message: impl Into<String>) -> Option<Result<RawEntity<'a>>> {
        self.finished = true;
        Some(Err(Error::parse(Self::position(self), message)))
    }
}

impl<'a> Iterator for EntityScanner<'a> {
    type Item = Result<RawEntity<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if let Ok((rest, ())) = ws(self.remaining) {
                self.remaining = rest;
            }
            if self.remaining.is_empty() || self.remaining.starts_with("ENDSEC") {
                self.finished = true;
                return None;
            }
            if !self.remaining.starts_with('#') {
                return self.fail("Expected entity instance");
            }

            match entity_statement(self.remaining) {
                Ok((rest, entity)) => {
                    self.remaining = rest;
                    return Some(Ok(entity));
                }
                Err(e) => {
                    // Complex instances `#id=(A() B());` carry no single type: skip them
                    let is_complex = tuple((entity_id, ws, char('='), ws, char('(')))(self.remaining)
                        .is_ok();
                    if !is_complex {
                        return self.fail(format!("Failed to parse entity: {}", e));
                    }
                    match statement_len(self.remaining) {
                        Some(len) => self.remaining = &self.remaining[len..],
                        None => return self.fail("Unterminated statement"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref() {
        assert_eq!(entity_ref("#123"), Ok(("", Token::EntityRef(123))));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("'hello'"), Ok(("", Token::String("hello"))));
        assert_eq!(string_literal("'it''s'"), Ok(("", Token::String("it''s"))));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(integer("-42"), Ok(("", Token::Integer(-42))));
        assert_eq!(float("3.14"), Ok(("", Token::Float(3.14))));
        assert_eq!(float("0."), Ok(("", Token::Float(0.0))));
        assert_eq!(float("1.E-05"), Ok(("", Token::Float(1e-5))));
        assert!(float("42").is_err());
    }

    #[test]
    fn test_enum() {
        assert_eq!(enum_value(".LENGTHUNIT."), Ok(("", Token::Enum("LENGTHUNIT"))));
    }

    #[test]
    fn test_typed_value() {
        let (_, token) = token(" IFCLENGTHMEASURE(0.3048) ").unwrap();
        assert_eq!(
            token,
            Token::TypedValue("IFCLENGTHMEASURE", vec![Token::Float(0.3048)])
        );
    }

    #[test]
    fn test_parse_entity_with_nested_list() {
        let (id, type_name, args) =
            parse_entity("#9= IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.)));").unwrap();
        assert_eq!(id, 9);
        assert_eq!(type_name, "IFCCARTESIANPOINTLIST3D");
        assert_eq!(args.len(), 1);
        match &args[0] {
            Token::List(points) => assert_eq!(points.len(), 2),
            other => panic!("Expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_scanner_reads_data_section_only() {
        let content = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\
            #1=IFCPROJECT('guid',$,'Demo;Project',$,$,$,$,$,$);\n\
            /* comment */ #2 = IFCWALL('w', $, $, $, $, $, $, $, .NOTDEFINED.);\n\
            #3=(IFCNAMEDUNIT(*,.LENGTHUNIT.) IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.));\n\
            #4=IFCDIRECTION((1.,0.,0.));\nENDSEC;\nEND-ISO-10303-21;\n";

        let entities: Vec<_> = EntityScanner::new(content)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        let ids: Vec<_> = entities.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(entities[0].2[2], Token::String("Demo;Project"));
        assert_eq!(entities[1].2[8], Token::Enum("NOTDEFINED"));
    }

    #[test]
    fn test_scanner_reports_position_of_bad_statement() {
        let content = "DATA;\n#1=IFCWALL('a');\n#2=IFCWALL('b'\nENDSEC;";
        let results: Vec<_> = EntityScanner::new(content).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(Error::ParseError { position, .. }) if position == 23
        ));
    }

    #[test]
    fn test_missing_data_section() {
        assert!(matches!(
            EntityScanner::new("ISO-10303-21;"),
            Err(Error::MissingDataSection)
        ));
    }
}

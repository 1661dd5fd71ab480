//! Move Type Tags
//!
//! Parses type-argument strings such as `0x2::sui::SUI` or
//! `vector<0x2::coin::Coin<0x2::sui::SUI>>` into their canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CustodyError;
use crate::types::SuiAddress;

/// Deepest `vector<..>` / generic nesting accepted. Each level costs up to
/// two BCS containers, so this keeps a whole transaction under bcs's
/// container depth limit.
pub const MAX_TYPE_TAG_DEPTH: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTag {
    pub address: SuiAddress,
    pub module: String,
    pub name: String,
    pub type_params: Vec<TypeTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeTagError {
    #[error("Unexpected end of type tag")]
    UnexpectedEnd,

    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Trailing input after type tag: '{0}'")]
    TrailingInput(String),

    #[error("Type tag nested deeper than {0} levels")]
    TooDeep(usize),
}

impl From<TypeTagError> for CustodyError {
    fn from(e: TypeTagError) -> Self {
        CustodyError::invalid_type_tag(e.to_string())
    }
}

/// Whether `s` is a valid Move identifier
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        Some('_') => s.len() > 1 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    ColonColon,
    Lt,
    Gt,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(s) => write!(f, "{}", s),
            Token::ColonColon => write!(f, "::"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, TypeTagError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '<' => {
                chars.next();
                tokens.push(Token::Lt);
            }
            '>' => {
                chars.next();
                tokens.push(Token::Gt);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            ':' => {
                chars.next();
                if chars.next() != Some(':') {
                    return Err(TypeTagError::UnexpectedToken(":".to_string()));
                }
                tokens.push(Token::ColonColon);
            }
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(TypeTagError::UnexpectedToken(other.to_string())),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Result<Token, TypeTagError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(TypeTagError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expect(&mut self, expected: Token) -> Result<(), TypeTagError> {
        let token = self.next()?;
        if token != expected {
            return Err(TypeTagError::UnexpectedToken(token.to_string()));
        }
        Ok(())
    }

    fn identifier(&mut self) -> Result<String, TypeTagError> {
        match self.next()? {
            Token::Name(name) if is_valid_identifier(&name) => Ok(name),
            Token::Name(name) => Err(TypeTagError::InvalidIdentifier(name)),
            other => Err(TypeTagError::UnexpectedToken(other.to_string())),
        }
    }

    fn type_tag(&mut self, depth: usize) -> Result<TypeTag, TypeTagError> {
        if depth > MAX_TYPE_TAG_DEPTH {
            return Err(TypeTagError::TooDeep(MAX_TYPE_TAG_DEPTH));
        }
        let name = match self.next()? {
            Token::Name(name) => name,
            other => return Err(TypeTagError::UnexpectedToken(other.to_string())),
        };

        let tag = match name.as_str() {
            "bool" => TypeTag::Bool,
            "u8" => TypeTag::U8,
            "u16" => TypeTag::U16,
            "u32" => TypeTag::U32,
            "u64" => TypeTag::U64,
            "u128" => TypeTag::U128,
            "u256" => TypeTag::U256,
            "address" => TypeTag::Address,
            "signer" => TypeTag::Signer,
            "vector" => {
                self.expect(Token::Lt)?;
                let inner = self.type_tag(depth + 1)?;
                self.expect(Token::Gt)?;
                TypeTag::Vector(Box::new(inner))
            }
            _ => TypeTag::Struct(Box::new(self.struct_tag(name, depth)?)),
        };
        Ok(tag)
    }

    fn struct_tag(&mut self, address: String, depth: usize) -> Result<StructTag, TypeTagError> {
        let address = SuiAddress::from_hex_literal(&address)
            .map_err(|_| TypeTagError::InvalidAddress(address))?;
        self.expect(Token::ColonColon)?;
        let module = self.identifier()?;
        self.expect(Token::ColonColon)?;
        let name = self.identifier()?;

        let mut type_params = Vec::new();
        if self.peek() == Some(&Token::Lt) {
            self.pos += 1;
            loop {
                type_params.push(self.type_tag(depth + 1)?);
                match self.next()? {
                    Token::Comma => continue,
                    Token::Gt => break,
                    other => return Err(TypeTagError::UnexpectedToken(other.to_string())),
                }
            }
        }

        Ok(StructTag { address, module, name, type_params })
    }
}

impl FromStr for TypeTag {
    type Err = TypeTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { tokens: tokenize(s)?, pos: 0 };
        let tag = parser.type_tag(1)?;
        if parser.pos != parser.tokens.len() {
            let rest: Vec<String> = parser.tokens[parser.pos..].iter().map(|t| t.to_string()).collect();
            return Err(TypeTagError::TrailingInput(rest.join("")));
        }
        Ok(tag)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::U8 => write!(f, "u8"),
            TypeTag::U16 => write!(f, "u16"),
            TypeTag::U32 => write!(f, "u32"),
            TypeTag::U64 => write!(f, "u64"),
            TypeTag::U128 => write!(f, "u128"),
            TypeTag::U256 => write!(f, "u256"),
            TypeTag::Address => write!(f, "address"),
            TypeTag::Signer => write!(f, "signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{}>", inner),
            TypeTag::Struct(s) => write!(f, "{}", s),
        }
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)?;
        if !self.type_params.is_empty() {
            let params: Vec<String> = self.type_params.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", params.join(", "))?;
        }
        Ok(())
    }
}

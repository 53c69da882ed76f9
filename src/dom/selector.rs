use std::str::FromStr;

use crate::{dom::Node, Error, Result};

/// A parsed comma-separated selector list.
///
/// Supports `*`, type, `#id`, `.class`, `[attr]` and `[attr=value]` (bare or
/// quoted value) in compound selectors, joined by the descendant (whitespace)
/// and child (`>`) combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Complex>);

impl SelectorList {
    pub fn parse(selector: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidSelector {
            selector: selector.to_string(),
            reason,
        };
        let mut list = Vec::new();
        for part in split_top_level(selector).map_err(invalid)? {
            list.push(Parser::new(part).complex().map_err(invalid)?);
        }
        Ok(Self(list))
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.0.iter().any(|c| c.matches(node))
    }
}
impl FromStr for SelectorList {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds from left to right. The first combinator is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex(Vec<(Combinator, Compound)>);

impl Complex {
    fn matches(&self, node: &Node) -> bool {
        self.matches_at(node, self.0.len() - 1)
    }
    fn matches_at(&self, node: &Node, index: usize) -> bool {
        let (combinator, compound) = &self.0[index];
        if !compound.matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => node
                .parent()
                .is_some_and(|parent| self.matches_at(&parent, index - 1)),
            Combinator::Descendant => {
                let mut ancestor = node.parent();
                while let Some(a) = ancestor {
                    if self.matches_at(&a, index - 1) {
                        return true;
                    }
                    ancestor = a.parent();
                }
                false
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(node.tag()) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class = node.attr("class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|c| class.split_ascii_whitespace().any(|x| x == c))
            {
                return false;
            }
        }
        self.attrs
            .iter()
            .all(|(name, value)| match (node.attr(name), value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == *expected,
            })
    }
}

fn split_top_level(s: &str) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.checked_sub(1).ok_or("unbalanced `]`")?,
            (None, ',') if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err("unterminated string");
    }
    if depth != 0 {
        return Err("unbalanced `[`");
    }
    parts.push(&s[start..]);
    Ok(parts)
}

struct Parser<'a> {
    s: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Self { s: s.trim(), pos: 0 }
    }
    fn peek(&self) -> Option<char> {
        self.s[self.pos..].chars().next()
    }
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }
    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos != start
    }
    fn ident(&mut self) -> Result<String, &'static str> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            self.bump();
        }
        if self.pos == start {
            return Err("expected identifier");
        }
        Ok(self.s[start..self.pos].to_string())
    }

    fn complex(mut self) -> Result<Complex, &'static str> {
        if self.s.is_empty() {
            return Err("empty selector");
        }
        let mut items = vec![(Combinator::Descendant, self.compound()?)];
        loop {
            let had_space = self.skip_whitespace();
            let combinator = if self.eat('>') {
                self.skip_whitespace();
                Combinator::Child
            } else if had_space {
                Combinator::Descendant
            } else {
                break;
            };
            if self.peek().is_none() {
                return Err("dangling combinator");
            }
            items.push((combinator, self.compound()?));
        }
        if self.peek().is_some() {
            return Err("unexpected character");
        }
        Ok(Complex(items))
    }

    fn compound(&mut self) -> Result<Compound, &'static str> {
        let mut compound = Compound::default();
        let start = self.pos;
        if !self.eat('*') && self.peek().is_some_and(|c| c.is_alphabetic()) {
            compound.tag = Some(self.ident()?);
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attrs.push(self.attr()?);
                }
                _ => break,
            }
        }
        if self.pos == start {
            return Err("expected selector");
        }
        Ok(compound)
    }

    fn attr(&mut self) -> Result<(String, Option<String>), &'static str> {
        self.skip_whitespace();
        let name = self.ident()?;
        self.skip_whitespace();
        let value = if self.eat('=') {
            self.skip_whitespace();
            Some(self.attr_value()?)
        } else {
            None
        };
        self.skip_whitespace();
        if !self.eat(']') {
            return Err("expected `]`");
        }
        Ok((name, value))
    }

    fn attr_value(&mut self) -> Result<String, &'static str> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != q) {
                    self.bump();
                }
                let value = self.s[start..self.pos].to_string();
                if !self.eat(q) {
                    return Err("unterminated string");
                }
                Ok(value)
            }
            _ => self.ident(),
        }
    }
}

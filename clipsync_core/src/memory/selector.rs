// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selector parsing for [`MemoryDom`](super::MemoryDom).
//!
//! Selectors are tokenized with `cssparser`. Combinators and attribute
//! operators are the `selectors` crate's types, and attribute values are
//! compared with [`AttrSelectorOperator::eval_str`].

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use cssparser::{ParseError, Parser, ParserInput, Token};
use selectors::attr::{AttrSelectorOperator, CaseSensitivity};
use selectors::parser::Combinator;

type ParseResult<'i, T> = Result<T, ParseError<'i, ()>>;

/// A complex selector: compounds joined by combinators, left to right.
///
/// The combinator stored with a compound links it to the compound before
/// it; the first one is unused.
#[derive(Debug)]
pub(super) struct Selector {
    pub(super) parts: Vec<(Combinator, Compound)>,
}

/// A run of simple selectors that all apply to one element.
#[derive(Debug, Default)]
pub(super) struct Compound {
    pub(super) tag: Option<String>,
    pub(super) id: Option<String>,
    pub(super) classes: Vec<String>,
    pub(super) attributes: Vec<AttrSelector>,
}

pub(super) struct AttrSelector {
    pub(super) name: String,
    /// `None` tests for presence only.
    operation: Option<(AttrSelectorOperator, String)>,
}

impl fmt::Debug for AttrSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrSelector")
            .field("name", &self.name)
            .field("value", &self.operation.as_ref().map(|(_, v)| v))
            .finish_non_exhaustive()
    }
}

impl AttrSelector {
    /// Whether an attribute with value `actual` (or none) satisfies this
    /// selector.
    pub(super) fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match &self.operation {
            None => true,
            // An empty operand only ever matches by equality.
            Some((operator, expected))
                if expected.is_empty() && !matches!(operator, AttrSelectorOperator::Equal) =>
            {
                false
            }
            Some((operator, expected)) => {
                operator.eval_str(actual, expected, CaseSensitivity::CaseSensitive)
            }
        }
    }
}

/// Parses `selector`, or returns `None` if it is malformed or uses anything
/// beyond type, universal, id, class and attribute selectors and the four
/// tree combinators.
pub(super) fn parse(selector: &str) -> Option<Selector> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    parse_complex(&mut parser).ok()
}

fn parse_complex<'i>(p: &mut Parser<'i, '_>) -> ParseResult<'i, Selector> {
    let mut parts = Vec::new();
    let mut combinator = Combinator::Descendant;
    p.skip_whitespace();
    loop {
        parts.push((combinator, parse_compound(p)?));

        let mut spaced = false;
        combinator = loop {
            let state = p.state();
            match p.next_including_whitespace().cloned() {
                Err(_) => return Ok(Selector { parts }),
                Ok(Token::WhiteSpace(_)) => spaced = true,
                Ok(Token::Delim('>')) => break Combinator::Child,
                Ok(Token::Delim('+')) => break Combinator::NextSibling,
                Ok(Token::Delim('~')) => break Combinator::LaterSibling,
                Ok(_) if spaced => {
                    p.reset(&state);
                    break Combinator::Descendant;
                }
                Ok(_) => return Err(p.new_custom_error(())),
            }
        };
        p.skip_whitespace();
    }
}

fn parse_compound<'i>(p: &mut Parser<'i, '_>) -> ParseResult<'i, Compound> {
    let mut compound = Compound::default();
    let mut any = false;
    loop {
        let state = p.state();
        match p.next_including_whitespace().cloned() {
            Ok(Token::Ident(name)) if !any => compound.tag = Some(name.to_string()),
            Ok(Token::Delim('*')) if !any => {}
            Ok(Token::IDHash(id)) => compound.id = Some(id.to_string()),
            Ok(Token::Delim('.')) => match p.next_including_whitespace().cloned() {
                Ok(Token::Ident(class)) => compound.classes.push(class.to_string()),
                _ => return Err(p.new_custom_error(())),
            },
            Ok(Token::SquareBracketBlock) => {
                let attribute = p.parse_nested_block(|p| parse_attribute(p))?;
                compound.attributes.push(attribute);
            }
            Ok(Token::WhiteSpace(_) | Token::Delim('>' | '+' | '~')) | Err(_) => {
                p.reset(&state);
                break;
            }
            Ok(_) => return Err(p.new_custom_error(())),
        }
        any = true;
    }
    if any {
        Ok(compound)
    } else {
        Err(p.new_custom_error(()))
    }
}

fn parse_attribute<'i>(p: &mut Parser<'i, '_>) -> ParseResult<'i, AttrSelector> {
    let name = p.expect_ident()?.to_string();
    let operator = match p.next().cloned() {
        Err(_) => {
            return Ok(AttrSelector {
                name,
                operation: None,
            });
        }
        Ok(Token::Delim('=')) => AttrSelectorOperator::Equal,
        Ok(Token::IncludeMatch) => AttrSelectorOperator::Includes,
        Ok(Token::DashMatch) => AttrSelectorOperator::DashMatch,
        Ok(Token::PrefixMatch) => AttrSelectorOperator::Prefix,
        Ok(Token::SubstringMatch) => AttrSelectorOperator::Substring,
        Ok(Token::SuffixMatch) => AttrSelectorOperator::Suffix,
        Ok(_) => return Err(p.new_custom_error(())),
    };
    let value = p.expect_ident_or_string()?.to_string();
    p.expect_exhausted()?;
    Ok(AttrSelector {
        name,
        operation: Some((operator, value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compounds_and_combinators() {
        let selector = parse("#doc > .HYPE_scene[style*=\"block\"] svg ~ path").unwrap();
        let combinators: Vec<_> = selector.parts.iter().map(|(c, _)| *c).collect();
        assert!(
            matches!(
                combinators[1..],
                [
                    Combinator::Child,
                    Combinator::Descendant,
                    Combinator::LaterSibling
                ]
            ),
            "got {combinators:?}"
        );
        let scene = &selector.parts[1].1;
        assert_eq!(scene.classes, ["HYPE_scene"]);
        assert_eq!(scene.attributes[0].name, "style");
        assert!(scene.attributes[0].matches(Some("display: block;")));
        assert!(!scene.attributes[0].matches(Some("display: none;")));
    }

    #[test]
    fn quoted_values_unescape() {
        let selector = parse(r#"[data-clip-path="[title=\"a\"]"]"#).unwrap();
        let attribute = &selector.parts[0].1.attributes[0];
        assert!(attribute.matches(Some(r#"[title="a"]"#)));
        assert!(!attribute.matches(None));
    }

    #[test]
    fn empty_operands_only_match_by_equality() {
        let prefix = parse(r#"[title^=""]"#).unwrap();
        assert!(!prefix.parts[0].1.attributes[0].matches(Some("anything")));
        let equal = parse(r#"[title=""]"#).unwrap();
        assert!(equal.parts[0].1.attributes[0].matches(Some("")));
    }

    #[test]
    fn unsupported_syntax_is_rejected() {
        for selector in ["", "> path", "a:hover", "a, b", "[title=]", "div..x", "#1x"] {
            assert!(parse(selector).is_none(), "{selector:?} should not parse");
        }
    }
}

use crate::error::{CascataError, ParseError, Result};
use cssparser::{Delimiter, Parser, ParserInput, Token};

/// (id, class/attribute, type/pseudo-element) counts. Tuple ordering gives
/// cascade rank directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u16, pub u16, pub u16);

impl Specificity {
    pub const ZERO: Specificity = Specificity(0, 0, 0);

    fn add(self, other: Specificity) -> Specificity {
        Specificity(self.0 + other.0, self.1 + other.1, self.2 + other.2)
    }

    fn max(self, other: Specificity) -> Specificity {
        if other > self { other } else { self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSelector {
    pub(crate) name: String,
    pub(crate) op: AttrOp,
    pub(crate) value: Option<String>,
    pub(crate) case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NthKind {
    Child,
    LastChild,
    OfType,
    LastOfType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PseudoClass {
    Root,
    Empty,
    Blank,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    Nth {
        kind: NthKind,
        a: i32,
        b: i32,
        of: Option<SelectorList>,
    },
    Not(SelectorList),
    Is(SelectorList),
    Where(SelectorList),
    Has(Vec<RelativeSelector>),
    Lang(Vec<String>),
    Dir(String),
    Link,
    AnyLink,
    Checked,
    Indeterminate,
    Disabled,
    Enabled,
    ReadOnly,
    ReadWrite,
    PlaceholderShown,
    Default,
    /// Dynamic user state (`:hover`, `:focus`, `:visited`, `:target`, ...)
    /// answered by the state collaborator.
    State(String),
}

/// A `:has()` alternative: leading combinator (descendant when implicit)
/// plus the pattern evaluated inside the candidate's scope.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeSelector {
    pub(crate) combinator: Combinator,
    pub(crate) pattern: SelectorPattern,
}

/// One compound: every listed condition must hold on the same element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleSelector {
    pub(crate) namespace: Option<String>,
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attrs: Vec<AttrSelector>,
    pub(crate) pseudos: Vec<PseudoClass>,
    pub(crate) pseudo_element: Option<String>,
}

impl SimpleSelector {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.pseudos.is_empty()
            && self.pseudo_element.is_none()
    }

    pub fn specificity(&self) -> Specificity {
        let mut spec = Specificity::ZERO;
        if self.id.is_some() {
            spec.0 += 1;
        }
        spec.1 += (self.classes.len() + self.attrs.len()) as u16;
        if let Some(tag) = &self.tag {
            if tag != "*" {
                spec.2 += 1;
            }
        }
        if self.pseudo_element.is_some() {
            spec.2 += 1;
        }
        for pseudo in &self.pseudos {
            spec = spec.add(pseudo.specificity());
        }
        spec
    }
}

impl PseudoClass {
    fn specificity(&self) -> Specificity {
        match self {
            PseudoClass::Where(_) => Specificity::ZERO,
            PseudoClass::Is(list) | PseudoClass::Not(list) => list.max_specificity(),
            PseudoClass::Has(relatives) => relatives
                .iter()
                .fold(Specificity::ZERO, |acc, r| acc.max(r.pattern.specificity())),
            PseudoClass::Nth { of: Some(list), .. } => {
                Specificity(0, 1, 0).add(list.max_specificity())
            }
            _ => Specificity(0, 1, 0),
        }
    }
}

/// Compound chain joined by combinators; `parts[i]` connects to
/// `parts[i + 1]` through `combinators[i]`. Matching walks right to left.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorPattern {
    pub(crate) parts: Vec<SimpleSelector>,
    pub(crate) combinators: Vec<Combinator>,
}

impl SelectorPattern {
    pub fn specificity(&self) -> Specificity {
        self.parts
            .iter()
            .fold(Specificity::ZERO, |acc, part| acc.add(part.specificity()))
    }
}

/// Comma-separated alternatives. Matching yields the index of the first
/// alternative that matches, so specificity stays addressable per branch.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    pub(crate) alternatives: Vec<SelectorPattern>,
}

impl SelectorList {
    pub fn parse_str(text: &str) -> Result<SelectorList> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        parse_selector_list(&mut parser).map_err(|_| {
            CascataError::Parse(ParseError::InvalidSelector {
                selector: text.to_string(),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Specificity of the alternative at `index` (as returned by matching).
    pub fn specificity_of(&self, index: usize) -> Specificity {
        self.alternatives
            .get(index)
            .map(|p| p.specificity())
            .unwrap_or(Specificity::ZERO)
    }

    fn max_specificity(&self) -> Specificity {
        self.alternatives
            .iter()
            .fold(Specificity::ZERO, |acc, p| acc.max(p.specificity()))
    }
}

pub(crate) fn parse_selector_list<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<SelectorList, cssparser::ParseError<'i, CascataError>> {
    let mut alternatives = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }
        let pattern = parser.parse_until_before(Delimiter::Comma, parse_pattern)?;
        alternatives.push(pattern);
        if parser.next().is_err() {
            break;
        }
    }
    if alternatives.is_empty() {
        return Err(invalid(parser, "empty selector"));
    }
    Ok(SelectorList { alternatives })
}

fn invalid<'i>(
    parser: &Parser<'i, '_>,
    message: &str,
) -> cssparser::ParseError<'i, CascataError> {
    parser.new_custom_error(CascataError::Parse(ParseError::InvalidSelector {
        selector: message.to_string(),
    }))
}

pub(crate) fn parse_pattern<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<SelectorPattern, cssparser::ParseError<'i, CascataError>> {
    let mut parts: Vec<SimpleSelector> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut saw_space = false;
    loop {
        let state = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) => saw_space = true,
            Token::Delim(d @ ('>' | '+' | '~')) => {
                let combinator = match d {
                    '>' => Combinator::Child,
                    '+' => Combinator::AdjacentSibling,
                    _ => Combinator::GeneralSibling,
                };
                if pending.replace(combinator).is_some() {
                    return Err(invalid(parser, "consecutive combinators"));
                }
            }
            _ => {
                parser.reset(&state);
                if !parts.is_empty() {
                    match pending.take() {
                        Some(combinator) => combinators.push(combinator),
                        None if saw_space => combinators.push(Combinator::Descendant),
                        None => return Err(invalid(parser, "missing combinator")),
                    }
                }
                parts.push(parse_compound(parser)?);
                saw_space = false;
            }
        }
    }
    if parts.is_empty() {
        return Err(invalid(parser, "empty selector"));
    }
    if pending.is_some() {
        return Err(invalid(parser, "trailing combinator"));
    }
    Ok(SelectorPattern { parts, combinators })
}

fn parse_compound<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<SimpleSelector, cssparser::ParseError<'i, CascataError>> {
    let mut simple = SimpleSelector::default();
    loop {
        let state = parser.state();
        let token = match parser.next_including_whitespace() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };
        match token {
            Token::Ident(name) => {
                if !simple.is_empty() {
                    return Err(invalid(parser, "type selector must come first"));
                }
                let (namespace, tag) = finish_qualified_name(parser, name.to_string())?;
                simple.namespace = namespace;
                simple.tag = Some(tag.to_ascii_lowercase());
            }
            Token::Delim('*') => {
                if !simple.is_empty() {
                    return Err(invalid(parser, "universal selector must come first"));
                }
                let (namespace, tag) = finish_qualified_name(parser, "*".to_string())?;
                simple.namespace = namespace;
                simple.tag = Some(tag.to_ascii_lowercase());
            }
            Token::Delim('|') => {
                if !simple.is_empty() {
                    return Err(invalid(parser, "unexpected namespace separator"));
                }
                let tag = match parser.next_including_whitespace() {
                    Ok(Token::Ident(name)) => name.to_ascii_lowercase(),
                    Ok(Token::Delim('*')) => "*".to_string(),
                    _ => return Err(invalid(parser, "expected tag after namespace")),
                };
                simple.namespace = Some(String::new());
                simple.tag = Some(tag);
            }
            Token::IDHash(id) => {
                simple.id = Some(id.to_string());
            }
            Token::Delim('.') => match parser.next_including_whitespace() {
                Ok(Token::Ident(class)) => simple.classes.push(class.to_string()),
                _ => return Err(invalid(parser, "expected class name after '.'")),
            },
            Token::SquareBracketBlock => {
                let attr = parser.parse_nested_block(parse_attr)?;
                simple.attrs.push(attr);
            }
            Token::Colon => {
                parse_pseudo(parser, &mut simple)?;
            }
            Token::WhiteSpace(_)
            | Token::Delim('>')
            | Token::Delim('+')
            | Token::Delim('~') => {
                parser.reset(&state);
                break;
            }
            _ => return Err(invalid(parser, "unexpected token in selector")),
        }
    }
    if simple.is_empty() {
        return Err(invalid(parser, "empty compound selector"));
    }
    Ok(simple)
}

/// Resolves `ns|tag` syntax when the next token is a namespace separator.
fn finish_qualified_name<'i>(
    parser: &mut Parser<'i, '_>,
    first: String,
) -> std::result::Result<(Option<String>, String), cssparser::ParseError<'i, CascataError>> {
    let state = parser.state();
    match parser.next_including_whitespace() {
        Ok(Token::Delim('|')) => match parser.next_including_whitespace() {
            Ok(Token::Ident(tag)) => Ok((Some(first), tag.to_string())),
            Ok(Token::Delim('*')) => Ok((Some(first), "*".to_string())),
            _ => Err(invalid(parser, "expected tag after namespace")),
        },
        _ => {
            parser.reset(&state);
            Ok((None, first))
        }
    }
}

fn parse_attr<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<AttrSelector, cssparser::ParseError<'i, CascataError>> {
    parser.skip_whitespace();
    let name = parser.expect_ident()?.to_ascii_lowercase();
    parser.skip_whitespace();
    if parser.is_exhausted() {
        return Ok(AttrSelector {
            name,
            op: AttrOp::Exists,
            value: None,
            case_insensitive: false,
        });
    }
    let op = match parser.next()?.clone() {
        Token::Delim('=') => AttrOp::Equals,
        Token::IncludeMatch => AttrOp::Includes,
        Token::DashMatch => AttrOp::DashMatch,
        Token::PrefixMatch => AttrOp::Prefix,
        Token::SuffixMatch => AttrOp::Suffix,
        Token::SubstringMatch => AttrOp::Substring,
        _ => return Err(invalid(parser, "unknown attribute operator")),
    };
    let value = match parser.next()?.clone() {
        Token::Ident(s) => s.to_string(),
        Token::QuotedString(s) => s.to_string(),
        _ => return Err(invalid(parser, "expected attribute value")),
    };
    let mut case_insensitive = false;
    if let Ok(flag) = parser.try_parse(|p| p.expect_ident_cloned()) {
        if flag.eq_ignore_ascii_case("i") {
            case_insensitive = true;
        } else if !flag.eq_ignore_ascii_case("s") {
            return Err(invalid(parser, "unknown attribute flag"));
        }
    }
    parser.skip_whitespace();
    if !parser.is_exhausted() {
        return Err(invalid(parser, "unexpected tokens in attribute selector"));
    }
    Ok(AttrSelector {
        name,
        op,
        value: Some(value),
        case_insensitive,
    })
}

fn parse_pseudo<'i>(
    parser: &mut Parser<'i, '_>,
    simple: &mut SimpleSelector,
) -> std::result::Result<(), cssparser::ParseError<'i, CascataError>> {
    let token = parser.next_including_whitespace()?.clone();
    match token {
        Token::Colon => {
            let name = match parser.next_including_whitespace() {
                Ok(Token::Ident(name)) => name.to_ascii_lowercase(),
                _ => return Err(invalid(parser, "expected pseudo-element name")),
            };
            set_pseudo_element(parser, simple, name)
        }
        Token::Ident(name) => {
            let lower = name.to_ascii_lowercase();
            // Legacy single-colon pseudo-elements.
            if matches!(
                lower.as_str(),
                "before" | "after" | "first-line" | "first-letter"
            ) {
                return set_pseudo_element(parser, simple, lower);
            }
            let pseudo = pseudo_class_by_name(parser, &lower)?;
            simple.pseudos.push(pseudo);
            Ok(())
        }
        Token::Function(name) => {
            let pseudo = parse_functional_pseudo(parser, &name.to_ascii_lowercase())?;
            simple.pseudos.push(pseudo);
            Ok(())
        }
        _ => Err(invalid(parser, "expected pseudo-class name")),
    }
}

fn set_pseudo_element<'i>(
    parser: &Parser<'i, '_>,
    simple: &mut SimpleSelector,
    name: String,
) -> std::result::Result<(), cssparser::ParseError<'i, CascataError>> {
    if simple.pseudo_element.is_some() {
        return Err(invalid(parser, "multiple pseudo-elements"));
    }
    match name.as_str() {
        "before" | "after" | "first-line" | "first-letter" | "marker" | "placeholder"
        | "selection" | "backdrop" => {
            simple.pseudo_element = Some(name);
            Ok(())
        }
        _ => Err(invalid(parser, "unknown pseudo-element")),
    }
}

fn pseudo_class_by_name<'i>(
    parser: &Parser<'i, '_>,
    name: &str,
) -> std::result::Result<PseudoClass, cssparser::ParseError<'i, CascataError>> {
    Ok(match name {
        "root" => PseudoClass::Root,
        "empty" => PseudoClass::Empty,
        "blank" => PseudoClass::Blank,
        "first-child" => PseudoClass::FirstChild,
        "last-child" => PseudoClass::LastChild,
        "only-child" => PseudoClass::OnlyChild,
        "first-of-type" => PseudoClass::FirstOfType,
        "last-of-type" => PseudoClass::LastOfType,
        "only-of-type" => PseudoClass::OnlyOfType,
        "link" => PseudoClass::Link,
        "any-link" => PseudoClass::AnyLink,
        "checked" => PseudoClass::Checked,
        "indeterminate" => PseudoClass::Indeterminate,
        "disabled" => PseudoClass::Disabled,
        "enabled" => PseudoClass::Enabled,
        "read-only" => PseudoClass::ReadOnly,
        "read-write" => PseudoClass::ReadWrite,
        "placeholder-shown" => PseudoClass::PlaceholderShown,
        "default" => PseudoClass::Default,
        "hover" | "focus" | "active" | "focus-within" | "focus-visible" | "visited"
        | "target" => PseudoClass::State(name.to_string()),
        _ => return Err(invalid(parser, "unknown pseudo-class")),
    })
}

fn parse_functional_pseudo<'i>(
    parser: &mut Parser<'i, '_>,
    name: &str,
) -> std::result::Result<PseudoClass, cssparser::ParseError<'i, CascataError>> {
    match name {
        "not" => Ok(PseudoClass::Not(
            parser.parse_nested_block(parse_selector_list)?,
        )),
        "is" => Ok(PseudoClass::Is(
            parser.parse_nested_block(parse_selector_list)?,
        )),
        "where" => Ok(PseudoClass::Where(
            parser.parse_nested_block(parse_selector_list)?,
        )),
        "has" => Ok(PseudoClass::Has(
            parser.parse_nested_block(parse_relative_list)?,
        )),
        "nth-child" => parse_nth_pseudo(parser, NthKind::Child, true),
        "nth-last-child" => parse_nth_pseudo(parser, NthKind::LastChild, true),
        "nth-of-type" => parse_nth_pseudo(parser, NthKind::OfType, false),
        "nth-last-of-type" => parse_nth_pseudo(parser, NthKind::LastOfType, false),
        "lang" => Ok(PseudoClass::Lang(parser.parse_nested_block(parse_lang_args)?)),
        "dir" => Ok(PseudoClass::Dir(parser.parse_nested_block(parse_dir_arg)?)),
        _ => Err(invalid(parser, "unknown functional pseudo-class")),
    }
}

fn parse_nth_pseudo<'i>(
    parser: &mut Parser<'i, '_>,
    kind: NthKind,
    allow_of: bool,
) -> std::result::Result<PseudoClass, cssparser::ParseError<'i, CascataError>> {
    parser.parse_nested_block(|p| {
        let (a, b) = cssparser::parse_nth(p)?;
        let of = if allow_of
            && p.try_parse(|p| p.expect_ident_matching("of")).is_ok()
        {
            Some(parse_selector_list(p)?)
        } else {
            None
        };
        p.skip_whitespace();
        if !p.is_exhausted() {
            return Err(invalid(p, "unexpected tokens in nth expression"));
        }
        Ok(PseudoClass::Nth { kind, a, b, of })
    })
}

fn parse_relative_list<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<Vec<RelativeSelector>, cssparser::ParseError<'i, CascataError>> {
    let mut relatives = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }
        let relative = parser.parse_until_before(Delimiter::Comma, |p| {
            p.skip_whitespace();
            let combinator = if eat_combinator(p, '>') {
                Combinator::Child
            } else if eat_combinator(p, '+') {
                Combinator::AdjacentSibling
            } else if eat_combinator(p, '~') {
                Combinator::GeneralSibling
            } else {
                Combinator::Descendant
            };
            let pattern = parse_pattern(p)?;
            Ok(RelativeSelector {
                combinator,
                pattern,
            })
        })?;
        relatives.push(relative);
        if parser.next().is_err() {
            break;
        }
    }
    if relatives.is_empty() {
        return Err(invalid(parser, "empty relative selector"));
    }
    Ok(relatives)
}

fn eat_combinator(parser: &mut Parser<'_, '_>, delim: char) -> bool {
    let state = parser.state();
    match parser.next() {
        Ok(Token::Delim(d)) if *d == delim => true,
        _ => {
            parser.reset(&state);
            false
        }
    }
}

fn parse_dir_arg<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<String, cssparser::ParseError<'i, CascataError>> {
    parser.skip_whitespace();
    let dir = parser.expect_ident()?.to_ascii_lowercase();
    parser.skip_whitespace();
    if !parser.is_exhausted() {
        return Err(invalid(parser, "unexpected tokens in :dir()"));
    }
    Ok(dir)
}

fn parse_lang_args<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<Vec<String>, cssparser::ParseError<'i, CascataError>> {
    let mut ranges = Vec::new();
    loop {
        parser.skip_whitespace();
        let token = parser.next()?.clone();
        let range = match token {
            Token::Ident(s) => s.to_string(),
            Token::QuotedString(s) => s.to_string(),
            _ => return Err(invalid(parser, "expected language range")),
        };
        ranges.push(range);
        parser.skip_whitespace();
        match parser.next() {
            Ok(Token::Comma) => continue,
            Err(_) => break,
            Ok(_) => return Err(invalid(parser, "expected comma in :lang()")),
        }
    }
    if ranges.is_empty() {
        return Err(invalid(parser, "empty :lang()"));
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(text: &str) -> SelectorList {
        SelectorList::parse_str(text).expect("selector should parse")
    }

    fn single(text: &str) -> SelectorPattern {
        let mut parsed = list(text);
        assert_eq!(parsed.alternatives.len(), 1);
        parsed.alternatives.remove(0)
    }

    #[test]
    fn specificity_ranks_id_class_tag() {
        let id = single("#id").specificity();
        let class = single(".class").specificity();
        let tag = single("p").specificity();
        assert_eq!(id, Specificity(1, 0, 0));
        assert_eq!(class, Specificity(0, 1, 0));
        assert_eq!(tag, Specificity(0, 0, 1));
        assert!(id > class);
        assert!(class > tag);
    }

    #[test]
    fn compound_specificity_sums() {
        assert_eq!(single("p.exampleclass").specificity(), Specificity(0, 1, 1));
        assert_eq!(
            single("div#main .item[href]").specificity(),
            Specificity(1, 2, 1)
        );
        assert_eq!(single("p::before").specificity(), Specificity(0, 0, 2));
    }

    #[test]
    fn where_contributes_zero() {
        assert_eq!(single(":where(#id.cls)").specificity(), Specificity::ZERO);
        assert_eq!(
            single("p:where(#id)").specificity(),
            Specificity(0, 0, 1)
        );
    }

    #[test]
    fn is_takes_most_specific_argument() {
        assert_eq!(single(":is(p, .cls)").specificity(), Specificity(0, 1, 0));
        assert_eq!(
            single(":is(p, #id, .cls)").specificity(),
            Specificity(1, 0, 0)
        );
        assert_eq!(single(":not(#id, p)").specificity(), Specificity(1, 0, 0));
    }

    #[test]
    fn combinators_parse_in_order() {
        let pattern = single("div > p + span ~ em b");
        assert_eq!(pattern.parts.len(), 5);
        assert_eq!(
            pattern.combinators,
            vec![
                Combinator::Child,
                Combinator::AdjacentSibling,
                Combinator::GeneralSibling,
                Combinator::Descendant,
            ]
        );
    }

    #[test]
    fn attribute_operators_parse() {
        let pattern = single("[a][b=x][c~=x][d|=x][e^=x][f$=x][g*=x]");
        let ops: Vec<AttrOp> = pattern.parts[0].attrs.iter().map(|a| a.op).collect();
        assert_eq!(
            ops,
            vec![
                AttrOp::Exists,
                AttrOp::Equals,
                AttrOp::Includes,
                AttrOp::DashMatch,
                AttrOp::Prefix,
                AttrOp::Suffix,
                AttrOp::Substring,
            ]
        );
    }

    #[test]
    fn attribute_case_flag_parses() {
        let pattern = single("[title=\"Hello\" i]");
        let attr = &pattern.parts[0].attrs[0];
        assert_eq!(attr.value.as_deref(), Some("Hello"));
        assert!(attr.case_insensitive);
    }

    #[test]
    fn nth_child_of_list_parses() {
        let pattern = single("p:nth-child(2n+1 of .special)");
        let PseudoClass::Nth { kind, a, b, of } = &pattern.parts[0].pseudos[0] else {
            panic!("expected nth pseudo");
        };
        assert_eq!(*kind, NthKind::Child);
        assert_eq!((*a, *b), (2, 1));
        assert!(of.is_some());
    }

    #[test]
    fn nth_keywords_parse() {
        let even = single(":nth-child(even)");
        let PseudoClass::Nth { a, b, .. } = &even.parts[0].pseudos[0] else {
            panic!("expected nth pseudo");
        };
        assert_eq!((*a, *b), (2, 0));
    }

    #[test]
    fn has_relative_combinator_parses() {
        let pattern = single("div:has(> img, p)");
        let PseudoClass::Has(relatives) = &pattern.parts[0].pseudos[0] else {
            panic!("expected has pseudo");
        };
        assert_eq!(relatives.len(), 2);
        assert_eq!(relatives[0].combinator, Combinator::Child);
        assert_eq!(relatives[1].combinator, Combinator::Descendant);
    }

    #[test]
    fn legacy_pseudo_element_colon_accepted() {
        let pattern = single("p:before");
        assert_eq!(pattern.parts[0].pseudo_element.as_deref(), Some("before"));
        let modern = single("p::after");
        assert_eq!(modern.parts[0].pseudo_element.as_deref(), Some("after"));
    }

    #[test]
    fn selector_list_splits_on_commas() {
        let parsed = list("h1, h2.title , #main");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.specificity_of(2), Specificity(1, 0, 0));
    }

    #[test]
    fn lang_ranges_parse() {
        let pattern = single(":lang(en, \"*-Latn\")");
        let PseudoClass::Lang(ranges) = &pattern.parts[0].pseudos[0] else {
            panic!("expected lang pseudo");
        };
        assert_eq!(ranges, &vec!["en".to_string(), "*-Latn".to_string()]);
    }

    #[test]
    fn namespace_syntax_is_accepted() {
        let pattern = single("svg|circle");
        assert_eq!(pattern.parts[0].namespace.as_deref(), Some("svg"));
        assert_eq!(pattern.parts[0].tag.as_deref(), Some("circle"));
    }

    #[test]
    fn malformed_selectors_error() {
        assert!(SelectorList::parse_str("").is_err());
        assert!(SelectorList::parse_str("div >").is_err());
        assert!(SelectorList::parse_str("..a").is_err());
        assert!(SelectorList::parse_str(":unknown-thing").is_err());
        assert!(SelectorList::parse_str("p, ,q").is_err());
        assert!(SelectorList::parse_str("[a=]").is_err());
    }

    #[test]
    fn tag_names_lowercase_but_classes_do_not() {
        let pattern = single("DIV.MyClass#MyId");
        assert_eq!(pattern.parts[0].tag.as_deref(), Some("div"));
        assert_eq!(pattern.parts[0].classes, vec!["MyClass".to_string()]);
        assert_eq!(pattern.parts[0].id.as_deref(), Some("MyId"));
    }
}

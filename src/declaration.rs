use crate::error::{CascataError, Issue, ParseError, Result};
use crate::shorthand::{ShorthandBuilder, builder_for, families_of, is_shorthand};
use crate::value::{PropertyValue, SerializeOptions};
use cssparser::{Delimiter, Parser, ParserInput, Token};

/// Legacy syntax accepted under the corresponding parser flag. Tagged
/// declarations round-trip with their marker; the priority hacks form an
/// override chain separate from standard important arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatTag {
    None,
    /// `!ie` priority marker.
    LegacyBang,
    /// `!important!` double-bang priority.
    PrioChar,
    /// `\9`-suffixed value, marker re-emitted on serialization.
    IeValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Standard,
    Legacy,
}

/// Syntax extensions recognized by the declaration parser. All default to
/// off; enabling one downgrades its syntax from error to warning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserFlags {
    /// Accept `\9`-suffixed legacy values.
    pub ie_values: bool,
    /// Accept the `!ie` priority marker.
    pub ie_prio: bool,
    /// Accept the `!important!` legacy priority.
    pub ie_prio_char: bool,
    /// Accept `*property` names.
    pub star_hack: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: PropertyValue,
    pub important: bool,
    pub compat: CompatTag,
}

impl Declaration {
    pub fn new(name: impl Into<String>, value: PropertyValue, important: bool) -> Declaration {
        Declaration {
            name: name.into(),
            value,
            important,
            compat: CompatTag::None,
        }
    }

    pub(crate) fn channel(&self) -> Channel {
        match self.compat {
            CompatTag::None => Channel::Standard,
            CompatTag::LegacyBang | CompatTag::PrioChar | CompatTag::IeValue => Channel::Legacy,
        }
    }

    fn value_text(&self, minified: bool, options: &SerializeOptions) -> String {
        let mut out = if minified {
            self.value.to_minified_css_text()
        } else {
            self.value.to_css_text_with(options)
        };
        if self.compat == CompatTag::IeValue {
            out.push_str("\\9");
        }
        out
    }

    fn write_text(&self, out: &mut String, minified: bool, options: &SerializeOptions) {
        out.push_str(&self.name);
        out.push(':');
        if !minified {
            out.push(' ');
        }
        out.push_str(&self.value_text(minified, options));
        let suffix = match self.compat {
            CompatTag::PrioChar => "!important!",
            CompatTag::LegacyBang => "!ie",
            _ if self.important => "!important",
            _ => "",
        };
        if !suffix.is_empty() {
            if !minified {
                out.push(' ');
            }
            out.push_str(suffix);
        }
        out.push(';');
    }
}

/// Ordered declaration block. Shorthands expand to longhands on insertion;
/// serialization coalesces them back through the builders. Overwrites keep
/// the original position so insertion order stays observable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDeclaration {
    entries: Vec<Declaration>,
    flags: ParserFlags,
    options: SerializeOptions,
    issues: Vec<Issue>,
}

impl StyleDeclaration {
    pub fn new() -> StyleDeclaration {
        StyleDeclaration::default()
    }

    pub fn with_flags(flags: ParserFlags) -> StyleDeclaration {
        StyleDeclaration {
            flags,
            ..StyleDeclaration::default()
        }
    }

    pub fn set_serialize_options(&mut self, options: SerializeOptions) {
        self.options = options;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Property name at `index`, empty when out of range.
    pub fn item(&self, index: usize) -> &str {
        self.entries.get(index).map_or("", |d| d.name.as_str())
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn take_issues(&mut self) -> Vec<Issue> {
        std::mem::take(&mut self.issues)
    }

    pub(crate) fn entries(&self) -> &[Declaration] {
        &self.entries
    }

    fn find(&self, name: &str, channel: Channel) -> Option<&Declaration> {
        self.entries
            .iter()
            .find(|d| d.name == name && d.channel() == channel)
    }

    fn find_index(&self, name: &str, channel: Channel) -> Option<usize> {
        self.entries
            .iter()
            .position(|d| d.name == name && d.channel() == channel)
    }

    /// The per-name override machine. Standard entries refuse a non-important
    /// overwrite of an important value; the legacy channel is last-wins.
    pub(crate) fn apply(&mut self, decl: Declaration) {
        match self.find_index(&decl.name, decl.channel()) {
            Some(index) => {
                let existing = &self.entries[index];
                let allowed = match decl.channel() {
                    Channel::Legacy => true,
                    Channel::Standard => !existing.important || decl.important,
                };
                if allowed {
                    self.entries[index] = decl;
                }
            }
            None => self.entries.push(decl),
        }
    }

    fn remove_entry(&mut self, name: &str, channel: Channel) {
        self.entries
            .retain(|d| !(d.name == name && d.channel() == channel));
    }

    /// Routes a parsed declaration: legacy-tagged and var()-carrying
    /// shorthands stay whole, everything else expands. Err carries the issue
    /// for a dropped declaration.
    fn insert_declaration(&mut self, decl: Declaration) -> std::result::Result<(), Issue> {
        if decl.compat != CompatTag::None {
            self.apply(decl);
            return Ok(());
        }
        let Some(builder) = builder_for(&decl.name) else {
            self.apply(decl);
            return Ok(());
        };
        // A pending shorthand entry gates the whole replacement the same way
        // a single property would.
        if let Some(pending) = self.find(&decl.name, Channel::Standard) {
            if pending.important && !decl.important {
                return Ok(());
            }
        }
        if decl.value.contains_var() {
            self.apply(decl);
            return Ok(());
        }
        if decl.value.is_global_keyword() {
            self.remove_entry(&decl.name, Channel::Standard);
            for longhand in builder.longhands() {
                self.apply(Declaration::new(*longhand, decl.value.clone(), decl.important));
            }
            return Ok(());
        }
        match builder.expand(&decl.value) {
            Some(pairs) => {
                self.remove_entry(&decl.name, Channel::Standard);
                for (longhand, value) in pairs {
                    self.apply(Declaration::new(longhand, value, decl.important));
                }
                Ok(())
            }
            None => {
                let value = decl.value.to_css_text();
                Err(Issue::error(
                    decl.name.clone(),
                    ParseError::InvalidValue {
                        property: decl.name,
                        value,
                    },
                ))
            }
        }
    }

    /// Sets one property from text. Structural misuse (bad priority, garbage
    /// value) surfaces as Err; an empty value removes the property.
    pub fn set_property(&mut self, name: &str, value: &str, priority: &str) -> Result<()> {
        let name = normalize_property_name(name);
        if name.is_empty() {
            return Err(ParseError::InvalidCss {
                message: "empty property name".to_string(),
                line: 0,
                column: 0,
            }
            .into());
        }
        let important = if priority.is_empty() {
            false
        } else if priority.eq_ignore_ascii_case("important") {
            true
        } else {
            return Err(ParseError::InvalidCss {
                message: format!("unknown priority {priority:?}"),
                line: 0,
                column: 0,
            }
            .into());
        };
        if value.trim().is_empty() {
            self.remove_property(&name);
            return Ok(());
        }
        let parsed = PropertyValue::parse_str(value)?;
        self.insert_declaration(Declaration::new(name, parsed, important))
            .map_err(|issue| issue.error)
    }

    /// Removes a property (all component longhands for a shorthand) and
    /// returns its previous value text.
    pub fn remove_property(&mut self, name: &str) -> String {
        let name = normalize_property_name(name);
        let previous = self.get_property_value(&name);
        if let Some(builder) = builder_for(&name) {
            for longhand in builder.longhands() {
                self.remove_entry(longhand, Channel::Standard);
            }
        }
        self.remove_entry(&name, Channel::Standard);
        previous
    }

    /// Value text for a property; shorthands reconstruct through their
    /// builder and return empty when the longhands cannot be represented.
    pub fn get_property_value(&self, name: &str) -> String {
        let name = normalize_property_name(name);
        if let Some(decl) = self.find(&name, Channel::Standard) {
            return decl.value_text(false, &self.options);
        }
        let Some(builder) = builder_for(&name) else {
            return String::new();
        };
        let Some(group) = self.coalesce(builder, false) else {
            return String::new();
        };
        if group.trailing.is_empty() {
            group.value
        } else {
            String::new()
        }
    }

    /// "important" only when the property (every component, for a shorthand)
    /// is important.
    pub fn get_property_priority(&self, name: &str) -> &'static str {
        let name = normalize_property_name(name);
        if let Some(decl) = self.find(&name, Channel::Standard) {
            return if decl.important { "important" } else { "" };
        }
        if let Some(builder) = builder_for(&name) {
            let components: Vec<&Declaration> = builder
                .longhands()
                .iter()
                .filter_map(|lh| self.find(lh, Channel::Standard))
                .collect();
            if components.len() == builder.longhands().len()
                && components.iter().all(|d| d.important)
            {
                return "important";
            }
        }
        ""
    }

    /// Merges another block's declarations into this one under the same
    /// override rules, in the other block's order.
    pub fn add_style(&mut self, other: &StyleDeclaration) {
        for decl in &other.entries {
            self.apply(decl.clone());
        }
    }

    /// Full replace from a declaration block. Parse problems land in
    /// `issues()`; parsing always continues at the next semicolon.
    pub fn set_css_text(&mut self, css: &str) {
        self.entries.clear();
        self.issues.clear();
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        self.parse_block_into(&mut parser);
    }

    /// Parses a declaration block from an already-open parser, appending to
    /// the current entries. Used for rule bodies inside a stylesheet.
    pub(crate) fn parse_block_into(&mut self, parser: &mut Parser<'_, '_>) {
        let mut parsed: Vec<Declaration> = Vec::new();
        parse_declaration_block(parser, self.flags, &mut self.issues, &mut parsed);
        for decl in parsed {
            if let Err(issue) = self.insert_declaration(decl) {
                self.issues.push(issue);
            }
        }
    }

    pub fn css_text(&self) -> String {
        self.serialize(false)
    }

    pub fn minified_css_text(&self) -> String {
        self.serialize(true)
    }

    fn serialize(&self, minified: bool) -> String {
        let mut pieces: Vec<String> = Vec::new();
        let mut emitted = vec![false; self.entries.len()];
        for index in 0..self.entries.len() {
            if emitted[index] {
                continue;
            }
            let decl = &self.entries[index];
            if decl.compat != CompatTag::None || is_shorthand(&decl.name) {
                emitted[index] = true;
                let mut piece = String::new();
                decl.write_text(&mut piece, minified, &self.options);
                pieces.push(piece);
                continue;
            }
            let mut coalesced = false;
            for family in families_of(&decl.name) {
                let indices: Option<Vec<usize>> = family
                    .longhands()
                    .iter()
                    .map(|lh| self.find_index(lh, Channel::Standard))
                    .collect();
                let Some(indices) = indices else { continue };
                if indices.iter().any(|i| emitted[*i]) {
                    continue;
                }
                let Some(group) = self.coalesce(family, minified) else {
                    continue;
                };
                let mut piece = String::new();
                piece.push_str(family.name());
                piece.push(':');
                if !minified {
                    piece.push(' ');
                }
                piece.push_str(&group.value);
                if group.important {
                    if !minified {
                        piece.push(' ');
                    }
                    piece.push_str("!important");
                }
                piece.push(';');
                pieces.push(piece);
                for longhand_index in group.trailing {
                    let entry_index = indices[longhand_index];
                    let mut piece = String::new();
                    self.entries[entry_index].write_text(&mut piece, minified, &self.options);
                    pieces.push(piece);
                }
                for entry_index in indices {
                    emitted[entry_index] = true;
                }
                coalesced = true;
                break;
            }
            if !coalesced {
                emitted[index] = true;
                let mut piece = String::new();
                decl.write_text(&mut piece, minified, &self.options);
                pieces.push(piece);
            }
        }
        if minified {
            let mut out = pieces.join("");
            if out.ends_with(';') {
                out.pop();
            }
            out
        } else {
            pieces.join(" ")
        }
    }

    /// Shorthand reconstruction over the current longhand set. Importance
    /// outliers and global-keyword components are pushed out as trailing
    /// longhands; a majority-important mix cannot be represented because a
    /// trailing normal longhand would lose to the important shorthand.
    fn coalesce(
        &self,
        family: &'static dyn ShorthandBuilder,
        minified: bool,
    ) -> Option<CoalescedGroup> {
        let components: Option<Vec<&Declaration>> = family
            .longhands()
            .iter()
            .map(|lh| self.find(lh, Channel::Standard))
            .collect();
        let components = components?;
        let total = components.len();
        let important_count = components.iter().filter(|d| d.important).count();
        let uniform_important = important_count == 0 || important_count == total;
        if !uniform_important && important_count * 2 > total {
            return None;
        }
        let shorthand_important = uniform_important && important_count == total;

        let globals: Vec<usize> = (0..total)
            .filter(|i| components[*i].value.is_global_keyword())
            .collect();
        if globals.len() == total {
            let first = &components[0].value;
            if uniform_important && components.iter().all(|d| &d.value == first) {
                let value = if minified {
                    first.to_minified_css_text()
                } else {
                    first.to_css_text_with(&self.options)
                };
                return Some(CoalescedGroup {
                    value,
                    important: shorthand_important,
                    trailing: Vec::new(),
                });
            }
            return None;
        }

        let slots: Vec<Option<&PropertyValue>> = (0..total)
            .map(|i| {
                let excluded = globals.contains(&i)
                    || (!uniform_important && components[i].important);
                if excluded { None } else { Some(&components[i].value) }
            })
            .collect();
        let built = family.build(&slots, minified, &self.options)?;
        let mut trailing = built.trailing;
        for i in &globals {
            if !trailing.contains(i) {
                trailing.push(*i);
            }
        }
        if !uniform_important {
            for (i, component) in components.iter().enumerate() {
                if component.important && !trailing.contains(&i) {
                    trailing.push(i);
                }
            }
        }
        trailing.sort_unstable();
        trailing.dedup();
        Some(CoalescedGroup {
            value: built.value,
            important: shorthand_important,
            trailing,
        })
    }
}

struct CoalescedGroup {
    value: String,
    important: bool,
    trailing: Vec<usize>,
}

/// Custom properties keep their case; everything else lowercases.
fn normalize_property_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with("--") {
        trimmed.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Parses a declaration block, pushing well-formed declarations to `sink`
/// and problems to `issues`. Recovery is per declaration at the semicolon.
pub(crate) fn parse_declaration_block(
    parser: &mut Parser<'_, '_>,
    flags: ParserFlags,
    issues: &mut Vec<Issue>,
    sink: &mut Vec<Declaration>,
) {
    loop {
        parser.skip_whitespace();
        if parser.is_exhausted() {
            break;
        }
        let result = parser.parse_until_after(Delimiter::Semicolon, |p| {
            parse_one_declaration(p, flags, issues)
        });
        match result {
            Ok(Some(decl)) => sink.push(decl),
            Ok(None) => {}
            Err(err) => issues.push(issue_from_parse_error(err)),
        }
    }
}

fn parse_one_declaration<'i>(
    parser: &mut Parser<'i, '_>,
    flags: ParserFlags,
    issues: &mut Vec<Issue>,
) -> std::result::Result<Option<Declaration>, cssparser::ParseError<'i, CascataError>> {
    parser.skip_whitespace();
    if parser.is_exhausted() {
        return Ok(None);
    }
    let location = parser.current_source_location();
    let star = eat_delim(parser, '*');
    let raw_name = parser.expect_ident()?.to_string();
    let name = if star {
        if !flags.star_hack {
            let property = normalize_property_name(&raw_name);
            return Err(parser.new_custom_error(CascataError::Parse(ParseError::LegacySyntax {
                property,
                marker: "*".to_string(),
            })));
        }
        format!("*{}", raw_name.to_ascii_lowercase())
    } else {
        normalize_property_name(&raw_name)
    };
    parser.expect_colon()?;
    parser.skip_whitespace();

    let start = parser.position();
    parser.parse_until_before(Delimiter::Bang, |p| {
        while p.next().is_ok() {}
        Ok::<_, cssparser::ParseError<CascataError>>(())
    })?;
    let raw_value = parser.slice_from(start).trim().to_string();

    let mut important = false;
    let mut compat = CompatTag::None;
    if eat_delim(parser, '!') {
        let token = parser.next()?.clone();
        match token {
            Token::Ident(word) if word.eq_ignore_ascii_case("important") => {
                important = true;
                if eat_delim(parser, '!') {
                    if !flags.ie_prio_char {
                        return Err(parser.new_custom_error(CascataError::Parse(
                            ParseError::LegacySyntax {
                                property: name,
                                marker: "!important!".to_string(),
                            },
                        )));
                    }
                    compat = CompatTag::PrioChar;
                    issues.push(Issue::warning(
                        name.clone(),
                        ParseError::LegacySyntax {
                            property: name.clone(),
                            marker: "!important!".to_string(),
                        },
                    ));
                }
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("ie") => {
                if !flags.ie_prio {
                    return Err(parser.new_custom_error(CascataError::Parse(
                        ParseError::LegacySyntax {
                            property: name,
                            marker: "!ie".to_string(),
                        },
                    )));
                }
                compat = CompatTag::LegacyBang;
                issues.push(Issue::warning(
                    name.clone(),
                    ParseError::LegacySyntax {
                        property: name.clone(),
                        marker: "!ie".to_string(),
                    },
                ));
            }
            other => {
                return Err(parser.new_unexpected_token_error(other));
            }
        }
        parser.skip_whitespace();
        if !parser.is_exhausted() {
            return Err(parser.new_custom_error(CascataError::Parse(ParseError::InvalidCss {
                message: format!("unexpected tokens after priority of {name}"),
                line: location.line,
                column: location.column,
            })));
        }
    }

    let mut value_source = raw_value;
    if value_source.contains("\\9") || value_source.contains("\\0") {
        if !flags.ie_values {
            return Err(parser.new_custom_error(CascataError::Parse(ParseError::LegacySyntax {
                property: name,
                marker: "\\9".to_string(),
            })));
        }
        value_source = value_source.replace("\\9", "").replace("\\0", "");
        value_source = value_source.trim().to_string();
        if compat == CompatTag::None {
            compat = CompatTag::IeValue;
        }
        issues.push(Issue::warning(
            name.clone(),
            ParseError::LegacySyntax {
                property: name.clone(),
                marker: "\\9".to_string(),
            },
        ));
    }
    if star && compat == CompatTag::None {
        issues.push(Issue::warning(
            name.clone(),
            ParseError::LegacySyntax {
                property: name.clone(),
                marker: "*".to_string(),
            },
        ));
    }

    let value = PropertyValue::parse_str(&value_source)
        .map_err(|err| parser.new_custom_error(err))?;
    Ok(Some(Declaration {
        name,
        value,
        important,
        compat,
    }))
}

fn eat_delim<'i>(parser: &mut Parser<'i, '_>, delim: char) -> bool {
    parser
        .try_parse(|p| -> std::result::Result<(), cssparser::ParseError<'i, ()>> {
            match p.next() {
                Ok(Token::Delim(d)) if *d == delim => Ok(()),
                Ok(t) => {
                    let t = t.clone();
                    Err(p.new_unexpected_token_error(t))
                }
                Err(e) => Err(e.into()),
            }
        })
        .is_ok()
}

pub(crate) fn issue_from_parse_error(err: cssparser::ParseError<'_, CascataError>) -> Issue {
    match err.kind {
        cssparser::ParseErrorKind::Custom(inner) => {
            let property = match &inner {
                CascataError::Parse(ParseError::LegacySyntax { property, .. }) => property.clone(),
                CascataError::Parse(ParseError::InvalidValue { property, .. }) => property.clone(),
                _ => String::new(),
            };
            Issue::error(property, inner)
        }
        cssparser::ParseErrorKind::Basic(basic) => {
            let message = match basic {
                cssparser::BasicParseErrorKind::UnexpectedToken(token) => {
                    format!("unexpected token {token:?}")
                }
                cssparser::BasicParseErrorKind::EndOfInput => {
                    "unexpected end of input".to_string()
                }
                cssparser::BasicParseErrorKind::AtRuleInvalid(name) => {
                    format!("invalid at-rule @{name}")
                }
                cssparser::BasicParseErrorKind::AtRuleBodyInvalid => {
                    "invalid at-rule body".to_string()
                }
                cssparser::BasicParseErrorKind::QualifiedRuleInvalid => {
                    "invalid rule".to_string()
                }
            };
            Issue::error(
                "",
                ParseError::InvalidCss {
                    message,
                    line: err.location.line,
                    column: err.location.column,
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Severity;

    fn block(css: &str) -> StyleDeclaration {
        let mut style = StyleDeclaration::new();
        style.set_css_text(css);
        style
    }

    fn block_with(css: &str, flags: ParserFlags) -> StyleDeclaration {
        let mut style = StyleDeclaration::with_flags(flags);
        style.set_css_text(css);
        style
    }

    #[test]
    fn later_declaration_overrides_earlier() {
        let style = block("width: 590px; width: 600px;");
        assert_eq!(style.len(), 1);
        assert_eq!(style.get_property_value("width"), "600px");
    }

    #[test]
    fn important_blocks_normal_overwrite() {
        let style = block("width: 600px !important; width: 590px;");
        assert_eq!(style.get_property_value("width"), "600px");
        assert_eq!(style.get_property_priority("width"), "important");
    }

    #[test]
    fn important_overwrites_important() {
        let style = block("width: 600px !important; width: 590px !important;");
        assert_eq!(style.get_property_value("width"), "590px");
    }

    #[test]
    fn prio_char_keeps_both_channels() {
        let flags = ParserFlags {
            ie_prio_char: true,
            ..ParserFlags::default()
        };
        let style = block_with("margin: 10px; margin: 8px !important!;", flags);
        // Four longhands from the standard channel plus the legacy entry.
        assert_eq!(style.len(), 5);
        assert_eq!(style.get_property_value("margin"), "10px");
        assert_eq!(
            style.css_text(),
            "margin: 10px; margin: 8px !important!;"
        );
        assert!(style.issues().iter().any(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn prio_char_without_flag_drops_and_records_error() {
        let style = block("margin: 10px; margin: 8px !important!;");
        assert_eq!(style.get_property_value("margin"), "10px");
        assert_eq!(style.len(), 4);
        assert!(style.issues().iter().any(|i| i.severity == Severity::Error));
    }

    #[test]
    fn legacy_channel_is_last_wins() {
        let flags = ParserFlags {
            ie_prio_char: true,
            ie_prio: true,
            ..ParserFlags::default()
        };
        let style = block_with("margin: 8px !important!; margin: 9px !ie;", flags);
        assert_eq!(style.len(), 1);
        assert_eq!(style.css_text(), "margin: 9px !ie;");
    }

    #[test]
    fn backslash_nine_value_round_trips_under_flag() {
        let flags = ParserFlags {
            ie_values: true,
            ..ParserFlags::default()
        };
        let style = block_with("margin: 1px\\9;", flags);
        assert_eq!(style.css_text(), "margin: 1px\\9;");
        assert!(style.issues().iter().any(|i| i.severity == Severity::Warning));

        let bare = block("margin: 1px\\9;");
        assert!(bare.is_empty());
        assert!(bare.issues().iter().any(|i| i.severity == Severity::Error));
    }

    #[test]
    fn backslash_nine_leaves_standard_channel_alone() {
        let flags = ParserFlags {
            ie_values: true,
            ..ParserFlags::default()
        };
        let style = block_with("margin-left: 10px; margin-left: 8px\\9;", flags);
        assert_eq!(style.len(), 2);
        assert_eq!(style.get_property_value("margin-left"), "10px");
        assert_eq!(
            style.css_text(),
            "margin-left: 10px; margin-left: 8px\\9;"
        );
    }

    #[test]
    fn star_hack_keeps_prefix() {
        let flags = ParserFlags {
            star_hack: true,
            ..ParserFlags::default()
        };
        let style = block_with("*zoom: 1; width: 10px;", flags);
        assert_eq!(style.css_text(), "*zoom: 1; width: 10px;");

        let bare = block("*zoom: 1; width: 10px;");
        assert_eq!(bare.css_text(), "width: 10px;");
        assert!(bare.issues().iter().any(|i| i.severity == Severity::Error));
    }

    #[test]
    fn border_round_trips_through_longhands() {
        let style = block("border: 1px dashed blue;");
        assert_eq!(style.len(), 12);
        assert_eq!(style.get_property_value("border"), "1px dashed blue");
        assert_eq!(style.css_text(), "border: 1px dashed blue;");
        assert_eq!(style.minified_css_text(), "border:1px dashed blue");
    }

    #[test]
    fn trailing_override_serializes_after_shorthand() {
        let style = block("border: 1px solid red; border-top-width: 2px;");
        assert_eq!(
            style.css_text(),
            "border: 1px solid red; border-top-width: 2px;"
        );
        // Not representable as a single shorthand value.
        assert_eq!(style.get_property_value("border"), "");
    }

    #[test]
    fn inherit_component_trails_concrete_shorthand() {
        let style = block("border: 1px solid red; border-top-color: inherit;");
        assert_eq!(
            style.css_text(),
            "border: 1px solid red; border-top-color: inherit;"
        );
    }

    #[test]
    fn all_inherit_collapses_to_shorthand() {
        let style = block("margin: inherit;");
        assert_eq!(style.len(), 4);
        assert_eq!(style.css_text(), "margin: inherit;");
    }

    #[test]
    fn mixed_importance_emits_majority_with_outlier() {
        let mut style = block("margin: 1px;");
        style
            .set_property("margin-top", "2px", "important")
            .unwrap();
        assert_eq!(
            style.css_text(),
            "margin: 1px; margin-top: 2px !important;"
        );
        assert_eq!(style.get_property_priority("margin"), "");
    }

    #[test]
    fn majority_important_falls_back_to_longhands() {
        let style = block(
            "margin-top: 1px !important; margin-right: 1px !important; \
             margin-bottom: 1px !important; margin-left: 2px;",
        );
        assert_eq!(
            style.css_text(),
            "margin-top: 1px !important; margin-right: 1px !important; \
             margin-bottom: 1px !important; margin-left: 2px;"
        );
    }

    #[test]
    fn all_important_shorthand_keeps_priority() {
        let style = block("margin: 4px !important;");
        assert_eq!(style.css_text(), "margin: 4px !important;");
        assert_eq!(style.get_property_priority("margin"), "important");
        assert_eq!(style.minified_css_text(), "margin:4px!important");
    }

    #[test]
    fn shorthand_with_var_stays_whole() {
        let style = block("margin: var(--m, 4px);");
        assert_eq!(style.len(), 1);
        assert_eq!(style.css_text(), "margin: var(--m, 4px);");
        assert_eq!(style.get_property_value("margin"), "var(--m, 4px)");
    }

    #[test]
    fn malformed_declaration_recovers_at_semicolon() {
        let style = block("color:; width: 10px; border: 1px dotted;");
        assert_eq!(style.get_property_value("width"), "10px");
        assert_eq!(style.get_property_value("border-top-style"), "dotted");
        assert!(!style.issues().is_empty());
    }

    #[test]
    fn invalid_shorthand_value_is_dropped_with_error() {
        let style = block("margin: 1px solid;");
        assert!(style.is_empty());
        assert!(style.issues().iter().any(|i| i.severity == Severity::Error));
    }

    #[test]
    fn set_property_rejects_unknown_priority() {
        let mut style = StyleDeclaration::new();
        assert!(style.set_property("width", "10px", "very").is_err());
    }

    #[test]
    fn empty_value_removes() {
        let mut style = block("width: 10px;");
        style.set_property("width", "", "").unwrap();
        assert!(style.is_empty());
    }

    #[test]
    fn remove_property_returns_previous_value() {
        let mut style = block("margin: 2px 4px;");
        assert_eq!(style.remove_property("margin"), "2px 4px");
        assert!(style.is_empty());
        assert_eq!(style.remove_property("margin"), "");
    }

    #[test]
    fn item_lists_longhands_in_order() {
        let style = block("margin: 1px; color: red;");
        assert_eq!(style.item(0), "margin-top");
        assert_eq!(style.item(3), "margin-left");
        assert_eq!(style.item(4), "color");
        assert_eq!(style.item(9), "");
    }

    #[test]
    fn add_style_merges_with_override_rules() {
        let mut base = block("width: 590px; color: red !important;");
        let layer = block("width: 600px; color: blue;");
        base.add_style(&layer);
        assert_eq!(base.get_property_value("width"), "600px");
        assert_eq!(base.get_property_value("color"), "red");
    }

    #[test]
    fn reparse_of_serialization_is_equivalent() {
        let style = block("border: 1px solid red; border-top-width: 2px; margin: 3px 4px;");
        let reparsed = block(&style.css_text());
        assert_eq!(style.entries(), reparsed.entries());
    }

    #[test]
    fn minification_is_idempotent() {
        let style = block("margin: 10px 20px; border: 1px dashed blue;");
        let once = style.minified_css_text();
        let again = block(&once).minified_css_text();
        assert_eq!(once, again);
    }

    #[test]
    fn custom_property_keeps_case() {
        let style = block("--mainColor: #ff0000;");
        assert_eq!(style.item(0), "--mainColor");
        assert_eq!(style.get_property_value("--mainColor"), "#ff0000");
    }

    #[test]
    fn font_shorthand_round_trips() {
        let style = block("font: italic bold 12px/1.5 serif;");
        assert_eq!(style.len(), 6);
        assert_eq!(style.css_text(), "font: italic bold 12px/1.5 serif;");
    }

    #[test]
    fn getter_normalizes_name_case() {
        let style = block("COLOR: red;");
        assert_eq!(style.get_property_value("Color"), "red");
    }
}

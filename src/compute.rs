//! Computed-style resolution: cascade, inheritance, unit resolution and
//! custom-property substitution.
//!
//! The resolver owns the parsed rules of one stylesheet. Computing a style
//! is per element, given the parent's already-computed style; the result
//! carries pt-denominated lengths and the raw custom-property chain so
//! children can keep resolving against it.

use crate::debug::{DebugLogger, json_array, json_string};
use crate::declaration::{
    Channel, Declaration, ParserFlags, StyleDeclaration, issue_from_parse_error,
};
use crate::dom::{DomAdapter, StateProvider};
use crate::error::{CascataError, Issue, ParseError, Severity, StyleError};
use crate::matcher::MatchContext;
use crate::selector::{SelectorPattern, Specificity, parse_pattern};
use crate::shorthand::builder_for;
use crate::types::{Pt, Size};
use crate::value::{
    CssUnit, ListSeparator, PropertyValue, Rgba, SerializeOptions, UnitCategory, convert_unit,
    named_color,
};
use cssparser::{
    AtRuleParser, Delimiter, Parser, ParserInput, ParserState, QualifiedRuleParser,
    StyleSheetParser,
};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Medium-dependent defaults. The built-in fallback is an 800x600 CSS-pixel
/// viewport with a 12pt medium font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceInfo {
    pub viewport: Size,
    pub font_size: Pt,
    pub monospace_size: Pt,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        DeviceInfo {
            viewport: Size::from_px(800.0, 600.0),
            font_size: Pt::from_i32(12),
            monospace_size: Pt::from_i32(10),
        }
    }
}

/// Per-pass error accumulation, keyed by element handle. Separate contexts
/// give isolated passes; `reset` reuses one across passes.
#[derive(Debug)]
pub struct ResolutionContext<H> {
    issues: HashMap<H, Vec<Issue>>,
}

impl<H> Default for ResolutionContext<H> {
    fn default() -> Self {
        ResolutionContext {
            issues: HashMap::new(),
        }
    }
}

impl<H: Copy + Eq + Hash> ResolutionContext<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.issues.clear();
    }

    pub fn record(&mut self, element: H, issue: Issue) {
        self.issues.entry(element).or_default().push(issue);
    }

    pub fn issues_for(&self, element: H) -> &[Issue] {
        self.issues.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .values()
            .flatten()
            .any(|issue| issue.severity == Severity::Error)
    }

    pub fn total(&self) -> usize {
        self.issues.values().map(Vec::len).sum()
    }
}

/// Resolved style of one element. Lengths are pt-denominated; percentages
/// that need layout stay percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    properties: HashMap<String, PropertyValue>,
    custom: HashMap<String, PropertyValue>,
    font_size: Pt,
    line_height: Pt,
    line_height_normal: bool,
    root_font_size: Pt,
    root_line_height: Pt,
    vertical_writing: bool,
}

impl ComputedStyle {
    /// The style every root element inherits from: medium font, normal line
    /// height, nothing declared.
    pub fn initial(device: &DeviceInfo) -> ComputedStyle {
        let font_size = device.font_size;
        let line_height = font_size.mul_ratio(6, 5);
        ComputedStyle {
            properties: HashMap::new(),
            custom: HashMap::new(),
            font_size,
            line_height,
            line_height_normal: true,
            root_font_size: font_size,
            root_line_height: line_height,
            vertical_writing: false,
        }
    }

    pub fn font_size(&self) -> Pt {
        self.font_size
    }

    pub fn line_height(&self) -> Pt {
        self.line_height
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(&name.to_ascii_lowercase())
    }

    /// Raw declared value of a custom property, following the inheritance
    /// chain. Substitution happens at `var()` use sites, not here.
    pub fn custom_property(&self, name: &str) -> Option<&PropertyValue> {
        self.custom.get(name)
    }

    /// Serialized computed value. Shorthand names re-run the builders over
    /// the resolved longhands; unset longhands fall back to their initial
    /// value, or `""` when the property has none and was never declared.
    pub fn get_property_value(&self, name: &str) -> String {
        if name.starts_with("--") {
            return self
                .custom
                .get(name)
                .map(|v| v.to_css_text())
                .unwrap_or_default();
        }
        let name = name.to_ascii_lowercase();
        if let Some(value) = self.properties.get(&name) {
            return value.to_css_text();
        }
        if let Some(builder) = builder_for(&name) {
            let mut any_set = false;
            let owned: Vec<Option<PropertyValue>> = builder
                .longhands()
                .iter()
                .map(|longhand| match self.properties.get(*longhand) {
                    Some(value) => {
                        any_set = true;
                        Some(value.clone())
                    }
                    None => initial_value(longhand),
                })
                .collect();
            if !any_set {
                return String::new();
            }
            let slots: Vec<Option<&PropertyValue>> = owned.iter().map(Option::as_ref).collect();
            if let Some(built) = builder.build(&slots, false, &SerializeOptions::default()) {
                if built.trailing.is_empty() {
                    return built.value;
                }
            }
            return String::new();
        }
        initial_value(&name)
            .map(|v| v.to_css_text())
            .unwrap_or_default()
    }

    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

struct RuleEntry {
    pattern: SelectorPattern,
    specificity: Specificity,
    order: usize,
    declarations: StyleDeclaration,
    selector_text: String,
}

#[derive(Default)]
struct RuleIndex {
    by_tag: HashMap<String, Vec<usize>>,
    by_id: HashMap<String, Vec<usize>>,
    by_class: HashMap<String, Vec<usize>>,
    universal: Vec<usize>,
}

impl RuleIndex {
    fn new(rules: &[RuleEntry]) -> Self {
        let mut index = Self::default();
        for (i, rule) in rules.iter().enumerate() {
            let Some(last) = rule.pattern.parts.last() else {
                continue;
            };
            let mut indexed = false;
            if let Some(id) = &last.id {
                index.by_id.entry(id.clone()).or_default().push(i);
                indexed = true;
            }
            for class in &last.classes {
                index.by_class.entry(class.clone()).or_default().push(i);
                indexed = true;
            }
            if let Some(tag) = &last.tag {
                if tag != "*" {
                    index.by_tag.entry(tag.clone()).or_default().push(i);
                    indexed = true;
                }
            }
            if !indexed {
                index.universal.push(i);
            }
        }
        index
    }

    fn candidate_indices<D: DomAdapter>(&self, dom: &D, element: D::Handle) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        if let Some(id) = dom.element_id(element) {
            if let Some(v) = self.by_id.get(id) {
                out.extend(v);
            }
        }
        for class in dom.classes(element) {
            if let Some(v) = self.by_class.get(&class) {
                out.extend(v);
            }
        }
        if let Some(v) = self.by_tag.get(&dom.tag_name(element).to_ascii_lowercase()) {
            out.extend(v);
        }
        out.extend(&self.universal);
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Parsed stylesheet plus the environment style computation needs. At-rules
/// are skipped with a recorded warning; malformed rules drop at the next
/// rule boundary.
pub struct StyleResolver {
    rules: Vec<RuleEntry>,
    index: RuleIndex,
    device: DeviceInfo,
    flags: ParserFlags,
    debug: Option<Arc<DebugLogger>>,
    parse_issues: Vec<Issue>,
}

struct ParsedRule {
    selectors: Vec<(SelectorPattern, Specificity, String)>,
    declarations: StyleDeclaration,
}

struct SheetRuleParser {
    flags: ParserFlags,
}

impl<'i> QualifiedRuleParser<'i> for SheetRuleParser {
    type Prelude = Vec<(SelectorPattern, Specificity, String)>;
    type QualifiedRule = ParsedRule;
    type Error = crate::error::CascataError;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::Prelude, cssparser::ParseError<'i, Self::Error>> {
        // Each alternative's text is sliced from its parser span, so commas
        // nested in functional pseudos stay inside their selector.
        let mut out = Vec::new();
        loop {
            input.skip_whitespace();
            if input.is_exhausted() {
                break;
            }
            let start = input.position();
            let pattern = input.parse_until_before(Delimiter::Comma, parse_pattern)?;
            let selector_text = input.slice_from(start).trim().to_string();
            let specificity = pattern.specificity();
            out.push((pattern, specificity, selector_text));
            if input.next().is_err() {
                break;
            }
        }
        if out.is_empty() {
            return Err(input.new_custom_error(CascataError::Parse(
                ParseError::InvalidSelector {
                    selector: "empty selector".to_string(),
                },
            )));
        }
        Ok(out)
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> std::result::Result<Self::QualifiedRule, cssparser::ParseError<'i, Self::Error>> {
        let mut declarations = StyleDeclaration::with_flags(self.flags);
        declarations.parse_block_into(input);
        Ok(ParsedRule {
            selectors: prelude,
            declarations,
        })
    }
}

impl<'i> AtRuleParser<'i> for SheetRuleParser {
    type Prelude = ();
    type AtRule = ParsedRule;
    type Error = crate::error::CascataError;
    // Default trait methods reject every at-rule; the sheet loop records
    // the rejection and skips the block.
}

impl StyleResolver {
    pub fn new(css: &str) -> StyleResolver {
        Self::new_with_options(css, ParserFlags::default(), DeviceInfo::default(), None)
    }

    pub fn new_with_flags(css: &str, flags: ParserFlags) -> StyleResolver {
        Self::new_with_options(css, flags, DeviceInfo::default(), None)
    }

    pub fn new_with_debug(css: &str, debug: Option<Arc<DebugLogger>>) -> StyleResolver {
        Self::new_with_options(css, ParserFlags::default(), DeviceInfo::default(), debug)
    }

    pub fn new_with_options(
        css: &str,
        flags: ParserFlags,
        device: DeviceInfo,
        debug: Option<Arc<DebugLogger>>,
    ) -> StyleResolver {
        let mut rules = Vec::new();
        let mut parse_issues = Vec::new();
        let mut order = 0usize;

        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rule_parser = SheetRuleParser { flags };
        for result in StyleSheetParser::new(&mut parser, &mut rule_parser) {
            match result {
                Ok(rule) => {
                    parse_issues.extend(rule.declarations.issues().iter().cloned());
                    for (pattern, specificity, selector_text) in rule.selectors {
                        rules.push(RuleEntry {
                            pattern,
                            specificity,
                            order,
                            declarations: rule.declarations.clone(),
                            selector_text,
                        });
                    }
                    order += 1;
                }
                Err((err, _slice)) => {
                    let at_rule = matches!(
                        err.kind,
                        cssparser::ParseErrorKind::Basic(
                            cssparser::BasicParseErrorKind::AtRuleInvalid(_)
                        )
                    );
                    let mut issue = issue_from_parse_error(err);
                    if at_rule {
                        issue.severity = Severity::Warning;
                    }
                    parse_issues.push(issue);
                }
            }
        }

        let index = RuleIndex::new(&rules);

        if let Some(logger) = debug.as_deref() {
            let json = format!(
                "{{\"type\":\"css.sheet\",\"rules\":{},\"issues\":{}}}",
                rules.len(),
                parse_issues.len()
            );
            logger.log_json(&json);
        }

        StyleResolver {
            rules,
            index,
            device,
            flags,
            debug,
            parse_issues,
        }
    }

    pub fn parse_issues(&self) -> &[Issue] {
        &self.parse_issues
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Computes the style of `element` from its matched rules, the optional
    /// inline declaration block, and the parent's computed style. Issues
    /// land in `ctx`; resolution itself never fails.
    pub fn compute_style<D, S>(
        &self,
        dom: &D,
        state: &S,
        element: D::Handle,
        parent: &ComputedStyle,
        inline_style: Option<&str>,
        ctx: &mut ResolutionContext<D::Handle>,
    ) -> ComputedStyle
    where
        D: DomAdapter,
        S: StateProvider<D::Handle>,
    {
        let context = MatchContext::new(dom, state);
        let mut matched: Vec<&RuleEntry> = self
            .index
            .candidate_indices(dom, element)
            .into_iter()
            .filter_map(|idx| self.rules.get(idx))
            .filter(|rule| context.matches_pattern(&rule.pattern, element))
            .collect();
        matched.sort_by(|a, b| {
            a.specificity
                .cmp(&b.specificity)
                .then_with(|| a.order.cmp(&b.order))
        });

        if let Some(logger) = self.debug.as_deref() {
            if !matched.is_empty() {
                let selectors: Vec<String> =
                    matched.iter().map(|r| r.selector_text.clone()).collect();
                let json = format!(
                    "{{\"type\":\"css.match\",\"node\":{},\"selectors\":{}}}",
                    json_string(&format!("{element:?}")),
                    json_array(&selectors)
                );
                logger.log_json(&json);
            }
        }

        let mut cascaded = StyleDeclaration::new();
        for rule in &matched {
            cascaded.add_style(&rule.declarations);
        }
        if let Some(inline) = inline_style {
            let mut style = StyleDeclaration::with_flags(self.flags);
            style.set_css_text(inline);
            for issue in style.take_issues() {
                self.report(ctx, element, issue);
            }
            cascaded.add_style(&style);
        }

        let mut resolution = Resolution::new(self, dom, element, parent);
        resolution.run(&cascaded);
        let (computed, issues) = resolution.finish();
        for issue in issues {
            self.report(ctx, element, issue);
        }
        computed
    }

    /// Computed style of the `pseudo` box of `element`; `"before"`,
    /// `":before"` and `"::before"` all name the same box. Only rules whose
    /// subject names that pseudo-element take part, and `parent` is the
    /// originating element's computed style, which the box inherits from.
    /// `None` means no rule addresses the box.
    pub fn compute_pseudo_style<D, S>(
        &self,
        dom: &D,
        state: &S,
        element: D::Handle,
        parent: &ComputedStyle,
        pseudo: &str,
        ctx: &mut ResolutionContext<D::Handle>,
    ) -> Option<ComputedStyle>
    where
        D: DomAdapter,
        S: StateProvider<D::Handle>,
    {
        let target = pseudo.trim_start_matches(':');
        let context = MatchContext::new(dom, state);
        let mut matched: Vec<&RuleEntry> = self
            .index
            .candidate_indices(dom, element)
            .into_iter()
            .filter_map(|idx| self.rules.get(idx))
            .filter(|rule| {
                context.matches_pattern_with_pseudo(&rule.pattern, element, Some(target))
            })
            .collect();
        if matched.is_empty() {
            return None;
        }
        matched.sort_by(|a, b| {
            a.specificity
                .cmp(&b.specificity)
                .then_with(|| a.order.cmp(&b.order))
        });

        let mut cascaded = StyleDeclaration::new();
        for rule in &matched {
            cascaded.add_style(&rule.declarations);
        }
        let mut resolution = Resolution::new(self, dom, element, parent);
        resolution.run(&cascaded);
        let (computed, issues) = resolution.finish();
        for issue in issues {
            self.report(ctx, element, issue);
        }
        Some(computed)
    }

    fn report<H: Copy + Eq + Hash + std::fmt::Debug>(
        &self,
        ctx: &mut ResolutionContext<H>,
        element: H,
        issue: Issue,
    ) {
        if let Some(logger) = self.debug.as_deref() {
            logger.log_issue(&format!("{element:?}"), &issue);
        }
        ctx.record(element, issue);
    }
}

/// One element's resolution pass. Holds the style being built plus the
/// environment every unit/substitution step reads.
struct Resolution<'a, D: DomAdapter> {
    resolver: &'a StyleResolver,
    dom: &'a D,
    element: D::Handle,
    parent: &'a ComputedStyle,
    properties: HashMap<String, PropertyValue>,
    custom: HashMap<String, PropertyValue>,
    font_size: Pt,
    line_height: Pt,
    line_height_normal: bool,
    root_font_size: Pt,
    root_line_height: Pt,
    vertical: bool,
    is_root: bool,
    issues: Vec<Issue>,
}

enum CalcValue {
    Number(f32),
    Length(f32),
    Percent(f32),
    Mixed { abs: f32, percent: f32 },
}

impl<'a, D: DomAdapter> Resolution<'a, D> {
    fn new(
        resolver: &'a StyleResolver,
        dom: &'a D,
        element: D::Handle,
        parent: &'a ComputedStyle,
    ) -> Self {
        let properties = parent
            .properties
            .iter()
            .filter(|(name, _)| is_inherited(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Resolution {
            resolver,
            dom,
            element,
            parent,
            properties,
            custom: parent.custom.clone(),
            font_size: parent.font_size,
            line_height: parent.line_height,
            line_height_normal: parent.line_height_normal,
            root_font_size: parent.root_font_size,
            root_line_height: parent.root_line_height,
            vertical: parent.vertical_writing,
            is_root: dom.is_root(element),
            issues: Vec::new(),
        }
    }

    fn finish(self) -> (ComputedStyle, Vec<Issue>) {
        (
            ComputedStyle {
                properties: self.properties,
                custom: self.custom,
                font_size: self.font_size,
                line_height: self.line_height,
                line_height_normal: self.line_height_normal,
                root_font_size: self.root_font_size,
                root_line_height: self.root_line_height,
                vertical_writing: self.vertical,
            },
            self.issues,
        )
    }

    fn run(&mut self, cascaded: &StyleDeclaration) {
        // Custom properties first; everything else may reference them.
        for decl in standard_entries(cascaded) {
            if !decl.name.starts_with("--") {
                continue;
            }
            match &decl.value {
                PropertyValue::Initial => {
                    self.custom.remove(&decl.name);
                }
                PropertyValue::Inherit | PropertyValue::Unset | PropertyValue::Revert => {
                    match self.parent.custom.get(&decl.name) {
                        Some(value) => {
                            self.custom.insert(decl.name.clone(), value.clone());
                        }
                        None => {
                            self.custom.remove(&decl.name);
                        }
                    }
                }
                value => {
                    self.custom.insert(decl.name.clone(), value.clone());
                }
            }
        }

        if let Some(value) = self.declared_value(cascaded, "writing-mode") {
            match &value {
                PropertyValue::Initial => {
                    self.vertical = false;
                    self.properties.remove("writing-mode");
                }
                PropertyValue::Inherit | PropertyValue::Unset | PropertyValue::Revert => {
                    self.vertical = self.parent.vertical_writing;
                }
                other => {
                    if let Some(mode) = other.as_ident() {
                        self.vertical =
                            mode.starts_with("vertical") || mode.starts_with("sideways");
                        self.properties.insert("writing-mode".to_string(), other.clone());
                    }
                }
            }
        }

        if let Some(family) = self.declared_value(cascaded, "font-family") {
            match &family {
                PropertyValue::Initial => {
                    self.properties.remove("font-family");
                }
                PropertyValue::Inherit | PropertyValue::Unset | PropertyValue::Revert => {}
                _ => {
                    self.properties.insert("font-family".to_string(), family.clone());
                }
            }
        }
        let monospace = self
            .properties
            .get("font-family")
            .and_then(|value| value.layers().first().and_then(|v| v.as_ident()))
            .is_some_and(|first| first.eq_ignore_ascii_case("monospace"));

        if let Some(value) = self.declared_value(cascaded, "font-size") {
            self.resolve_font_size(&value, monospace);
        }
        if self.is_root {
            self.root_font_size = self.font_size;
        }
        if let Some(value) = self.declared_value(cascaded, "line-height") {
            self.resolve_line_height(&value);
        } else if self.line_height_normal {
            self.line_height = self.font_size.mul_ratio(6, 5);
        }
        if self.is_root {
            self.root_line_height = self.line_height;
        }

        for decl in standard_entries(cascaded) {
            let name = decl.name.as_str();
            if name.starts_with("--")
                || name.starts_with('*')
                || matches!(
                    name,
                    "font-size" | "line-height" | "writing-mode" | "font-family"
                )
            {
                continue;
            }
            if let Some(value) = self.resolve_property(name, &decl.value) {
                self.properties.insert(name.to_string(), value);
            }
        }
    }

    /// Declared standard-channel value for `name` with `var()` already
    /// substituted, or `None` when absent or unresolvable.
    fn declared_value(&mut self, cascaded: &StyleDeclaration, name: &str) -> Option<PropertyValue> {
        let decl = cascaded
            .entries()
            .iter()
            .find(|d| d.name == name && d.channel() == Channel::Standard)?;
        if decl.value.contains_var() {
            let mut visited = Vec::new();
            self.substitute(name, &decl.value, &mut visited).ok()
        } else {
            Some(decl.value.clone())
        }
    }

    fn resolve_font_size(&mut self, value: &PropertyValue, monospace: bool) {
        let parent_font = self.parent.font_size;
        let base = if monospace {
            self.resolver.device.monospace_size
        } else {
            self.resolver.device.font_size
        };
        let resolved = match value {
            PropertyValue::Inherit => Some(parent_font),
            PropertyValue::Unset | PropertyValue::Revert => Some(parent_font),
            PropertyValue::Initial => Some(base),
            PropertyValue::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
                "xx-small" => Some(base.mul_ratio(3, 5)),
                "x-small" => Some(base.mul_ratio(3, 4)),
                "small" => Some(base.mul_ratio(8, 9)),
                "medium" => Some(base),
                "large" => Some(base.mul_ratio(6, 5)),
                "x-large" => Some(base.mul_ratio(3, 2)),
                "xx-large" => Some(base * 2),
                "smaller" => Some(parent_font.mul_ratio(5, 6)),
                "larger" => Some(parent_font.mul_ratio(6, 5)),
                _ => None,
            },
            PropertyValue::Number { value: v, unit } => match unit.category() {
                UnitCategory::Percentage => Some(parent_font * (*v / 100.0)),
                UnitCategory::AbsoluteLength => convert_unit(*v, *unit, CssUnit::Pt)
                    .ok()
                    .map(Pt::from_f32),
                UnitCategory::FontRelative | UnitCategory::ViewportRelative => self
                    .length_to_pt(*v, *unit, parent_font, self.parent.line_height)
                    .map(Pt::from_f32),
                _ => None,
            },
            PropertyValue::Function { name, args } if name.eq_ignore_ascii_case("calc") => {
                match self.eval_calc("font-size", args, parent_font, self.parent.line_height) {
                    Ok(CalcValue::Length(pt)) => Some(Pt::from_f32(pt)),
                    Ok(CalcValue::Percent(p)) => Some(parent_font * (p / 100.0)),
                    Ok(CalcValue::Mixed { abs, percent }) => {
                        Some(Pt::from_f32(abs) + parent_font * (percent / 100.0))
                    }
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(font_size) = resolved {
            self.font_size = font_size;
            self.properties.insert(
                "font-size".to_string(),
                PropertyValue::dimension(font_size.to_f32(), CssUnit::Pt),
            );
        }
    }

    fn resolve_line_height(&mut self, value: &PropertyValue) {
        let font = self.font_size;
        match value {
            PropertyValue::Inherit | PropertyValue::Unset | PropertyValue::Revert => {
                self.line_height_normal = self.parent.line_height_normal;
                self.line_height = if self.line_height_normal {
                    font.mul_ratio(6, 5)
                } else {
                    self.parent.line_height
                };
            }
            PropertyValue::Initial => {
                self.line_height_normal = true;
                self.line_height = font.mul_ratio(6, 5);
            }
            PropertyValue::Ident(keyword) if keyword.eq_ignore_ascii_case("normal") => {
                self.line_height_normal = true;
                self.line_height = font.mul_ratio(6, 5);
                self.properties
                    .insert("line-height".to_string(), PropertyValue::ident("normal"));
            }
            PropertyValue::Number { value: v, unit } => {
                let resolved = match unit.category() {
                    UnitCategory::Number => Some(font * *v),
                    UnitCategory::Percentage => Some(font * (*v / 100.0)),
                    UnitCategory::AbsoluteLength => convert_unit(*v, *unit, CssUnit::Pt)
                        .ok()
                        .map(Pt::from_f32),
                    UnitCategory::FontRelative | UnitCategory::ViewportRelative => self
                        .length_to_pt(*v, *unit, font, self.parent.line_height)
                        .map(Pt::from_f32),
                    _ => None,
                };
                if let Some(line_height) = resolved {
                    self.line_height_normal = false;
                    self.line_height = line_height;
                    self.properties.insert(
                        "line-height".to_string(),
                        PropertyValue::dimension(line_height.to_f32(), CssUnit::Pt),
                    );
                }
            }
            _ => {}
        }
    }

    fn resolve_property(&mut self, name: &str, value: &PropertyValue) -> Option<PropertyValue> {
        match value {
            PropertyValue::Inherit => {
                return self
                    .parent
                    .properties
                    .get(name)
                    .cloned()
                    .or_else(|| initial_value(name));
            }
            PropertyValue::Initial => return initial_value(name),
            PropertyValue::Unset | PropertyValue::Revert => {
                return if is_inherited(name) {
                    self.parent
                        .properties
                        .get(name)
                        .cloned()
                        .or_else(|| initial_value(name))
                } else {
                    initial_value(name)
                };
            }
            _ => {}
        }
        let substituted = if value.contains_var() {
            let mut visited = Vec::new();
            match self.substitute(name, value, &mut visited) {
                Ok(v) => v,
                Err(()) => return None,
            }
        } else {
            value.clone()
        };
        self.resolve_components(name, &substituted).ok()
    }

    /// Substitutes `var()` references through the custom-property chain.
    /// `visited` is the stack of names currently being resolved; hitting one
    /// again is a cycle, which fails over to the reference's fallback.
    fn substitute(
        &mut self,
        property: &str,
        value: &PropertyValue,
        visited: &mut Vec<String>,
    ) -> std::result::Result<PropertyValue, ()> {
        if let Some((name, fallback)) = value.as_var() {
            let name = name.to_string();
            if visited.iter().any(|seen| *seen == name) {
                self.issues.push(Issue::error(
                    property,
                    StyleError::CircularReference {
                        property: name.clone(),
                    },
                ));
                if let Some(logger) = self.resolver.debug.as_deref() {
                    let json = format!(
                        "{{\"type\":\"css.var.cycle\",\"node\":{},\"property\":{},\"custom\":{}}}",
                        json_string(&format!("{:?}", self.element)),
                        json_string(property),
                        json_string(&name)
                    );
                    logger.log_json(&json);
                    logger.increment("css.var.cycle", 1);
                }
                return self.substitute_fallback(property, fallback, visited);
            }
            return match self.custom.get(&name).cloned() {
                Some(raw) => {
                    visited.push(name);
                    let result = self.substitute(property, &raw, visited);
                    visited.pop();
                    match result {
                        Ok(v) => Ok(v),
                        // A reference that failed deeper down still honors
                        // this use site's fallback.
                        Err(()) => self.substitute_fallback(property, fallback, visited),
                    }
                }
                None => self.substitute_fallback(property, fallback, visited),
            };
        }
        match value {
            PropertyValue::Function { name, args } => {
                let mut out = Vec::with_capacity(args.len());
                for arg in args {
                    self.substitute_into(property, arg, &mut out, visited)?;
                }
                Ok(PropertyValue::Function {
                    name: name.clone(),
                    args: out,
                })
            }
            PropertyValue::List { values, separator } => {
                let mut out = Vec::with_capacity(values.len());
                for item in values {
                    self.substitute_into(property, item, &mut out, visited)?;
                }
                Ok(PropertyValue::List {
                    values: out,
                    separator: *separator,
                })
            }
            other => Ok(other.clone()),
        }
    }

    /// Substitution inside a sequence: a `var()` yielding a space list
    /// splices its components in place.
    fn substitute_into(
        &mut self,
        property: &str,
        item: &PropertyValue,
        out: &mut Vec<PropertyValue>,
        visited: &mut Vec<String>,
    ) -> std::result::Result<(), ()> {
        let was_var = item.as_var().is_some();
        let substituted = self.substitute(property, item, visited)?;
        match substituted {
            PropertyValue::List {
                values,
                separator: ListSeparator::Space,
            } if was_var => out.extend(values),
            other => out.push(other),
        }
        Ok(())
    }

    fn substitute_fallback(
        &mut self,
        property: &str,
        fallback: Option<&[PropertyValue]>,
        visited: &mut Vec<String>,
    ) -> std::result::Result<PropertyValue, ()> {
        let Some(parts) = fallback else {
            return Err(());
        };
        if parts.is_empty() {
            return Err(());
        }
        if let Some(logger) = self.resolver.debug.as_deref() {
            let json = format!(
                "{{\"type\":\"css.fallback\",\"node\":{},\"property\":{}}}",
                json_string(&format!("{:?}", self.element)),
                json_string(property)
            );
            logger.log_json(&json);
            logger.increment("css.fallback", 1);
        }
        let collapsed = if parts.len() == 1 {
            parts[0].clone()
        } else {
            PropertyValue::List {
                values: parts.to_vec(),
                separator: ListSeparator::Space,
            }
        };
        self.substitute(property, &collapsed, visited)
    }

    /// Resolves units, `calc()` and `attr()` through the value tree.
    fn resolve_components(
        &mut self,
        property: &str,
        value: &PropertyValue,
    ) -> std::result::Result<PropertyValue, ()> {
        match value {
            PropertyValue::Number { value: v, unit } => match unit.category() {
                UnitCategory::AbsoluteLength if *unit != CssUnit::Pt => {
                    match convert_unit(*v, *unit, CssUnit::Pt) {
                        Ok(pt) => Ok(PropertyValue::dimension(pt, CssUnit::Pt)),
                        Err(_) => Ok(value.clone()),
                    }
                }
                UnitCategory::FontRelative | UnitCategory::ViewportRelative => {
                    match self.length_to_pt(*v, *unit, self.font_size, self.line_height) {
                        Some(pt) => Ok(PropertyValue::dimension(pt, CssUnit::Pt)),
                        None => Ok(value.clone()),
                    }
                }
                _ => Ok(value.clone()),
            },
            PropertyValue::Function { name, args } if name.eq_ignore_ascii_case("calc") => {
                match self.eval_calc(property, args, self.font_size, self.line_height)? {
                    CalcValue::Number(n) => Ok(PropertyValue::number(n)),
                    CalcValue::Length(pt) => Ok(PropertyValue::dimension(pt, CssUnit::Pt)),
                    CalcValue::Percent(p) => {
                        Ok(PropertyValue::dimension(p, CssUnit::Percent))
                    }
                    CalcValue::Mixed { abs, percent } => {
                        let sign = if abs < 0.0 { '-' } else { '+' };
                        Ok(PropertyValue::Function {
                            name: "calc".to_string(),
                            args: vec![
                                PropertyValue::dimension(percent, CssUnit::Percent),
                                PropertyValue::Op(sign),
                                PropertyValue::dimension(abs.abs(), CssUnit::Pt),
                            ],
                        })
                    }
                }
            }
            PropertyValue::Function { name, args } if name.eq_ignore_ascii_case("attr") => {
                self.resolve_attr(property, args)
            }
            PropertyValue::Function { name, args } => {
                let mut out = Vec::with_capacity(args.len());
                for arg in args {
                    out.push(self.resolve_components(property, arg)?);
                }
                Ok(PropertyValue::Function {
                    name: name.clone(),
                    args: out,
                })
            }
            PropertyValue::List { values, separator } => {
                let mut out = Vec::with_capacity(values.len());
                for item in values {
                    out.push(self.resolve_components(property, item)?);
                }
                Ok(PropertyValue::List {
                    values: out,
                    separator: *separator,
                })
            }
            other => Ok(other.clone()),
        }
    }

    /// `attr()` evaluation with the form-control `value` policy: reading a
    /// form field's value attribute is refused with a warning and falls
    /// back, matching the expectation that stylesheets cannot lift user
    /// input into rendered content.
    fn resolve_attr(
        &mut self,
        property: &str,
        args: &[PropertyValue],
    ) -> std::result::Result<PropertyValue, ()> {
        let comma = args
            .iter()
            .position(|a| matches!(a, PropertyValue::Op(',')));
        let (head, fallback) = match comma {
            Some(idx) => (&args[..idx], Some(&args[idx + 1..])),
            None => (args, None),
        };
        let Some(attr_name) = head.first().and_then(PropertyValue::as_ident) else {
            self.issues.push(Issue::error(
                property,
                StyleError::CannotComputeValue {
                    property: property.to_string(),
                    reason: "malformed attr()".to_string(),
                },
            ));
            return Err(());
        };
        let attr_name = attr_name.to_ascii_lowercase();
        let type_ident = head.get(1).and_then(PropertyValue::as_ident);

        if attr_name == "value" && is_form_control(self.dom.tag_name(self.element)) {
            self.issues.push(Issue::warning(
                property,
                StyleError::DisallowedAttribute {
                    attribute: attr_name.clone(),
                },
            ));
            return self.attr_fallback(property, fallback);
        }

        let Some(raw) = self.dom.attr(self.element, &attr_name) else {
            return self.attr_fallback(property, fallback);
        };
        match attr_convert(raw, type_ident) {
            Some(converted) => self.resolve_components(property, &converted),
            None => self.attr_fallback(property, fallback),
        }
    }

    fn attr_fallback(
        &mut self,
        property: &str,
        fallback: Option<&[PropertyValue]>,
    ) -> std::result::Result<PropertyValue, ()> {
        let Some(parts) = fallback else {
            return Err(());
        };
        if parts.is_empty() {
            return Err(());
        }
        let collapsed = if parts.len() == 1 {
            parts[0].clone()
        } else {
            PropertyValue::List {
                values: parts.to_vec(),
                separator: ListSeparator::Space,
            }
        };
        self.resolve_components(property, &collapsed)
    }

    /// Evaluates a flat `calc()` argument list: products first, then the
    /// sum. Percentages mixed with absolute terms survive as a two-term
    /// `calc()`; anything else collapses.
    fn eval_calc(
        &mut self,
        property: &str,
        args: &[PropertyValue],
        font: Pt,
        line: Pt,
    ) -> std::result::Result<CalcValue, ()> {
        enum Item {
            Value(CalcValue),
            Add,
            Sub,
            Mul,
            Div,
        }

        let mut items: Vec<Item> = Vec::new();
        for component in args {
            match component {
                PropertyValue::Op('+') => items.push(Item::Add),
                PropertyValue::Op('-') => items.push(Item::Sub),
                PropertyValue::Op('*') => items.push(Item::Mul),
                PropertyValue::Op('/') => items.push(Item::Div),
                other => items.push(Item::Value(self.calc_term(property, other, font, line)?)),
            }
        }

        // Fold * and / into their left operand.
        let mut reduced: Vec<Item> = Vec::new();
        let mut iter = items.into_iter();
        while let Some(item) = iter.next() {
            let is_div = match item {
                Item::Div => true,
                Item::Mul => false,
                other => {
                    reduced.push(other);
                    continue;
                }
            };
            let left = match reduced.pop() {
                Some(Item::Value(v)) => v,
                _ => return self.calc_error(property, "misplaced operator"),
            };
            let right = match iter.next() {
                Some(Item::Value(v)) => v,
                _ => return self.calc_error(property, "missing operand"),
            };
            let combined = if is_div {
                calc_div(left, right)
            } else {
                calc_mul(left, right)
            };
            match combined {
                Some(v) => reduced.push(Item::Value(v)),
                None => return self.calc_error(property, "invalid multiplication"),
            }
        }

        let mut total: Option<CalcValue> = None;
        let mut pending_sign = 1.0f32;
        for item in reduced {
            match item {
                Item::Add => pending_sign = 1.0,
                Item::Sub => pending_sign = -1.0,
                Item::Value(v) => {
                    let signed = calc_scale(v, pending_sign);
                    total = Some(match total {
                        None => signed,
                        Some(acc) => match calc_add(acc, signed) {
                            Some(sum) => sum,
                            None => return self.calc_error(property, "mixed incompatible units"),
                        },
                    });
                    pending_sign = 1.0;
                }
                Item::Mul | Item::Div => {
                    return self.calc_error(property, "misplaced operator");
                }
            }
        }
        match total {
            Some(v) => Ok(v),
            None => self.calc_error(property, "empty expression"),
        }
    }

    fn calc_term(
        &mut self,
        property: &str,
        component: &PropertyValue,
        font: Pt,
        line: Pt,
    ) -> std::result::Result<CalcValue, ()> {
        match component {
            PropertyValue::Number { value, unit } => match unit.category() {
                UnitCategory::Number => Ok(CalcValue::Number(*value)),
                UnitCategory::Percentage => Ok(CalcValue::Percent(*value)),
                UnitCategory::AbsoluteLength => match convert_unit(*value, *unit, CssUnit::Pt) {
                    Ok(pt) => Ok(CalcValue::Length(pt)),
                    Err(_) => self.calc_error(property, "unconvertible unit"),
                },
                UnitCategory::FontRelative | UnitCategory::ViewportRelative => {
                    match self.length_to_pt(*value, *unit, font, line) {
                        Some(pt) => Ok(CalcValue::Length(pt)),
                        None => self.calc_error(property, "unresolvable unit"),
                    }
                }
                _ => self.calc_error(property, "unsupported unit in calc()"),
            },
            PropertyValue::Function { name, args } if name.eq_ignore_ascii_case("calc") => {
                self.eval_calc(property, args, font, line)
            }
            _ => self.calc_error(property, "unsupported term in calc()"),
        }
    }

    fn calc_error(
        &mut self,
        property: &str,
        reason: &str,
    ) -> std::result::Result<CalcValue, ()> {
        self.issues.push(Issue::error(
            property,
            StyleError::CannotComputeValue {
                property: property.to_string(),
                reason: reason.to_string(),
            },
        ));
        Err(())
    }

    /// Relative length to pt against the given font basis. `vi`/`vb` swap
    /// viewport axes under vertical writing. Font metrics are approximated
    /// from the font size since no font data is loaded here.
    fn length_to_pt(&self, value: f32, unit: CssUnit, font: Pt, line: Pt) -> Option<f32> {
        let viewport = self.resolver.device.viewport;
        let pt = match unit {
            CssUnit::Em => font.to_f32() * value,
            CssUnit::Ex => font.to_f32() * 0.5 * value,
            CssUnit::Ch => font.to_f32() * 0.5 * value,
            CssUnit::Ic => font.to_f32() * value,
            CssUnit::Cap => font.to_f32() * 0.8 * value,
            CssUnit::Lh => line.to_f32() * value,
            CssUnit::Rlh => self.root_line_height.to_f32() * value,
            CssUnit::Rem => self.root_font_size.to_f32() * value,
            CssUnit::Vw => viewport.width.to_f32() * value / 100.0,
            CssUnit::Vh => viewport.height.to_f32() * value / 100.0,
            CssUnit::Vi => {
                let side = if self.vertical {
                    viewport.height
                } else {
                    viewport.width
                };
                side.to_f32() * value / 100.0
            }
            CssUnit::Vb => {
                let side = if self.vertical {
                    viewport.width
                } else {
                    viewport.height
                };
                side.to_f32() * value / 100.0
            }
            CssUnit::Vmin => viewport.min_side().to_f32() * value / 100.0,
            CssUnit::Vmax => viewport.max_side().to_f32() * value / 100.0,
            _ => return None,
        };
        Some(pt)
    }
}

fn standard_entries(cascaded: &StyleDeclaration) -> impl Iterator<Item = &Declaration> {
    cascaded
        .entries()
        .iter()
        .filter(|d| d.channel() == Channel::Standard)
}

fn calc_scale(value: CalcValue, factor: f32) -> CalcValue {
    match value {
        CalcValue::Number(n) => CalcValue::Number(n * factor),
        CalcValue::Length(l) => CalcValue::Length(l * factor),
        CalcValue::Percent(p) => CalcValue::Percent(p * factor),
        CalcValue::Mixed { abs, percent } => CalcValue::Mixed {
            abs: abs * factor,
            percent: percent * factor,
        },
    }
}

fn calc_add(left: CalcValue, right: CalcValue) -> Option<CalcValue> {
    Some(match (left, right) {
        (CalcValue::Number(a), CalcValue::Number(b)) => CalcValue::Number(a + b),
        (CalcValue::Length(a), CalcValue::Length(b)) => CalcValue::Length(a + b),
        (CalcValue::Percent(a), CalcValue::Percent(b)) => CalcValue::Percent(a + b),
        (CalcValue::Length(a), CalcValue::Percent(b))
        | (CalcValue::Percent(b), CalcValue::Length(a)) => CalcValue::Mixed {
            abs: a,
            percent: b,
        },
        (CalcValue::Mixed { abs, percent }, CalcValue::Length(l))
        | (CalcValue::Length(l), CalcValue::Mixed { abs, percent }) => CalcValue::Mixed {
            abs: abs + l,
            percent,
        },
        (CalcValue::Mixed { abs, percent }, CalcValue::Percent(p))
        | (CalcValue::Percent(p), CalcValue::Mixed { abs, percent }) => CalcValue::Mixed {
            abs,
            percent: percent + p,
        },
        (
            CalcValue::Mixed { abs, percent },
            CalcValue::Mixed {
                abs: abs2,
                percent: percent2,
            },
        ) => CalcValue::Mixed {
            abs: abs + abs2,
            percent: percent + percent2,
        },
        _ => return None,
    })
}

fn calc_mul(left: CalcValue, right: CalcValue) -> Option<CalcValue> {
    match (left, right) {
        (CalcValue::Number(a), CalcValue::Number(b)) => Some(CalcValue::Number(a * b)),
        (CalcValue::Number(n), other) | (other, CalcValue::Number(n)) => {
            Some(calc_scale(other, n))
        }
        _ => None,
    }
}

fn calc_div(left: CalcValue, right: CalcValue) -> Option<CalcValue> {
    match right {
        CalcValue::Number(n) if n != 0.0 => Some(calc_scale(left, 1.0 / n)),
        _ => None,
    }
}

fn attr_convert(raw: &str, type_ident: Option<&str>) -> Option<PropertyValue> {
    match type_ident {
        None => Some(PropertyValue::String(raw.to_string())),
        Some(ty) if ty.eq_ignore_ascii_case("string") => {
            Some(PropertyValue::String(raw.to_string()))
        }
        Some(ty) if ty.eq_ignore_ascii_case("url") => Some(PropertyValue::Uri(raw.to_string())),
        Some(ty) if ty.eq_ignore_ascii_case("color") => {
            let trimmed = raw.trim();
            named_color(trimmed)
                .or_else(|| trimmed.strip_prefix('#').and_then(Rgba::from_hex))
                .map(PropertyValue::Color)
        }
        Some(ty) if ty.eq_ignore_ascii_case("number") || ty.eq_ignore_ascii_case("integer") => {
            raw.trim().parse::<f32>().ok().map(PropertyValue::number)
        }
        Some(ty) => {
            let unit = CssUnit::parse(ty)?;
            let value = raw.trim().parse::<f32>().ok()?;
            Some(PropertyValue::dimension(value, unit))
        }
    }
}

fn is_form_control(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "input" | "button" | "select" | "textarea" | "option"
    )
}

pub(crate) fn is_inherited(property: &str) -> bool {
    if property.starts_with("--") {
        return true;
    }
    matches!(
        property,
        "border-collapse"
            | "border-spacing"
            | "caption-side"
            | "color"
            | "cursor"
            | "direction"
            | "empty-cells"
            | "font"
            | "font-family"
            | "font-size"
            | "font-stretch"
            | "font-style"
            | "font-variant"
            | "font-weight"
            | "hyphens"
            | "letter-spacing"
            | "line-height"
            | "list-style"
            | "list-style-image"
            | "list-style-position"
            | "list-style-type"
            | "orphans"
            | "overflow-wrap"
            | "quotes"
            | "tab-size"
            | "text-align"
            | "text-align-last"
            | "text-indent"
            | "text-shadow"
            | "text-transform"
            | "visibility"
            | "white-space"
            | "widows"
            | "word-break"
            | "word-spacing"
            | "word-wrap"
            | "writing-mode"
    )
}

/// Initial value for properties with a known one; `None` means the property
/// is treated as absent when never declared.
pub(crate) fn initial_value(property: &str) -> Option<PropertyValue> {
    let text = match property {
        "margin-top" | "margin-right" | "margin-bottom" | "margin-left" | "padding-top"
        | "padding-right" | "padding-bottom" | "padding-left" | "text-indent"
        | "border-spacing" | "outline-offset" => "0",
        "border-top-width" | "border-right-width" | "border-bottom-width"
        | "border-left-width" | "outline-width" | "column-rule-width" => "medium",
        "border-top-style" | "border-right-style" | "border-bottom-style"
        | "border-left-style" | "outline-style" | "column-rule-style" => "none",
        "border-top-color" | "border-right-color" | "border-bottom-color"
        | "border-left-color" | "outline-color" | "column-rule-color"
        | "text-decoration-color" => "currentcolor",
        "border-top-left-radius" | "border-top-right-radius" | "border-bottom-right-radius"
        | "border-bottom-left-radius" => "0",
        "color" => "#000000",
        "background-color" => "transparent",
        "background-image" | "list-style-image" | "text-shadow" | "box-shadow" | "content"
        | "float" | "clear" | "text-transform" | "text-decoration-line"
        | "animation-name" => "none",
        "background-position" => "0% 0%",
        "background-repeat" => "repeat",
        "background-attachment" => "scroll",
        "font-size" => "medium",
        "font-weight" | "font-style" | "font-variant" | "font-stretch" | "line-height"
        | "letter-spacing" | "word-spacing" | "column-gap" | "row-gap" | "white-space" => {
            "normal"
        }
        "display" => "inline",
        "position" => "static",
        "width" | "height" | "min-width" | "min-height" | "max-width" | "max-height" | "top"
        | "right" | "bottom" | "left" | "z-index" | "flex-basis" | "cursor" | "grid-area"
        | "grid-template-columns" | "grid-template-rows" => "auto",
        "opacity" => "1",
        "overflow-x" | "overflow-y" | "visibility" => "visible",
        "text-align" => "start",
        "text-decoration-style" => "solid",
        "vertical-align" => "baseline",
        "direction" => "ltr",
        "writing-mode" => "horizontal-tb",
        "list-style-type" => "disc",
        "list-style-position" => "outside",
        "flex-direction" => "row",
        "flex-wrap" => "nowrap",
        "flex-grow" => "0",
        "flex-shrink" => "1",
        "transition-property" => "all",
        "transition-duration" | "transition-delay" | "animation-duration"
        | "animation-delay" => "0s",
        "transition-timing-function" | "animation-timing-function" => "ease",
        "animation-iteration-count" => "1",
        "animation-direction" => "normal",
        "animation-fill-mode" => "none",
        "animation-play-state" => "running",
        "border-collapse" => "separate",
        "caption-side" => "top",
        "empty-cells" => "show",
        "word-break" => "normal",
        _ => return None,
    };
    PropertyValue::parse_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NoState;
    use crate::dom::fixture::{NodeId, TestDom};
    use crate::error::{CascataError, Severity, StyleError};

    struct Env {
        dom: TestDom,
        root: NodeId,
    }

    impl Env {
        fn new() -> Env {
            let mut dom = TestDom::new();
            let root = dom.element(None, "html");
            Env { dom, root }
        }

        fn child(&mut self, parent: NodeId, tag: &str) -> NodeId {
            self.dom.element(Some(parent), tag)
        }
    }

    fn compute(
        resolver: &StyleResolver,
        env: &Env,
        element: NodeId,
        parent: &ComputedStyle,
        ctx: &mut ResolutionContext<NodeId>,
    ) -> ComputedStyle {
        resolver.compute_style(&env.dom, &NoState, element, parent, None, ctx)
    }

    #[test]
    fn rem_resolves_against_default_root() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let span = env.child(env.root, "span");
        let resolver =
            StyleResolver::new("p { font-size: 2rem; } span { margin-left: 1rem; }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let root_style = compute(&resolver, &env, env.root, &initial, &mut ctx);
        assert_eq!(root_style.font_size().to_milli_i64(), 12_000);

        let p_style = compute(&resolver, &env, p, &root_style, &mut ctx);
        assert_eq!(p_style.font_size().to_milli_i64(), 24_000);
        assert_eq!(p_style.get_property_value("font-size"), "24pt");

        let span_style = compute(&resolver, &env, span, &root_style, &mut ctx);
        assert_eq!(span_style.get_property_value("margin-left"), "12pt");
        assert!(ctx.issues_for(p).is_empty());
    }

    #[test]
    fn em_resolves_against_own_font_size() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver =
            StyleResolver::new("html { font-size: 10pt } p { font-size: 2em; margin: 1em }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let root_style = compute(&resolver, &env, env.root, &initial, &mut ctx);
        assert_eq!(root_style.font_size().to_milli_i64(), 10_000);

        let p_style = compute(&resolver, &env, p, &root_style, &mut ctx);
        assert_eq!(p_style.font_size().to_milli_i64(), 20_000);
        assert_eq!(p_style.get_property_value("margin-top"), "20pt");
    }

    #[test]
    fn var_cycle_falls_back_to_initial_and_records_error() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { margin-left: var(--foo); --foo: var(--foo); }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("margin-left"), "0");

        let issues = ctx.issues_for(p);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert!(matches!(
            issues[0].error,
            CascataError::Style(StyleError::CircularReference { .. })
        ));
    }

    #[test]
    fn var_cycle_uses_fallback_but_still_records() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver =
            StyleResolver::new("p { margin-left: var(--foo, 9pt); --foo: var(--foo); }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("margin-left"), "9pt");
        assert_eq!(ctx.issues_for(p).len(), 1);
        assert!(ctx.has_errors());
    }

    #[test]
    fn var_substitutes_through_inheritance_chain() {
        let mut env = Env::new();
        let section = env.child(env.root, "section");
        let p = env.child(section, "p");
        let resolver =
            StyleResolver::new("html { --gap: 4pt } p { margin-left: var(--gap) }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let root_style = compute(&resolver, &env, env.root, &initial, &mut ctx);
        let section_style = compute(&resolver, &env, section, &root_style, &mut ctx);
        let p_style = compute(&resolver, &env, p, &section_style, &mut ctx);
        assert_eq!(p_style.get_property_value("margin-left"), "4pt");
        assert_eq!(
            p_style.custom_property("--gap"),
            Some(&PropertyValue::dimension(4.0, CssUnit::Pt))
        );
    }

    #[test]
    fn cascade_orders_by_specificity_then_source() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        env.dom.add_class(p, "note");
        env.dom.set_id(p, "x");
        let resolver = StyleResolver::new(
            "p { color: red } p.note { color: blue } #x { color: green } p { color: purple }",
        );
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("color"), "green");
    }

    #[test]
    fn important_beats_later_specific_normal() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        env.dom.add_class(p, "note");
        let resolver =
            StyleResolver::new("p { color: red !important } p.note { color: blue }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("color"), "red");
    }

    #[test]
    fn inline_style_sits_between_normal_and_important() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { color: red; margin-left: 3pt !important }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = resolver.compute_style(
            &env.dom,
            &NoState,
            p,
            &initial,
            Some("color: blue; margin-left: 8pt"),
            &mut ctx,
        );
        assert_eq!(style.get_property_value("color"), "blue");
        assert_eq!(style.get_property_value("margin-left"), "3pt");

        let style = resolver.compute_style(
            &env.dom,
            &NoState,
            p,
            &initial,
            Some("margin-left: 8pt !important"),
            &mut ctx,
        );
        assert_eq!(style.get_property_value("margin-left"), "8pt");
    }

    #[test]
    fn inherited_properties_flow_down() {
        let mut env = Env::new();
        let div = env.child(env.root, "div");
        let p = env.child(div, "p");
        let resolver = StyleResolver::new("div { color: teal; margin-left: 5pt }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let div_style = compute(&resolver, &env, div, &initial, &mut ctx);
        let p_style = compute(&resolver, &env, p, &div_style, &mut ctx);
        assert_eq!(p_style.get_property_value("color"), "teal");
        // margin is not inherited; the child reports its initial value.
        assert_eq!(p_style.get_property_value("margin-left"), "0");
    }

    #[test]
    fn explicit_inherit_copies_non_inherited_property() {
        let mut env = Env::new();
        let div = env.child(env.root, "div");
        let p = env.child(div, "p");
        let resolver =
            StyleResolver::new("div { margin-left: 5pt } p { margin-left: inherit }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let div_style = compute(&resolver, &env, div, &initial, &mut ctx);
        let p_style = compute(&resolver, &env, p, &div_style, &mut ctx);
        assert_eq!(p_style.get_property_value("margin-left"), "5pt");
    }

    #[test]
    fn unset_follows_inheritance_flag() {
        let mut env = Env::new();
        let div = env.child(env.root, "div");
        let p = env.child(div, "p");
        let resolver = StyleResolver::new(
            "div { color: teal; margin-left: 5pt } p { color: unset; margin-left: unset }",
        );
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let div_style = compute(&resolver, &env, div, &initial, &mut ctx);
        let p_style = compute(&resolver, &env, p, &div_style, &mut ctx);
        assert_eq!(p_style.get_property_value("color"), "teal");
        assert_eq!(p_style.get_property_value("margin-left"), "0");
    }

    #[test]
    fn absolute_calc_collapses() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { width: calc(10pt + 2pt * 3) }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("width"), "16pt");
    }

    #[test]
    fn mixed_percentage_calc_is_preserved() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { width: calc(10% - 36pt - 12pt) }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("width"), "calc(10% - 48pt)");
    }

    #[test]
    fn font_size_calc_resolves_percent_against_parent() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { font-size: calc(50% + 3pt) }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.font_size().to_milli_i64(), 9_000);
    }

    #[test]
    fn viewport_units_use_device_and_writing_mode() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let q = env.child(env.root, "q");
        let resolver = StyleResolver::new(
            "p { margin-top: 10vw; margin-bottom: 10vi } \
             q { writing-mode: vertical-rl; margin-bottom: 10vi }",
        );
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let p_style = compute(&resolver, &env, p, &initial, &mut ctx);
        // 800px viewport width is 600pt.
        assert_eq!(p_style.get_property_value("margin-top"), "60pt");
        assert_eq!(p_style.get_property_value("margin-bottom"), "60pt");

        let q_style = compute(&resolver, &env, q, &initial, &mut ctx);
        // 600px viewport height is 450pt.
        assert_eq!(q_style.get_property_value("margin-bottom"), "45pt");
    }

    #[test]
    fn font_size_keywords_scale_the_medium_default() {
        let mut env = Env::new();
        let small = env.child(env.root, "p");
        let larger = env.child(env.root, "q");
        let resolver = StyleResolver::new("p { font-size: small } q { font-size: larger }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let small_style = compute(&resolver, &env, small, &initial, &mut ctx);
        assert_eq!(small_style.font_size().to_milli_i64(), 10_667);

        let larger_style = compute(&resolver, &env, larger, &initial, &mut ctx);
        assert_eq!(larger_style.font_size().to_milli_i64(), 14_400);
    }

    #[test]
    fn monospace_family_uses_monospace_default() {
        let mut env = Env::new();
        let code = env.child(env.root, "code");
        let resolver =
            StyleResolver::new("code { font-family: monospace; font-size: medium }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, code, &initial, &mut ctx);
        assert_eq!(style.font_size().to_milli_i64(), 10_000);
    }

    #[test]
    fn attr_reads_with_type_and_fallback() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        env.dom.set_attr(p, "data-label", "hi");
        let resolver = StyleResolver::new(
            "p { content: attr(data-label); width: attr(data-w px, 5px) }",
        );
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("content"), "\"hi\"");
        assert_eq!(style.get_property_value("width"), "3.75pt");
    }

    #[test]
    fn attr_value_on_form_control_warns_and_falls_back() {
        let mut env = Env::new();
        let input = env.child(env.root, "input");
        env.dom.set_attr(input, "value", "secret");
        let resolver = StyleResolver::new("input { content: attr(value, \"redacted\") }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, input, &initial, &mut ctx);
        assert_eq!(style.get_property_value("content"), "\"redacted\"");

        let issues = ctx.issues_for(input);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(matches!(
            issues[0].error,
            CascataError::Style(StyleError::DisallowedAttribute { .. })
        ));
    }

    #[test]
    fn computed_shorthand_reconstructs_from_longhands() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { margin: 4pt 8pt }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("margin"), "4pt 8pt");
        assert_eq!(style.get_property_value("margin-right"), "8pt");
    }

    #[test]
    fn at_rules_are_skipped_with_warning() {
        let mut env = Env::new();
        let div = env.child(env.root, "div");
        let resolver = StyleResolver::new(
            "@media screen { q { color: blue } } div { color: navy }",
        );
        assert_eq!(resolver.rule_count(), 1);
        assert_eq!(resolver.parse_issues().len(), 1);
        assert_eq!(resolver.parse_issues()[0].severity, Severity::Warning);

        let mut ctx = ResolutionContext::new();
        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, div, &initial, &mut ctx);
        assert_eq!(style.get_property_value("color"), "navy");
    }

    #[test]
    fn malformed_rule_recovers_at_boundary() {
        let mut env = Env::new();
        let div = env.child(env.root, "div");
        let resolver = StyleResolver::new("p { color: } div { color: navy }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, div, &initial, &mut ctx);
        assert_eq!(style.get_property_value("color"), "navy");
        assert!(!resolver.parse_issues().is_empty());
    }

    #[test]
    fn legacy_priority_channel_is_ignored_by_computation() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let flags = ParserFlags {
            ie_prio_char: true,
            ..ParserFlags::default()
        };
        let resolver = StyleResolver::new_with_flags(
            "p { margin-left: 10px; margin-left: 8px !important! }",
            flags,
        );
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        // 10px is 7.5pt; the legacy-channel 8px never reaches computation.
        assert_eq!(style.get_property_value("margin-left"), "7.5pt");
    }

    #[test]
    fn pseudo_element_rules_do_not_reach_the_element() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p::before { color: red } p { margin-top: 2pt }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert!(style.property("color").is_none());
        assert_eq!(style.get_property_value("color"), "#000000");
        assert_eq!(style.get_property_value("margin-top"), "2pt");
    }

    #[test]
    fn before_box_computes_against_its_element() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new(
            "p { color: blue; font-size: 20pt } \
             p::before { font-size: 2em; margin-top: 1pt }",
        );
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let base = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(base.font_size().to_milli_i64(), 20_000);
        assert_eq!(base.get_property_value("margin-top"), "0");

        let before = resolver
            .compute_pseudo_style(&env.dom, &NoState, p, &base, "::before", &mut ctx)
            .expect("before box has rules");
        assert_eq!(before.get_property_value("font-size"), "40pt");
        assert_eq!(before.get_property_value("margin-top"), "1pt");
        // The box inherits from its originating element.
        assert_eq!(before.get_property_value("color"), "blue");

        let after =
            resolver.compute_pseudo_style(&env.dom, &NoState, p, &base, "after", &mut ctx);
        assert!(after.is_none());
    }

    #[test]
    fn match_event_keeps_functional_commas_in_selector_text() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        env.dom.add_class(p, "alpha");
        let path = std::env::temp_dir().join(format!(
            "cascata-match-commas-{}.jsonl",
            std::process::id()
        ));
        let logger = Arc::new(DebugLogger::new(&path).expect("log file should open"));
        let resolver = StyleResolver::new_with_debug(
            "p:is(.alpha, .beta), q { color: red }",
            Some(logger.clone()),
        );
        assert_eq!(resolver.rule_count(), 2);

        let mut ctx = ResolutionContext::new();
        let initial = ComputedStyle::initial(resolver.device());
        let style = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(style.get_property_value("color"), "red");

        logger.flush();
        let log = std::fs::read_to_string(&path).expect("log should be readable");
        let _ = std::fs::remove_file(&path);
        assert!(log.contains("\"p:is(.alpha, .beta)\""), "unexpected log: {log}");
    }

    #[test]
    fn context_reset_clears_issues() {
        let mut env = Env::new();
        let p = env.child(env.root, "p");
        let resolver = StyleResolver::new("p { margin-left: var(--foo); --foo: var(--foo); }");
        let mut ctx = ResolutionContext::new();

        let initial = ComputedStyle::initial(resolver.device());
        let _ = compute(&resolver, &env, p, &initial, &mut ctx);
        assert_eq!(ctx.total(), 1);
        ctx.reset();
        assert_eq!(ctx.total(), 0);
        assert!(ctx.issues_for(p).is_empty());
    }
}

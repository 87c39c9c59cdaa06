use crate::value::{CssUnit, ListSeparator, PropertyValue, SerializeOptions, named_color};

/// Result of reconstructing a shorthand from longhands. `trailing` indexes
/// longhands the shorthand text does not represent; they serialize after it.
pub(crate) struct BuiltShorthand {
    pub value: String,
    pub trailing: Vec<usize>,
}

/// Per-family expansion and reconstruction. `expand` never sees global
/// keywords; the declaration layer distributes those to every longhand
/// before dispatching here.
pub(crate) trait ShorthandBuilder: Sync {
    fn name(&self) -> &'static str;

    fn longhands(&self) -> &'static [&'static str];

    /// Longhand (name, value) pairs implied by the shorthand value, with the
    /// family's reset value filled in for components not given. None means
    /// the value does not fit the shorthand grammar.
    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>>;

    /// Shorthand value text for the current longhand values, aligned with
    /// `longhands()`. A `None` slot is excluded from the text and must come
    /// back in `trailing`. Returning None falls back to longhand-by-longhand
    /// serialization.
    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand>;
}

pub(crate) fn registry() -> &'static [&'static dyn ShorthandBuilder] {
    static BUILDERS: [&dyn ShorthandBuilder; 28] = [
        &MARGIN,
        &PADDING,
        &BORDER,
        &BORDER_WIDTH,
        &BORDER_STYLE,
        &BORDER_COLOR,
        &BORDER_TOP,
        &BORDER_RIGHT,
        &BORDER_BOTTOM,
        &BORDER_LEFT,
        &BORDER_RADIUS,
        &OUTLINE,
        &COLUMN_RULE,
        &FONT,
        &BACKGROUND,
        &LIST_STYLE,
        &TEXT_DECORATION,
        &FLEX,
        &FLEX_FLOW,
        &GAP,
        &GRID,
        &TRANSITION,
        &ANIMATION,
        &COLUMNS,
        &PLACE_CONTENT,
        &PLACE_ITEMS,
        &PLACE_SELF,
        &OVERFLOW,
    ];
    &BUILDERS
}

pub(crate) fn builder_for(name: &str) -> Option<&'static dyn ShorthandBuilder> {
    let lower = name.to_ascii_lowercase();
    registry().iter().copied().find(|b| b.name() == lower)
}

pub(crate) fn is_shorthand(name: &str) -> bool {
    builder_for(name).is_some()
}

/// Families containing the longhand, largest first per registry order.
pub(crate) fn families_of(longhand: &str) -> Vec<&'static dyn ShorthandBuilder> {
    let lower = longhand.to_ascii_lowercase();
    registry()
        .iter()
        .copied()
        .filter(|b| b.longhands().contains(&lower.as_str()))
        .collect()
}

fn text(value: &PropertyValue, minified: bool, options: &SerializeOptions) -> String {
    if minified {
        value.to_minified_css_text()
    } else {
        value.to_css_text_with(options)
    }
}

fn ident_matches(value: &PropertyValue, options: &[&str]) -> bool {
    value
        .as_ident()
        .map(|name| {
            options
                .iter()
                .any(|option| name.eq_ignore_ascii_case(option))
        })
        .unwrap_or(false)
}

fn is_length_or_percent(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Number { value: num, unit } => {
            unit.is_length() || *unit == CssUnit::Percent || (*unit == CssUnit::None && *num == 0.0)
        }
        PropertyValue::Function { name, .. } => {
            name.eq_ignore_ascii_case("calc") || name.eq_ignore_ascii_case("var")
        }
        _ => false,
    }
}

fn is_time(value: &PropertyValue) -> bool {
    matches!(
        value,
        PropertyValue::Number {
            unit: CssUnit::S | CssUnit::Ms,
            ..
        }
    )
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

fn is_border_style(value: &PropertyValue) -> bool {
    ident_matches(value, BORDER_STYLES)
}

fn is_border_width(value: &PropertyValue) -> bool {
    is_length_or_percent(value) || ident_matches(value, &["thin", "medium", "thick"])
}

fn is_color(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Color(_) => true,
        PropertyValue::Ident(name) => {
            named_color(name).is_some() || name.eq_ignore_ascii_case("currentcolor")
        }
        PropertyValue::Function { name, .. } => matches!(
            name.to_ascii_lowercase().as_str(),
            "rgb" | "rgba" | "hsl" | "hsla"
        ),
        _ => false,
    }
}

fn is_timing_function(value: &PropertyValue) -> bool {
    ident_matches(
        value,
        &[
            "ease",
            "linear",
            "ease-in",
            "ease-out",
            "ease-in-out",
            "step-start",
            "step-end",
        ],
    ) || matches!(
        value,
        PropertyValue::Function { name, .. }
            if name.eq_ignore_ascii_case("cubic-bezier") || name.eq_ignore_ascii_case("steps")
    )
}

// ---------------------------------------------------------------------------
// Box families: four sides, 1-4 value syntax, standard collapse on output.
// ---------------------------------------------------------------------------

struct BoxFamily {
    name: &'static str,
    longhands: &'static [&'static str; 4],
    reset: &'static str,
    accepts: fn(&PropertyValue) -> bool,
}

fn accepts_margin(value: &PropertyValue) -> bool {
    is_length_or_percent(value) || ident_matches(value, &["auto"])
}

static MARGIN: BoxFamily = BoxFamily {
    name: "margin",
    longhands: &["margin-top", "margin-right", "margin-bottom", "margin-left"],
    reset: "0",
    accepts: accepts_margin,
};

static PADDING: BoxFamily = BoxFamily {
    name: "padding",
    longhands: &[
        "padding-top",
        "padding-right",
        "padding-bottom",
        "padding-left",
    ],
    reset: "0",
    accepts: is_length_or_percent,
};

static BORDER_WIDTH: BoxFamily = BoxFamily {
    name: "border-width",
    longhands: &[
        "border-top-width",
        "border-right-width",
        "border-bottom-width",
        "border-left-width",
    ],
    reset: "medium",
    accepts: is_border_width,
};

static BORDER_STYLE: BoxFamily = BoxFamily {
    name: "border-style",
    longhands: &[
        "border-top-style",
        "border-right-style",
        "border-bottom-style",
        "border-left-style",
    ],
    reset: "none",
    accepts: is_border_style,
};

static BORDER_COLOR: BoxFamily = BoxFamily {
    name: "border-color",
    longhands: &[
        "border-top-color",
        "border-right-color",
        "border-bottom-color",
        "border-left-color",
    ],
    reset: "currentcolor",
    accepts: is_color,
};

/// Distributes 1-4 box components to (top, right, bottom, left).
fn spread_box(components: &[&PropertyValue]) -> Option<[PropertyValue; 4]> {
    match components {
        [all] => Some([(*all).clone(), (*all).clone(), (*all).clone(), (*all).clone()]),
        [vertical, horizontal] => Some([
            (*vertical).clone(),
            (*horizontal).clone(),
            (*vertical).clone(),
            (*horizontal).clone(),
        ]),
        [top, horizontal, bottom] => Some([
            (*top).clone(),
            (*horizontal).clone(),
            (*bottom).clone(),
            (*horizontal).clone(),
        ]),
        [top, right, bottom, left] => Some([
            (*top).clone(),
            (*right).clone(),
            (*bottom).clone(),
            (*left).clone(),
        ]),
        _ => None,
    }
}

/// The standard 1/2/3/4 collapse over side texts.
fn collapse_box(top: &str, right: &str, bottom: &str, left: &str) -> String {
    if top == right && top == bottom && top == left {
        top.to_string()
    } else if top == bottom && right == left {
        format!("{top} {right}")
    } else if right == left {
        format!("{top} {right} {bottom}")
    } else {
        format!("{top} {right} {bottom} {left}")
    }
}

impl ShorthandBuilder for BoxFamily {
    fn name(&self) -> &'static str {
        self.name
    }

    fn longhands(&self) -> &'static [&'static str] {
        self.longhands
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let components = value.components();
        if !components.iter().all(|c| (self.accepts)(c)) {
            return None;
        }
        let sides = spread_box(&components)?;
        Some(
            self.longhands
                .iter()
                .zip(sides)
                .map(|(name, side)| (*name, side))
                .collect(),
        )
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        // Excluded sides borrow the text of their collapse partner so the
        // trailing override lands on a well-formed shorthand.
        let trailing: Vec<usize> = (0..4).filter(|i| values[*i].is_none()).collect();
        if trailing.len() == 4 {
            return None;
        }
        let partner = [2usize, 3, 0, 1];
        let mut texts: [Option<String>; 4] = [None, None, None, None];
        for i in 0..4 {
            if let Some(value) = values[i] {
                texts[i] = Some(text(value, minified, options));
            }
        }
        for i in 0..4 {
            if texts[i].is_none() {
                let fallback = texts[partner[i]]
                    .clone()
                    .or_else(|| texts.iter().flatten().next().cloned())?;
                texts[i] = Some(fallback);
            }
        }
        let [top, right, bottom, left] = texts.map(|t| t.unwrap_or_default());
        Some(BuiltShorthand {
            value: collapse_box(&top, &right, &bottom, &left),
            trailing,
        })
    }
}

// ---------------------------------------------------------------------------
// border and the per-side families.
// ---------------------------------------------------------------------------

struct BorderFamily;

static BORDER: BorderFamily = BorderFamily;

const BORDER_LONGHANDS: [&str; 12] = [
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "border-top-style",
    "border-right-style",
    "border-bottom-style",
    "border-left-style",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
];

/// Splits "1px solid red"-shaped component runs into width/style/color.
/// Each slot may appear at most once.
fn classify_border(
    components: &[&PropertyValue],
) -> Option<(Option<PropertyValue>, Option<PropertyValue>, Option<PropertyValue>)> {
    let mut width = None;
    let mut style = None;
    let mut color = None;
    for component in components {
        if is_border_style(component) {
            if style.replace((*component).clone()).is_some() {
                return None;
            }
        } else if is_border_width(component) {
            if width.replace((*component).clone()).is_some() {
                return None;
            }
        } else if is_color(component) {
            if color.replace((*component).clone()).is_some() {
                return None;
            }
        } else {
            return None;
        }
    }
    Some((width, style, color))
}

fn border_reset(kind: usize) -> PropertyValue {
    match kind {
        0 => PropertyValue::ident("medium"),
        1 => PropertyValue::ident("none"),
        _ => PropertyValue::ident("currentcolor"),
    }
}

impl ShorthandBuilder for BorderFamily {
    fn name(&self) -> &'static str {
        "border"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &BORDER_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let (width, style, color) = classify_border(&value.components())?;
        let kinds = [width, style, color];
        let mut out = Vec::with_capacity(12);
        for (kind_idx, kind) in kinds.iter().enumerate() {
            let resolved = kind.clone().unwrap_or_else(|| border_reset(kind_idx));
            for side in 0..4 {
                out.push((BORDER_LONGHANDS[kind_idx * 4 + side], resolved.clone()));
            }
        }
        Some(out)
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let mut trailing: Vec<usize> = Vec::new();
        let mut parts: Vec<String> = Vec::new();
        // Each kind needs one representative value; a single deviant side
        // (or excluded slot) becomes a trailing override.
        for kind_idx in 0..3 {
            let slots = &values[kind_idx * 4..kind_idx * 4 + 4];
            let mut texts: Vec<(usize, String)> = Vec::new();
            for (side, slot) in slots.iter().enumerate() {
                match slot {
                    Some(value) => texts.push((side, text(value, minified, options))),
                    None => trailing.push(kind_idx * 4 + side),
                }
            }
            if texts.is_empty() {
                return None;
            }
            let mut counts: Vec<(String, usize)> = Vec::new();
            for (_, t) in &texts {
                match counts.iter_mut().find(|(existing, _)| existing == t) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((t.clone(), 1)),
                }
            }
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            let (majority, majority_count) = counts.remove(0);
            if texts.len() - majority_count > 1 {
                return None;
            }
            for (side, t) in &texts {
                if *t != majority {
                    trailing.push(kind_idx * 4 + side);
                }
            }
            let reset_text = text(&border_reset(kind_idx), minified, options);
            if majority != reset_text {
                parts.push(majority);
            }
        }
        if parts.is_empty() {
            parts.push("none".to_string());
        }
        trailing.sort_unstable();
        Some(BuiltShorthand {
            value: parts.join(" "),
            trailing,
        })
    }
}

struct BorderSideFamily {
    name: &'static str,
    longhands: &'static [&'static str; 3],
}

static BORDER_TOP: BorderSideFamily = BorderSideFamily {
    name: "border-top",
    longhands: &["border-top-width", "border-top-style", "border-top-color"],
};

static BORDER_RIGHT: BorderSideFamily = BorderSideFamily {
    name: "border-right",
    longhands: &[
        "border-right-width",
        "border-right-style",
        "border-right-color",
    ],
};

static BORDER_BOTTOM: BorderSideFamily = BorderSideFamily {
    name: "border-bottom",
    longhands: &[
        "border-bottom-width",
        "border-bottom-style",
        "border-bottom-color",
    ],
};

static BORDER_LEFT: BorderSideFamily = BorderSideFamily {
    name: "border-left",
    longhands: &[
        "border-left-width",
        "border-left-style",
        "border-left-color",
    ],
};

static OUTLINE: BorderSideFamily = BorderSideFamily {
    name: "outline",
    longhands: &["outline-width", "outline-style", "outline-color"],
};

static COLUMN_RULE: BorderSideFamily = BorderSideFamily {
    name: "column-rule",
    longhands: &[
        "column-rule-width",
        "column-rule-style",
        "column-rule-color",
    ],
};

impl ShorthandBuilder for BorderSideFamily {
    fn name(&self) -> &'static str {
        self.name
    }

    fn longhands(&self) -> &'static [&'static str] {
        self.longhands
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let (width, style, color) = classify_border(&value.components())?;
        Some(vec![
            (self.longhands[0], width.unwrap_or_else(|| border_reset(0))),
            (self.longhands[1], style.unwrap_or_else(|| border_reset(1))),
            (self.longhands[2], color.unwrap_or_else(|| border_reset(2))),
        ])
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let mut trailing: Vec<usize> = Vec::new();
        let mut parts: Vec<String> = Vec::new();
        for (idx, slot) in values.iter().enumerate() {
            match slot {
                Some(value) => {
                    let value_text = text(value, minified, options);
                    if value_text != text(&border_reset(idx), minified, options) {
                        parts.push(value_text);
                    }
                }
                None => trailing.push(idx),
            }
        }
        if trailing.len() == values.len() {
            return None;
        }
        if parts.is_empty() {
            parts.push("none".to_string());
        }
        Some(BuiltShorthand {
            value: parts.join(" "),
            trailing,
        })
    }
}

// ---------------------------------------------------------------------------
// border-radius: four corners, optional elliptical slash form.
// ---------------------------------------------------------------------------

struct BorderRadiusFamily;

static BORDER_RADIUS: BorderRadiusFamily = BorderRadiusFamily;

const RADIUS_LONGHANDS: [&str; 4] = [
    "border-top-left-radius",
    "border-top-right-radius",
    "border-bottom-right-radius",
    "border-bottom-left-radius",
];

impl ShorthandBuilder for BorderRadiusFamily {
    fn name(&self) -> &'static str {
        "border-radius"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &RADIUS_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let components = value.components();
        let slash = components
            .iter()
            .position(|c| matches!(c, PropertyValue::Op('/')));
        let (horizontal, vertical) = match slash {
            Some(idx) => (&components[..idx], Some(&components[idx + 1..])),
            None => (&components[..], None),
        };
        if !horizontal.iter().all(|c| is_length_or_percent(c)) {
            return None;
        }
        let h = spread_box(horizontal)?;
        let v = match vertical {
            Some(vertical) => {
                if vertical.is_empty() || !vertical.iter().all(|c| is_length_or_percent(c)) {
                    return None;
                }
                Some(spread_box(vertical)?)
            }
            None => None,
        };
        let mut out = Vec::with_capacity(4);
        for (idx, name) in RADIUS_LONGHANDS.iter().enumerate() {
            let corner = match &v {
                Some(v) if v[idx] != h[idx] => PropertyValue::List {
                    values: vec![h[idx].clone(), v[idx].clone()],
                    separator: ListSeparator::Space,
                },
                _ => h[idx].clone(),
            };
            out.push((*name, corner));
        }
        Some(out)
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let mut horizontal: Vec<String> = Vec::with_capacity(4);
        let mut vertical: Vec<String> = Vec::with_capacity(4);
        for slot in values {
            let value = (*slot)?;
            let components = value.components();
            match components.as_slice() {
                [single] => {
                    let t = text(single, minified, options);
                    horizontal.push(t.clone());
                    vertical.push(t);
                }
                [h, v] => {
                    horizontal.push(text(h, minified, options));
                    vertical.push(text(v, minified, options));
                }
                _ => return None,
            }
        }
        let h = collapse_box(&horizontal[0], &horizontal[1], &horizontal[2], &horizontal[3]);
        let v = collapse_box(&vertical[0], &vertical[1], &vertical[2], &vertical[3]);
        let value = if h == v {
            h
        } else if minified {
            format!("{h}/{v}")
        } else {
            format!("{h} / {v}")
        };
        Some(BuiltShorthand {
            value,
            trailing: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// font: [style variant weight]? size[/line-height] family-list.
// ---------------------------------------------------------------------------

struct FontFamilyShorthand;

static FONT: FontFamilyShorthand = FontFamilyShorthand;

const FONT_LONGHANDS: [&str; 6] = [
    "font-style",
    "font-variant",
    "font-weight",
    "font-size",
    "line-height",
    "font-family",
];

fn is_font_size(value: &PropertyValue) -> bool {
    is_length_or_percent(value)
        || ident_matches(
            value,
            &[
                "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large",
                "smaller", "larger",
            ],
        )
}

fn is_font_weight(value: &PropertyValue) -> bool {
    if ident_matches(value, &["bold", "bolder", "lighter"]) {
        return true;
    }
    matches!(
        value.as_number(),
        Some((num, CssUnit::None)) if (100.0..=900.0).contains(&num) && num % 100.0 == 0.0
    )
}

impl ShorthandBuilder for FontFamilyShorthand {
    fn name(&self) -> &'static str {
        "font"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &FONT_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let (first_group, extra_families) = match value {
            PropertyValue::List {
                values,
                separator: ListSeparator::Comma,
            } => (values.first()?.components(), &values[1..]),
            other => (other.components(), &[] as &[PropertyValue]),
        };

        let mut style = None;
        let mut variant = None;
        let mut weight = None;
        let mut size = None;
        let mut line_height = None;
        let mut family_parts: Vec<PropertyValue> = Vec::new();
        let mut idx = 0;

        while idx < first_group.len() {
            let component = first_group[idx];
            if size.is_none() {
                if ident_matches(component, &["normal"]) {
                    idx += 1;
                    continue;
                }
                if style.is_none() && ident_matches(component, &["italic", "oblique"]) {
                    style = Some(component.clone());
                    idx += 1;
                    continue;
                }
                if variant.is_none() && ident_matches(component, &["small-caps"]) {
                    variant = Some(component.clone());
                    idx += 1;
                    continue;
                }
                if weight.is_none() && is_font_weight(component) {
                    weight = Some(component.clone());
                    idx += 1;
                    continue;
                }
                if is_font_size(component) {
                    size = Some(component.clone());
                    idx += 1;
                    if idx + 1 < first_group.len()
                        && matches!(first_group[idx], PropertyValue::Op('/'))
                    {
                        line_height = Some(first_group[idx + 1].clone());
                        idx += 2;
                    }
                    continue;
                }
                return None;
            }
            family_parts.push(component.clone());
            idx += 1;
        }

        let size = size?;
        if family_parts.is_empty() {
            return None;
        }
        let first_family = join_family_parts(family_parts)?;
        let family = if extra_families.is_empty() {
            first_family
        } else {
            let mut families = vec![first_family];
            for extra in extra_families {
                families.push(join_family_parts(extra.components().into_iter().cloned().collect())?);
            }
            PropertyValue::List {
                values: families,
                separator: ListSeparator::Comma,
            }
        };

        Some(vec![
            ("font-style", style.unwrap_or_else(|| PropertyValue::ident("normal"))),
            ("font-variant", variant.unwrap_or_else(|| PropertyValue::ident("normal"))),
            ("font-weight", weight.unwrap_or_else(|| PropertyValue::ident("normal"))),
            ("font-size", size),
            ("line-height", line_height.unwrap_or_else(|| PropertyValue::ident("normal"))),
            ("font-family", family),
        ])
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let [style, variant, weight, size, line_height, family] = values else {
            return None;
        };
        let (size, family) = ((*size)?, (*family)?);
        let mut parts: Vec<String> = Vec::new();
        for prefix in [style, variant, weight] {
            let value = (*prefix)?;
            let value_text = text(value, minified, options);
            if value_text != "normal" {
                parts.push(value_text);
            }
        }
        let line_height = (*line_height)?;
        let line_height_text = text(line_height, minified, options);
        let size_text = text(size, minified, options);
        if line_height_text == "normal" {
            parts.push(size_text);
        } else {
            parts.push(format!("{size_text}/{line_height_text}"));
        }
        parts.push(text(family, minified, options));
        Some(BuiltShorthand {
            value: parts.join(" "),
            trailing: Vec::new(),
        })
    }
}

/// Unquoted multi-word family names collapse into one quoted string, which
/// keeps serialization stable across reparses.
fn join_family_parts(mut parts: Vec<PropertyValue>) -> Option<PropertyValue> {
    match parts.len() {
        0 => None,
        1 => Some(parts.remove(0)),
        _ => {
            let mut words: Vec<String> = Vec::with_capacity(parts.len());
            for part in parts {
                words.push(part.as_ident()?.to_string());
            }
            Some(PropertyValue::String(words.join(" ")))
        }
    }
}

// ---------------------------------------------------------------------------
// background: layered; color belongs to the final layer only.
// ---------------------------------------------------------------------------

struct BackgroundFamily;

static BACKGROUND: BackgroundFamily = BackgroundFamily;

const BACKGROUND_LONGHANDS: [&str; 5] = [
    "background-image",
    "background-position",
    "background-repeat",
    "background-attachment",
    "background-color",
];

const BACKGROUND_RESETS: [&str; 5] = ["none", "0% 0%", "repeat", "scroll", "transparent"];

fn is_background_image(value: &PropertyValue) -> bool {
    matches!(value, PropertyValue::Uri(_))
        || ident_matches(value, &["none"])
        || matches!(
            value,
            PropertyValue::Function { name, .. }
                if name.to_ascii_lowercase().contains("gradient")
        )
}

fn is_background_position(value: &PropertyValue) -> bool {
    is_length_or_percent(value)
        || ident_matches(value, &["left", "right", "top", "bottom", "center"])
}

fn background_reset(idx: usize) -> PropertyValue {
    PropertyValue::parse_str(BACKGROUND_RESETS[idx]).unwrap_or(PropertyValue::Ident(String::new()))
}

impl ShorthandBuilder for BackgroundFamily {
    fn name(&self) -> &'static str {
        "background"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &BACKGROUND_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let layers = value.layers();
        let layer_count = layers.len();
        let mut per_longhand: Vec<Vec<PropertyValue>> = vec![Vec::new(); 5];

        for (layer_idx, layer) in layers.iter().enumerate() {
            let mut image = None;
            let mut position: Vec<PropertyValue> = Vec::new();
            let mut repeat = None;
            let mut attachment = None;
            let mut color = None;
            for component in layer.components() {
                if is_background_image(component) && image.is_none() {
                    image = Some(component.clone());
                } else if ident_matches(
                    component,
                    &["repeat", "repeat-x", "repeat-y", "no-repeat", "space", "round"],
                ) && repeat.is_none()
                {
                    repeat = Some(component.clone());
                } else if ident_matches(component, &["scroll", "fixed", "local"])
                    && attachment.is_none()
                {
                    attachment = Some(component.clone());
                } else if is_background_position(component) && position.len() < 2 {
                    position.push(component.clone());
                } else if is_color(component) && color.is_none() {
                    if layer_idx + 1 != layer_count {
                        return None;
                    }
                    color = Some(component.clone());
                } else {
                    return None;
                }
            }
            let position = match position.len() {
                0 => background_reset(1),
                1 => position.remove(0),
                _ => PropertyValue::List {
                    values: position,
                    separator: ListSeparator::Space,
                },
            };
            per_longhand[0].push(image.unwrap_or_else(|| background_reset(0)));
            per_longhand[1].push(position);
            per_longhand[2].push(repeat.unwrap_or_else(|| background_reset(2)));
            per_longhand[3].push(attachment.unwrap_or_else(|| background_reset(3)));
            if layer_idx + 1 == layer_count {
                per_longhand[4].push(color.unwrap_or_else(|| background_reset(4)));
            }
        }

        let mut out = Vec::with_capacity(5);
        for (idx, name) in BACKGROUND_LONGHANDS.iter().enumerate() {
            let mut values = std::mem::take(&mut per_longhand[idx]);
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                PropertyValue::List {
                    values,
                    separator: ListSeparator::Layer,
                }
            };
            out.push((*name, value));
        }
        Some(out)
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let mut slots: Vec<&PropertyValue> = Vec::with_capacity(5);
        for slot in values {
            slots.push((*slot)?);
        }
        let layer_count = slots[0].layers().len();
        if slots[4].layers().len() != 1 {
            return None;
        }
        let mut layer_texts: Vec<String> = Vec::with_capacity(layer_count);
        for layer_idx in 0..layer_count {
            let mut parts: Vec<String> = Vec::new();
            for (longhand_idx, value) in slots.iter().enumerate() {
                if longhand_idx == 4 && layer_idx + 1 != layer_count {
                    continue;
                }
                let layers = value.layers();
                // Dependent lists shorter than the master cycle.
                let layered = if longhand_idx == 4 {
                    layers[0]
                } else {
                    layers[layer_idx % layers.len()]
                };
                let value_text = text(layered, minified, options);
                if value_text != text(&background_reset(longhand_idx), minified, options) {
                    parts.push(value_text);
                }
            }
            if parts.is_empty() {
                parts.push("none".to_string());
            }
            layer_texts.push(parts.join(" "));
        }
        let joiner = if minified { "," } else { ", " };
        Some(BuiltShorthand {
            value: layer_texts.join(joiner),
            trailing: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// list-style, text-decoration, flex and friends.
// ---------------------------------------------------------------------------

/// Families whose shorthand is an unordered run of distinguishable slots.
struct SlotFamily {
    name: &'static str,
    longhands: &'static [&'static str],
    resets: &'static [&'static str],
    classify: fn(&PropertyValue) -> Option<usize>,
    empty_text: &'static str,
}

fn classify_list_style(value: &PropertyValue) -> Option<usize> {
    if ident_matches(value, &["inside", "outside"]) {
        return Some(1);
    }
    if matches!(value, PropertyValue::Uri(_)) {
        return Some(2);
    }
    if ident_matches(
        value,
        &[
            "disc",
            "circle",
            "square",
            "decimal",
            "decimal-leading-zero",
            "lower-roman",
            "upper-roman",
            "lower-alpha",
            "upper-alpha",
            "lower-greek",
            "lower-latin",
            "upper-latin",
            "armenian",
            "georgian",
            "none",
        ],
    ) {
        return Some(0);
    }
    None
}

static LIST_STYLE: SlotFamily = SlotFamily {
    name: "list-style",
    longhands: &["list-style-type", "list-style-position", "list-style-image"],
    resets: &["disc", "outside", "none"],
    classify: classify_list_style,
    empty_text: "disc",
};

fn classify_text_decoration(value: &PropertyValue) -> Option<usize> {
    if ident_matches(
        value,
        &["none", "underline", "overline", "line-through", "blink"],
    ) {
        return Some(0);
    }
    if ident_matches(value, &["solid", "double", "dotted", "dashed", "wavy"]) {
        return Some(1);
    }
    if is_color(value) {
        return Some(2);
    }
    None
}

static TEXT_DECORATION: SlotFamily = SlotFamily {
    name: "text-decoration",
    longhands: &[
        "text-decoration-line",
        "text-decoration-style",
        "text-decoration-color",
    ],
    resets: &["none", "solid", "currentcolor"],
    classify: classify_text_decoration,
    empty_text: "none",
};

fn classify_flex_flow(value: &PropertyValue) -> Option<usize> {
    if ident_matches(value, &["row", "row-reverse", "column", "column-reverse"]) {
        return Some(0);
    }
    if ident_matches(value, &["nowrap", "wrap", "wrap-reverse"]) {
        return Some(1);
    }
    None
}

static FLEX_FLOW: SlotFamily = SlotFamily {
    name: "flex-flow",
    longhands: &["flex-direction", "flex-wrap"],
    resets: &["row", "nowrap"],
    classify: classify_flex_flow,
    empty_text: "row",
};

impl ShorthandBuilder for SlotFamily {
    fn name(&self) -> &'static str {
        self.name
    }

    fn longhands(&self) -> &'static [&'static str] {
        self.longhands
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let mut slots: Vec<Option<PropertyValue>> = vec![None; self.longhands.len()];
        for component in value.components() {
            let slot = (self.classify)(component)?;
            if slots[slot].replace(component.clone()).is_some() {
                return None;
            }
        }
        Some(
            self.longhands
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let value = slots[idx].take().unwrap_or_else(|| {
                        PropertyValue::parse_str(self.resets[idx])
                            .unwrap_or(PropertyValue::Ident(String::new()))
                    });
                    (*name, value)
                })
                .collect(),
        )
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let mut trailing: Vec<usize> = Vec::new();
        let mut parts: Vec<String> = Vec::new();
        for (idx, slot) in values.iter().enumerate() {
            match slot {
                Some(value) => {
                    let value_text = text(value, minified, options);
                    if value_text != self.resets[idx] {
                        parts.push(value_text);
                    }
                }
                None => trailing.push(idx),
            }
        }
        if trailing.len() == values.len() {
            return None;
        }
        if parts.is_empty() {
            parts.push(self.empty_text.to_string());
        }
        Some(BuiltShorthand {
            value: parts.join(" "),
            trailing,
        })
    }
}

struct FlexFamily;

static FLEX: FlexFamily = FlexFamily;

impl ShorthandBuilder for FlexFamily {
    fn name(&self) -> &'static str {
        "flex"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &["flex-grow", "flex-shrink", "flex-basis"]
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let components = value.components();
        if components.len() == 1 {
            if ident_matches(components[0], &["none"]) {
                return Some(vec![
                    ("flex-grow", PropertyValue::number(0.0)),
                    ("flex-shrink", PropertyValue::number(0.0)),
                    ("flex-basis", PropertyValue::ident("auto")),
                ]);
            }
            if ident_matches(components[0], &["auto"]) {
                return Some(vec![
                    ("flex-grow", PropertyValue::number(1.0)),
                    ("flex-shrink", PropertyValue::number(1.0)),
                    ("flex-basis", PropertyValue::ident("auto")),
                ]);
            }
        }
        let mut grow = None;
        let mut shrink = None;
        let mut basis = None;
        for component in components {
            match component.as_number() {
                Some((num, CssUnit::None)) => {
                    if grow.is_none() {
                        grow = Some(num);
                    } else if shrink.is_none() {
                        shrink = Some(num);
                    } else {
                        return None;
                    }
                }
                _ => {
                    if basis.is_some() {
                        return None;
                    }
                    if is_length_or_percent(component) || ident_matches(component, &["auto", "content"]) {
                        basis = Some(component.clone());
                    } else {
                        return None;
                    }
                }
            }
        }
        if grow.is_none() && basis.is_none() {
            return None;
        }
        Some(vec![
            ("flex-grow", PropertyValue::number(grow.unwrap_or(1.0))),
            ("flex-shrink", PropertyValue::number(shrink.unwrap_or(1.0))),
            (
                "flex-basis",
                basis.unwrap_or(PropertyValue::Number {
                    value: 0.0,
                    unit: CssUnit::Percent,
                }),
            ),
        ])
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let [Some(grow), Some(shrink), Some(basis)] = values else {
            return None;
        };
        let grow_text = text(grow, minified, options);
        let shrink_text = text(shrink, minified, options);
        let basis_text = text(basis, minified, options);
        if grow_text == "0" && shrink_text == "0" && basis_text == "auto" {
            return Some(BuiltShorthand {
                value: "none".to_string(),
                trailing: Vec::new(),
            });
        }
        Some(BuiltShorthand {
            value: format!("{grow_text} {shrink_text} {basis_text}"),
            trailing: Vec::new(),
        })
    }
}

/// Two-slot families collapsing equal values to one (gap, place-*).
struct PairFamily {
    name: &'static str,
    longhands: &'static [&'static str; 2],
    accepts: fn(&PropertyValue) -> bool,
}

fn accepts_gap(value: &PropertyValue) -> bool {
    is_length_or_percent(value) || ident_matches(value, &["normal"])
}

fn accepts_placement(value: &PropertyValue) -> bool {
    ident_matches(
        value,
        &[
            "normal",
            "start",
            "end",
            "center",
            "stretch",
            "baseline",
            "first",
            "last",
            "space-between",
            "space-around",
            "space-evenly",
            "flex-start",
            "flex-end",
            "self-start",
            "self-end",
            "auto",
            "legacy",
            "safe",
            "unsafe",
        ],
    )
}

fn accepts_overflow(value: &PropertyValue) -> bool {
    ident_matches(value, &["visible", "hidden", "clip", "scroll", "auto"])
}

static GAP: PairFamily = PairFamily {
    name: "gap",
    longhands: &["row-gap", "column-gap"],
    accepts: accepts_gap,
};

static PLACE_CONTENT: PairFamily = PairFamily {
    name: "place-content",
    longhands: &["align-content", "justify-content"],
    accepts: accepts_placement,
};

static PLACE_ITEMS: PairFamily = PairFamily {
    name: "place-items",
    longhands: &["align-items", "justify-items"],
    accepts: accepts_placement,
};

static PLACE_SELF: PairFamily = PairFamily {
    name: "place-self",
    longhands: &["align-self", "justify-self"],
    accepts: accepts_placement,
};

static OVERFLOW: PairFamily = PairFamily {
    name: "overflow",
    longhands: &["overflow-x", "overflow-y"],
    accepts: accepts_overflow,
};

impl ShorthandBuilder for PairFamily {
    fn name(&self) -> &'static str {
        self.name
    }

    fn longhands(&self) -> &'static [&'static str] {
        self.longhands
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let components = value.components();
        if !components.iter().all(|c| (self.accepts)(c)) {
            return None;
        }
        let (first, second) = match components.as_slice() {
            [single] => ((*single).clone(), (*single).clone()),
            [first, second] => ((*first).clone(), (*second).clone()),
            _ => return None,
        };
        Some(vec![
            (self.longhands[0], first),
            (self.longhands[1], second),
        ])
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let [Some(first), Some(second)] = values else {
            return None;
        };
        let first_text = text(first, minified, options);
        let second_text = text(second, minified, options);
        let value = if first_text == second_text {
            first_text
        } else {
            format!("{first_text} {second_text}")
        };
        Some(BuiltShorthand {
            value,
            trailing: Vec::new(),
        })
    }
}

struct ColumnsFamily;

static COLUMNS: ColumnsFamily = ColumnsFamily;

impl ShorthandBuilder for ColumnsFamily {
    fn name(&self) -> &'static str {
        "columns"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &["column-width", "column-count"]
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let mut width = None;
        let mut count = None;
        for component in value.components() {
            if ident_matches(component, &["auto"]) {
                if width.is_none() {
                    width = Some(component.clone());
                } else if count.is_none() {
                    count = Some(component.clone());
                } else {
                    return None;
                }
            } else if is_length_or_percent(component) && width.is_none() {
                width = Some(component.clone());
            } else if matches!(component.as_number(), Some((_, CssUnit::None))) && count.is_none() {
                count = Some(component.clone());
            } else {
                return None;
            }
        }
        Some(vec![
            (
                "column-width",
                width.unwrap_or_else(|| PropertyValue::ident("auto")),
            ),
            (
                "column-count",
                count.unwrap_or_else(|| PropertyValue::ident("auto")),
            ),
        ])
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let [Some(width), Some(count)] = values else {
            return None;
        };
        let width_text = text(width, minified, options);
        let count_text = text(count, minified, options);
        let value = match (width_text.as_str(), count_text.as_str()) {
            ("auto", "auto") => "auto".to_string(),
            ("auto", _) => count_text,
            (_, "auto") => width_text,
            _ => format!("{width_text} {count_text}"),
        };
        Some(BuiltShorthand {
            value,
            trailing: Vec::new(),
        })
    }
}

struct GridFamily;

static GRID: GridFamily = GridFamily;

const GRID_LONGHANDS: [&str; 6] = [
    "grid-template-rows",
    "grid-template-columns",
    "grid-template-areas",
    "grid-auto-flow",
    "grid-auto-rows",
    "grid-auto-columns",
];

impl ShorthandBuilder for GridFamily {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &GRID_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        // Only the template form "rows / columns" is recognized; auto-flow
        // variants stay unexpanded.
        let components = value.components();
        let slash = components
            .iter()
            .position(|c| matches!(c, PropertyValue::Op('/')))?;
        let (rows, columns) = (&components[..slash], &components[slash + 1..]);
        if rows.is_empty() || columns.is_empty() {
            return None;
        }
        let pack = |parts: &[&PropertyValue]| -> PropertyValue {
            if parts.len() == 1 {
                parts[0].clone()
            } else {
                PropertyValue::List {
                    values: parts.iter().map(|p| (*p).clone()).collect(),
                    separator: ListSeparator::Space,
                }
            }
        };
        Some(vec![
            ("grid-template-rows", pack(rows)),
            ("grid-template-columns", pack(columns)),
            ("grid-template-areas", PropertyValue::ident("none")),
            ("grid-auto-flow", PropertyValue::ident("row")),
            ("grid-auto-rows", PropertyValue::ident("auto")),
            ("grid-auto-columns", PropertyValue::ident("auto")),
        ])
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        let mut slots: Vec<&PropertyValue> = Vec::with_capacity(6);
        for slot in values {
            slots.push((*slot)?);
        }
        let resets = ["none", "row", "auto", "auto"];
        for (idx, reset) in resets.iter().enumerate() {
            if text(slots[idx + 2], minified, options) != *reset {
                return None;
            }
        }
        let rows = text(slots[0], minified, options);
        let columns = text(slots[1], minified, options);
        if rows == "none" && columns == "none" {
            return Some(BuiltShorthand {
                value: "none".to_string(),
                trailing: Vec::new(),
            });
        }
        let value = if minified {
            format!("{rows}/{columns}")
        } else {
            format!("{rows} / {columns}")
        };
        Some(BuiltShorthand {
            value,
            trailing: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// transition / animation: layered timing families.
// ---------------------------------------------------------------------------

struct TransitionFamily;

static TRANSITION: TransitionFamily = TransitionFamily;

const TRANSITION_LONGHANDS: [&str; 4] = [
    "transition-property",
    "transition-duration",
    "transition-timing-function",
    "transition-delay",
];

const TRANSITION_RESETS: [&str; 4] = ["all", "0s", "ease", "0s"];

fn pack_layers(mut layers: Vec<PropertyValue>) -> PropertyValue {
    if layers.len() == 1 {
        layers.remove(0)
    } else {
        PropertyValue::List {
            values: layers,
            separator: ListSeparator::Layer,
        }
    }
}

impl ShorthandBuilder for TransitionFamily {
    fn name(&self) -> &'static str {
        "transition"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &TRANSITION_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let layers = value.layers();
        let mut per_longhand: Vec<Vec<PropertyValue>> = vec![Vec::new(); 4];
        for layer in layers {
            let mut property = None;
            let mut duration = None;
            let mut timing = None;
            let mut delay = None;
            for component in layer.components() {
                if is_time(component) {
                    if duration.is_none() {
                        duration = Some(component.clone());
                    } else if delay.is_none() {
                        delay = Some(component.clone());
                    } else {
                        return None;
                    }
                } else if is_timing_function(component) && timing.is_none() {
                    timing = Some(component.clone());
                } else if component.as_ident().is_some() && property.is_none() {
                    property = Some(component.clone());
                } else {
                    return None;
                }
            }
            let resets = &TRANSITION_RESETS;
            per_longhand[0].push(property.unwrap_or_else(|| PropertyValue::ident(resets[0])));
            per_longhand[1].push(
                duration.unwrap_or_else(|| PropertyValue::dimension(0.0, CssUnit::S)),
            );
            per_longhand[2].push(timing.unwrap_or_else(|| PropertyValue::ident(resets[2])));
            per_longhand[3].push(delay.unwrap_or_else(|| PropertyValue::dimension(0.0, CssUnit::S)));
        }
        Some(
            TRANSITION_LONGHANDS
                .iter()
                .zip(per_longhand)
                .map(|(name, layers)| (*name, pack_layers(layers)))
                .collect(),
        )
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        build_layered(values, &TRANSITION_RESETS, &[(3, 1)], minified, options)
    }
}

struct AnimationFamily;

static ANIMATION: AnimationFamily = AnimationFamily;

const ANIMATION_LONGHANDS: [&str; 8] = [
    "animation-name",
    "animation-duration",
    "animation-timing-function",
    "animation-delay",
    "animation-iteration-count",
    "animation-direction",
    "animation-fill-mode",
    "animation-play-state",
];

const ANIMATION_RESETS: [&str; 8] = [
    "none", "0s", "ease", "0s", "1", "normal", "none", "running",
];

impl ShorthandBuilder for AnimationFamily {
    fn name(&self) -> &'static str {
        "animation"
    }

    fn longhands(&self) -> &'static [&'static str] {
        &ANIMATION_LONGHANDS
    }

    fn expand(&self, value: &PropertyValue) -> Option<Vec<(&'static str, PropertyValue)>> {
        let layers = value.layers();
        let mut per_longhand: Vec<Vec<PropertyValue>> = vec![Vec::new(); 8];
        for layer in layers {
            let mut slots: [Option<PropertyValue>; 8] = Default::default();
            for component in layer.components() {
                let idx = if is_time(component) {
                    if slots[1].is_none() { 1 } else { 3 }
                } else if is_timing_function(component) {
                    2
                } else if matches!(component.as_number(), Some((_, CssUnit::None)))
                    || ident_matches(component, &["infinite"])
                {
                    4
                } else if ident_matches(
                    component,
                    &["normal", "reverse", "alternate", "alternate-reverse"],
                ) && slots[5].is_none()
                {
                    5
                } else if ident_matches(component, &["forwards", "backwards", "both"])
                    || (ident_matches(component, &["none"]) && slots[0].is_some())
                {
                    6
                } else if ident_matches(component, &["running", "paused"]) {
                    7
                } else if component.as_ident().is_some() || matches!(component, PropertyValue::String(_)) {
                    0
                } else {
                    return None;
                };
                if slots[idx].replace(component.clone()).is_some() {
                    return None;
                }
            }
            for (idx, slot) in slots.into_iter().enumerate() {
                per_longhand[idx].push(slot.unwrap_or_else(|| {
                    PropertyValue::parse_str(ANIMATION_RESETS[idx])
                        .unwrap_or(PropertyValue::Ident(String::new()))
                }));
            }
        }
        Some(
            ANIMATION_LONGHANDS
                .iter()
                .zip(per_longhand)
                .map(|(name, layers)| (*name, pack_layers(layers)))
                .collect(),
        )
    }

    fn build(
        &self,
        values: &[Option<&PropertyValue>],
        minified: bool,
        options: &SerializeOptions,
    ) -> Option<BuiltShorthand> {
        build_layered(values, &ANIMATION_RESETS, &[(3, 1)], minified, options)
    }
}

/// Shared reconstruction for layered timing families. The first longhand
/// (transition-property, animation-name) drives the layer count; shorter
/// dependent lists cycle. `forces` pairs (dependent, prerequisite): when a
/// non-reset delay appears, the duration in the same layer must serialize
/// too or the two times would swap meaning on reparse.
fn build_layered(
    values: &[Option<&PropertyValue>],
    resets: &[&str],
    forces: &[(usize, usize)],
    minified: bool,
    options: &SerializeOptions,
) -> Option<BuiltShorthand> {
    let mut slots: Vec<&PropertyValue> = Vec::with_capacity(values.len());
    for slot in values {
        slots.push((*slot)?);
    }
    let layer_count = slots[0].layers().len();
    let mut layer_texts: Vec<String> = Vec::with_capacity(layer_count);
    for layer_idx in 0..layer_count {
        let layered_text = |longhand_idx: usize| {
            let layers = slots[longhand_idx].layers();
            text(layers[layer_idx % layers.len()], minified, options)
        };
        let mut emit = vec![false; slots.len()];
        for longhand_idx in 0..slots.len() {
            if layered_text(longhand_idx) != resets[longhand_idx] {
                emit[longhand_idx] = true;
            }
        }
        for (dependent, prerequisite) in forces {
            if emit[*dependent] {
                emit[*prerequisite] = true;
            }
        }
        let mut parts: Vec<String> = Vec::new();
        for (longhand_idx, wanted) in emit.iter().enumerate() {
            if *wanted {
                parts.push(layered_text(longhand_idx));
            }
        }
        if parts.is_empty() {
            parts.push(resets[0].to_string());
        }
        layer_texts.push(parts.join(" "));
    }
    let joiner = if minified { "," } else { ", " };
    Some(BuiltShorthand {
        value: layer_texts.join(joiner),
        trailing: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> PropertyValue {
        PropertyValue::parse_str(text).expect("value should parse")
    }

    fn expand(shorthand: &str, value: &str) -> Vec<(&'static str, PropertyValue)> {
        builder_for(shorthand)
            .expect("builder should exist")
            .expand(&parse(value))
            .expect("value should expand")
    }

    fn build(shorthand: &str, longhands: &[(&str, &str)]) -> Option<(String, Vec<usize>)> {
        let builder = builder_for(shorthand).expect("builder should exist");
        let parsed: Vec<Option<PropertyValue>> = builder
            .longhands()
            .iter()
            .map(|name| {
                longhands
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| parse(v))
            })
            .collect();
        let slots: Vec<Option<&PropertyValue>> =
            parsed.iter().map(|p| p.as_ref()).collect();
        builder
            .build(&slots, false, &SerializeOptions::default())
            .map(|built| (built.value, built.trailing))
    }

    #[test]
    fn margin_expands_two_value_form() {
        let longhands = expand("margin", "10px 20px");
        assert_eq!(longhands[0], ("margin-top", parse("10px")));
        assert_eq!(longhands[1], ("margin-right", parse("20px")));
        assert_eq!(longhands[2], ("margin-bottom", parse("10px")));
        assert_eq!(longhands[3], ("margin-left", parse("20px")));
    }

    #[test]
    fn margin_rejects_five_values() {
        let builder = builder_for("margin").unwrap();
        assert!(builder.expand(&parse("1px 2px 3px 4px 5px")).is_none());
    }

    #[test]
    fn box_collapse_picks_shortest_form() {
        let (value, trailing) = build(
            "margin",
            &[
                ("margin-top", "1px"),
                ("margin-right", "2px"),
                ("margin-bottom", "1px"),
                ("margin-left", "2px"),
            ],
        )
        .unwrap();
        assert_eq!(value, "1px 2px");
        assert!(trailing.is_empty());

        let (value, _) = build(
            "margin",
            &[
                ("margin-top", "1px"),
                ("margin-right", "2px"),
                ("margin-bottom", "3px"),
                ("margin-left", "2px"),
            ],
        )
        .unwrap();
        assert_eq!(value, "1px 2px 3px");
    }

    #[test]
    fn border_expands_to_twelve_longhands() {
        let longhands = expand("border", "1px dashed blue");
        assert_eq!(longhands.len(), 12);
        assert!(longhands.iter().any(|(n, v)| *n == "border-left-width" && *v == parse("1px")));
        assert!(longhands.iter().any(|(n, v)| *n == "border-top-style" && *v == parse("dashed")));
        assert!(
            longhands
                .iter()
                .any(|(n, v)| *n == "border-bottom-color" && *v == parse("blue"))
        );
    }

    #[test]
    fn border_round_trips() {
        let longhands = expand("border", "1px dashed blue");
        let borrowed: Vec<(&str, String)> = longhands
            .iter()
            .map(|(n, v)| (*n, v.to_css_text()))
            .collect();
        let refs: Vec<(&str, &str)> = borrowed.iter().map(|(n, v)| (*n, v.as_str())).collect();
        let (value, trailing) = build("border", &refs).unwrap();
        assert_eq!(value, "1px dashed blue");
        assert!(trailing.is_empty());
    }

    #[test]
    fn border_with_one_deviant_width_trails() {
        let longhands = expand("border", "1px solid red");
        let mut map: Vec<(&str, String)> = longhands
            .iter()
            .map(|(n, v)| (*n, v.to_css_text()))
            .collect();
        for entry in map.iter_mut() {
            if entry.0 == "border-top-width" {
                entry.1 = "2px".to_string();
            }
        }
        let refs: Vec<(&str, &str)> = map.iter().map(|(n, v)| (*n, v.as_str())).collect();
        let (value, trailing) = build("border", &refs).unwrap();
        assert_eq!(value, "1px solid red");
        assert_eq!(trailing, vec![0]);
    }

    #[test]
    fn border_with_two_deviant_widths_gives_up() {
        let longhands = expand("border", "1px solid red");
        let mut map: Vec<(&str, String)> = longhands
            .iter()
            .map(|(n, v)| (*n, v.to_css_text()))
            .collect();
        for entry in map.iter_mut() {
            if entry.0 == "border-top-width" || entry.0 == "border-bottom-width" {
                entry.1 = "2px".to_string();
            }
        }
        let refs: Vec<(&str, &str)> = map.iter().map(|(n, v)| (*n, v.as_str())).collect();
        assert!(build("border", &refs).is_none());
    }

    #[test]
    fn font_expands_prefix_and_line_height() {
        let longhands = expand("font", "italic bold 12px/1.5 serif");
        let find = |name: &str| {
            longhands
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.to_css_text())
                .unwrap()
        };
        assert_eq!(find("font-style"), "italic");
        assert_eq!(find("font-weight"), "bold");
        assert_eq!(find("font-size"), "12px");
        assert_eq!(find("line-height"), "1.5");
        assert_eq!(find("font-family"), "serif");
        assert_eq!(find("font-variant"), "normal");
    }

    #[test]
    fn font_requires_size_and_family() {
        let builder = builder_for("font").unwrap();
        assert!(builder.expand(&parse("italic bold")).is_none());
        assert!(builder.expand(&parse("12px")).is_none());
    }

    #[test]
    fn font_family_comma_list_survives_expansion() {
        let longhands = expand("font", "12px Helvetica Neue, Arial, sans-serif");
        let family = longhands
            .iter()
            .find(|(n, _)| *n == "font-family")
            .map(|(_, v)| v.to_css_text())
            .unwrap();
        assert_eq!(family, "\"Helvetica Neue\", Arial, sans-serif");
    }

    #[test]
    fn font_builds_with_slash_only_when_line_height_set() {
        let (value, _) = build(
            "font",
            &[
                ("font-style", "normal"),
                ("font-variant", "normal"),
                ("font-weight", "bold"),
                ("font-size", "12px"),
                ("line-height", "normal"),
                ("font-family", "serif"),
            ],
        )
        .unwrap();
        assert_eq!(value, "bold 12px serif");

        let (value, _) = build(
            "font",
            &[
                ("font-style", "normal"),
                ("font-variant", "normal"),
                ("font-weight", "normal"),
                ("font-size", "12px"),
                ("line-height", "1.5"),
                ("font-family", "serif"),
            ],
        )
        .unwrap();
        assert_eq!(value, "12px/1.5 serif");
    }

    #[test]
    fn background_single_layer_expands() {
        let longhands = expand("background", "url(bg.png) no-repeat fixed center red");
        let find = |name: &str| {
            longhands
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.to_css_text())
                .unwrap()
        };
        assert_eq!(find("background-image"), "url(\"bg.png\")");
        assert_eq!(find("background-repeat"), "no-repeat");
        assert_eq!(find("background-attachment"), "fixed");
        assert_eq!(find("background-position"), "center");
        assert_eq!(find("background-color"), "red");
    }

    #[test]
    fn background_color_only_on_last_layer() {
        let builder = builder_for("background").unwrap();
        assert!(
            builder
                .expand(&parse("url(a.png) red, url(b.png)"))
                .is_none()
        );
        assert!(
            builder
                .expand(&parse("url(a.png), url(b.png) red"))
                .is_some()
        );
    }

    #[test]
    fn background_layers_cycle_on_build() {
        let built = {
            let builder = builder_for("background").unwrap();
            let image = parse("url(a.png), url(b.png)");
            let position = parse("0% 0%");
            let repeat = parse("no-repeat");
            let attachment = parse("scroll");
            let color = parse("transparent");
            let slots = [
                Some(&image),
                Some(&position),
                Some(&repeat),
                Some(&attachment),
                Some(&color),
            ];
            builder
                .build(&slots, false, &SerializeOptions::default())
                .unwrap()
        };
        assert_eq!(built.value, "url(\"a.png\") no-repeat, url(\"b.png\") no-repeat");
    }

    #[test]
    fn transition_expands_duration_then_delay() {
        let longhands = expand("transition", "opacity 0.3s ease-in 0.1s");
        let find = |name: &str| {
            longhands
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.to_css_text())
                .unwrap()
        };
        assert_eq!(find("transition-property"), "opacity");
        assert_eq!(find("transition-duration"), "0.3s");
        assert_eq!(find("transition-timing-function"), "ease-in");
        assert_eq!(find("transition-delay"), "0.1s");
    }

    #[test]
    fn transition_delay_forces_duration_on_build() {
        let (value, _) = build(
            "transition",
            &[
                ("transition-property", "opacity"),
                ("transition-duration", "0s"),
                ("transition-timing-function", "ease"),
                ("transition-delay", "0.1s"),
            ],
        )
        .unwrap();
        assert_eq!(value, "opacity 0s 0.1s");
    }

    #[test]
    fn transition_layers_recombine() {
        let (value, _) = build(
            "transition",
            &[
                ("transition-property", "opacity, transform"),
                ("transition-duration", "0.3s"),
                ("transition-timing-function", "ease"),
                ("transition-delay", "0s"),
            ],
        )
        .unwrap();
        assert_eq!(value, "opacity 0.3s, transform 0.3s");
    }

    #[test]
    fn animation_classifies_name_last() {
        let longhands = expand("animation", "3s ease-in 1s infinite reverse both paused slidein");
        let find = |name: &str| {
            longhands
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.to_css_text())
                .unwrap()
        };
        assert_eq!(find("animation-name"), "slidein");
        assert_eq!(find("animation-duration"), "3s");
        assert_eq!(find("animation-delay"), "1s");
        assert_eq!(find("animation-iteration-count"), "infinite");
        assert_eq!(find("animation-direction"), "reverse");
        assert_eq!(find("animation-fill-mode"), "both");
        assert_eq!(find("animation-play-state"), "paused");
    }

    #[test]
    fn flex_keyword_forms() {
        let none = expand("flex", "none");
        assert_eq!(none[0].1, parse("0"));
        assert_eq!(none[1].1, parse("0"));
        assert_eq!(none[2].1, parse("auto"));

        let single = expand("flex", "2");
        assert_eq!(single[0].1, parse("2"));
        assert_eq!(single[1].1, parse("1"));
        assert_eq!(single[2].1.to_css_text(), "0%");
    }

    #[test]
    fn overflow_pair_collapses() {
        let (value, _) = build(
            "overflow",
            &[("overflow-x", "hidden"), ("overflow-y", "hidden")],
        )
        .unwrap();
        assert_eq!(value, "hidden");

        let (value, _) = build(
            "overflow",
            &[("overflow-x", "hidden"), ("overflow-y", "scroll")],
        )
        .unwrap();
        assert_eq!(value, "hidden scroll");
    }

    #[test]
    fn border_radius_slash_form() {
        let longhands = expand("border-radius", "1px 2px / 3px");
        let top_left = &longhands[0].1;
        assert_eq!(top_left.to_css_text(), "1px 3px");

        let refs: Vec<(&str, String)> = longhands
            .iter()
            .map(|(n, v)| (*n, v.to_css_text()))
            .collect();
        let refs: Vec<(&str, &str)> = refs.iter().map(|(n, v)| (*n, v.as_str())).collect();
        let (value, _) = build("border-radius", &refs).unwrap();
        assert_eq!(value, "1px 2px / 3px");
    }

    #[test]
    fn grid_template_form_round_trips() {
        let longhands = expand("grid", "auto 1fr / 100px auto");
        assert_eq!(longhands[0].1.to_css_text(), "auto 1fr");
        assert_eq!(longhands[1].1.to_css_text(), "100px auto");
        assert_eq!(longhands[2].1, parse("none"));
    }

    #[test]
    fn families_of_orders_largest_first() {
        let families = families_of("border-top-width");
        let names: Vec<&str> = families.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["border", "border-width", "border-top"]);
    }
}

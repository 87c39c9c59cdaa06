use crate::error::{CascataError, ParseError, Result, StyleError};
use cssparser::{Parser, ParserInput, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CssUnit {
    None,
    Px,
    Pt,
    Pc,
    In,
    Cm,
    Mm,
    Q,
    Em,
    Ex,
    Ch,
    Ic,
    Cap,
    Lh,
    Rlh,
    Rem,
    Percent,
    Vw,
    Vh,
    Vi,
    Vb,
    Vmin,
    Vmax,
    Deg,
    Rad,
    Grad,
    Turn,
    S,
    Ms,
    Hz,
    Khz,
    Dpi,
    Dpcm,
    Dppx,
    Fr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Number,
    AbsoluteLength,
    FontRelative,
    ViewportRelative,
    Percentage,
    Angle,
    Time,
    Frequency,
    Resolution,
    Flex,
}

impl CssUnit {
    pub fn parse(unit: &str) -> Option<CssUnit> {
        let lower = unit.to_ascii_lowercase();
        Some(match lower.as_str() {
            "px" => CssUnit::Px,
            "pt" => CssUnit::Pt,
            "pc" => CssUnit::Pc,
            "in" => CssUnit::In,
            "cm" => CssUnit::Cm,
            "mm" => CssUnit::Mm,
            "q" => CssUnit::Q,
            "em" => CssUnit::Em,
            "ex" => CssUnit::Ex,
            "ch" => CssUnit::Ch,
            "ic" => CssUnit::Ic,
            "cap" => CssUnit::Cap,
            "lh" => CssUnit::Lh,
            "rlh" => CssUnit::Rlh,
            "rem" => CssUnit::Rem,
            "vw" => CssUnit::Vw,
            "vh" => CssUnit::Vh,
            "vi" => CssUnit::Vi,
            "vb" => CssUnit::Vb,
            "vmin" => CssUnit::Vmin,
            "vmax" => CssUnit::Vmax,
            "deg" => CssUnit::Deg,
            "rad" => CssUnit::Rad,
            "grad" => CssUnit::Grad,
            "turn" => CssUnit::Turn,
            "s" => CssUnit::S,
            "ms" => CssUnit::Ms,
            "hz" => CssUnit::Hz,
            "khz" => CssUnit::Khz,
            "dpi" => CssUnit::Dpi,
            "dpcm" => CssUnit::Dpcm,
            "dppx" => CssUnit::Dppx,
            "fr" => CssUnit::Fr,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CssUnit::None => "",
            CssUnit::Px => "px",
            CssUnit::Pt => "pt",
            CssUnit::Pc => "pc",
            CssUnit::In => "in",
            CssUnit::Cm => "cm",
            CssUnit::Mm => "mm",
            CssUnit::Q => "q",
            CssUnit::Em => "em",
            CssUnit::Ex => "ex",
            CssUnit::Ch => "ch",
            CssUnit::Ic => "ic",
            CssUnit::Cap => "cap",
            CssUnit::Lh => "lh",
            CssUnit::Rlh => "rlh",
            CssUnit::Rem => "rem",
            CssUnit::Percent => "%",
            CssUnit::Vw => "vw",
            CssUnit::Vh => "vh",
            CssUnit::Vi => "vi",
            CssUnit::Vb => "vb",
            CssUnit::Vmin => "vmin",
            CssUnit::Vmax => "vmax",
            CssUnit::Deg => "deg",
            CssUnit::Rad => "rad",
            CssUnit::Grad => "grad",
            CssUnit::Turn => "turn",
            CssUnit::S => "s",
            CssUnit::Ms => "ms",
            CssUnit::Hz => "hz",
            CssUnit::Khz => "khz",
            CssUnit::Dpi => "dpi",
            CssUnit::Dpcm => "dpcm",
            CssUnit::Dppx => "dppx",
            CssUnit::Fr => "fr",
        }
    }

    pub fn category(self) -> UnitCategory {
        match self {
            CssUnit::None => UnitCategory::Number,
            CssUnit::Px | CssUnit::Pt | CssUnit::Pc | CssUnit::In | CssUnit::Cm | CssUnit::Mm
            | CssUnit::Q => UnitCategory::AbsoluteLength,
            CssUnit::Em | CssUnit::Ex | CssUnit::Ch | CssUnit::Ic | CssUnit::Cap | CssUnit::Lh
            | CssUnit::Rlh | CssUnit::Rem => UnitCategory::FontRelative,
            CssUnit::Percent => UnitCategory::Percentage,
            CssUnit::Vw | CssUnit::Vh | CssUnit::Vi | CssUnit::Vb | CssUnit::Vmin
            | CssUnit::Vmax => UnitCategory::ViewportRelative,
            CssUnit::Deg | CssUnit::Rad | CssUnit::Grad | CssUnit::Turn => UnitCategory::Angle,
            CssUnit::S | CssUnit::Ms => UnitCategory::Time,
            CssUnit::Hz | CssUnit::Khz => UnitCategory::Frequency,
            CssUnit::Dpi | CssUnit::Dpcm | CssUnit::Dppx => UnitCategory::Resolution,
            CssUnit::Fr => UnitCategory::Flex,
        }
    }

    pub fn is_length(self) -> bool {
        matches!(
            self.category(),
            UnitCategory::AbsoluteLength | UnitCategory::FontRelative | UnitCategory::ViewportRelative
        )
    }

    /// Factor to the category's canonical unit (pt, deg, s, hz, dppx).
    /// Relative categories have no static factor.
    fn canonical_factor(self) -> Option<f64> {
        Some(match self {
            CssUnit::Px => 0.75,
            CssUnit::Pt => 1.0,
            CssUnit::Pc => 12.0,
            CssUnit::In => 72.0,
            CssUnit::Cm => 72.0 / 2.54,
            CssUnit::Mm => 72.0 / 25.4,
            CssUnit::Q => 72.0 / 101.6,
            CssUnit::Deg => 1.0,
            CssUnit::Rad => 180.0 / std::f64::consts::PI,
            CssUnit::Grad => 0.9,
            CssUnit::Turn => 360.0,
            CssUnit::S => 1.0,
            CssUnit::Ms => 0.001,
            CssUnit::Hz => 1.0,
            CssUnit::Khz => 1000.0,
            CssUnit::Dppx => 1.0,
            CssUnit::Dpi => 1.0 / 96.0,
            CssUnit::Dpcm => 2.54 / 96.0,
            _ => return None,
        })
    }
}

/// Convert a numeric value between compatible units. Identity conversions
/// always succeed; cross-category requests and relative units without a
/// static ratio fail with `UnitMismatch`.
pub fn convert_unit(value: f32, from: CssUnit, to: CssUnit) -> Result<f32> {
    if from == to {
        return Ok(value);
    }
    if from.category() == to.category() {
        if let (Some(from_factor), Some(to_factor)) = (from.canonical_factor(), to.canonical_factor())
        {
            return Ok((value as f64 * from_factor / to_factor) as f32);
        }
    }
    Err(CascataError::Style(StyleError::UnitMismatch {
        wanted: to.as_str().to_string(),
        got: from.as_str().to_string(),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Rgba {
        Rgba { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Rgba {
        Rgba { r, g, b, a }
    }

    pub fn from_hex(hex: &str) -> Option<Rgba> {
        let digits = hex.as_bytes();
        let nibble = |b: u8| -> Option<u8> {
            match b {
                b'0'..=b'9' => Some(b - b'0'),
                b'a'..=b'f' => Some(b - b'a' + 10),
                b'A'..=b'F' => Some(b - b'A' + 10),
                _ => None,
            }
        };
        match digits.len() {
            3 | 4 => {
                let r = nibble(digits[0])?;
                let g = nibble(digits[1])?;
                let b = nibble(digits[2])?;
                let a = if digits.len() == 4 {
                    nibble(digits[3])? as f32 * 17.0 / 255.0
                } else {
                    1.0
                };
                Some(Rgba::rgba(r * 17, g * 17, b * 17, a))
            }
            6 | 8 => {
                let r = nibble(digits[0])? * 16 + nibble(digits[1])?;
                let g = nibble(digits[2])? * 16 + nibble(digits[3])?;
                let b = nibble(digits[4])? * 16 + nibble(digits[5])?;
                let a = if digits.len() == 8 {
                    (nibble(digits[6])? * 16 + nibble(digits[7])?) as f32 / 255.0
                } else {
                    1.0
                };
                Some(Rgba::rgba(r, g, b, a))
            }
            _ => None,
        }
    }

    fn short_hex(self) -> Option<String> {
        if self.a < 1.0 {
            return None;
        }
        let collapsible = |v: u8| v % 17 == 0;
        if collapsible(self.r) && collapsible(self.g) && collapsible(self.b) {
            Some(format!(
                "#{:x}{:x}{:x}",
                self.r / 17,
                self.g / 17,
                self.b / 17
            ))
        } else {
            None
        }
    }

    pub fn to_css_text(self) -> String {
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({}, {}, {}, {})",
                self.r,
                self.g,
                self.b,
                fmt_number(self.a, NumberForm::Canonical)
            )
        }
    }

    /// Shortest equivalent: named form, then #rgb, then #rrggbb, then rgba().
    pub fn to_minified_css_text(self) -> String {
        if self.a >= 1.0 {
            let long = format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b);
            let short = self.short_hex();
            let named = color_name(self);
            let mut best = long;
            if let Some(short) = short {
                if short.len() <= best.len() {
                    best = short;
                }
            }
            if let Some(named) = named {
                if named.len() <= best.len() {
                    best = named.to_string();
                }
            }
            best
        } else if self.a <= 0.0 && self.r == 0 && self.g == 0 && self.b == 0 {
            "transparent".to_string()
        } else {
            format!(
                "rgba({},{},{},{})",
                self.r,
                self.g,
                self.b,
                fmt_number(self.a, NumberForm::Minified)
            )
        }
    }
}

pub fn named_color(name: &str) -> Option<Rgba> {
    let lower = name.to_ascii_lowercase();
    Some(match lower.as_str() {
        "aliceblue" => Rgba::rgb(240, 248, 255),
        "antiquewhite" => Rgba::rgb(250, 235, 215),
        "aqua" => Rgba::rgb(0, 255, 255),
        "aquamarine" => Rgba::rgb(127, 255, 212),
        "azure" => Rgba::rgb(240, 255, 255),
        "beige" => Rgba::rgb(245, 245, 220),
        "bisque" => Rgba::rgb(255, 228, 196),
        "black" => Rgba::BLACK,
        "blanchedalmond" => Rgba::rgb(255, 235, 205),
        "blue" => Rgba::rgb(0, 0, 255),
        "blueviolet" => Rgba::rgb(138, 43, 226),
        "brown" => Rgba::rgb(165, 42, 42),
        "burlywood" => Rgba::rgb(222, 184, 135),
        "cadetblue" => Rgba::rgb(95, 158, 160),
        "chartreuse" => Rgba::rgb(127, 255, 0),
        "chocolate" => Rgba::rgb(210, 105, 30),
        "coral" => Rgba::rgb(255, 127, 80),
        "cornflowerblue" => Rgba::rgb(100, 149, 237),
        "cornsilk" => Rgba::rgb(255, 248, 220),
        "crimson" => Rgba::rgb(220, 20, 60),
        "cyan" => Rgba::rgb(0, 255, 255),
        "darkblue" => Rgba::rgb(0, 0, 139),
        "darkcyan" => Rgba::rgb(0, 139, 139),
        "darkgoldenrod" => Rgba::rgb(184, 134, 11),
        "darkgray" | "darkgrey" => Rgba::rgb(169, 169, 169),
        "darkgreen" => Rgba::rgb(0, 100, 0),
        "darkkhaki" => Rgba::rgb(189, 183, 107),
        "darkmagenta" => Rgba::rgb(139, 0, 139),
        "darkolivegreen" => Rgba::rgb(85, 107, 47),
        "darkorange" => Rgba::rgb(255, 140, 0),
        "darkorchid" => Rgba::rgb(153, 50, 204),
        "darkred" => Rgba::rgb(139, 0, 0),
        "darksalmon" => Rgba::rgb(233, 150, 122),
        "darkseagreen" => Rgba::rgb(143, 188, 143),
        "darkslateblue" => Rgba::rgb(72, 61, 139),
        "darkslategray" | "darkslategrey" => Rgba::rgb(47, 79, 79),
        "darkturquoise" => Rgba::rgb(0, 206, 209),
        "darkviolet" => Rgba::rgb(148, 0, 211),
        "deeppink" => Rgba::rgb(255, 20, 147),
        "deepskyblue" => Rgba::rgb(0, 191, 255),
        "dimgray" | "dimgrey" => Rgba::rgb(105, 105, 105),
        "dodgerblue" => Rgba::rgb(30, 144, 255),
        "firebrick" => Rgba::rgb(178, 34, 34),
        "floralwhite" => Rgba::rgb(255, 250, 240),
        "forestgreen" => Rgba::rgb(34, 139, 34),
        "fuchsia" => Rgba::rgb(255, 0, 255),
        "gainsboro" => Rgba::rgb(220, 220, 220),
        "ghostwhite" => Rgba::rgb(248, 248, 255),
        "gold" => Rgba::rgb(255, 215, 0),
        "goldenrod" => Rgba::rgb(218, 165, 32),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "green" => Rgba::rgb(0, 128, 0),
        "greenyellow" => Rgba::rgb(173, 255, 47),
        "honeydew" => Rgba::rgb(240, 255, 240),
        "hotpink" => Rgba::rgb(255, 105, 180),
        "indianred" => Rgba::rgb(205, 92, 92),
        "indigo" => Rgba::rgb(75, 0, 130),
        "ivory" => Rgba::rgb(255, 255, 240),
        "khaki" => Rgba::rgb(240, 230, 140),
        "lavender" => Rgba::rgb(230, 230, 250),
        "lavenderblush" => Rgba::rgb(255, 240, 245),
        "lawngreen" => Rgba::rgb(124, 252, 0),
        "lemonchiffon" => Rgba::rgb(255, 250, 205),
        "lightblue" => Rgba::rgb(173, 216, 230),
        "lightcoral" => Rgba::rgb(240, 128, 128),
        "lightcyan" => Rgba::rgb(224, 255, 255),
        "lightgoldenrodyellow" => Rgba::rgb(250, 250, 210),
        "lightgray" | "lightgrey" => Rgba::rgb(211, 211, 211),
        "lightgreen" => Rgba::rgb(144, 238, 144),
        "lightpink" => Rgba::rgb(255, 182, 193),
        "lightsalmon" => Rgba::rgb(255, 160, 122),
        "lightseagreen" => Rgba::rgb(32, 178, 170),
        "lightskyblue" => Rgba::rgb(135, 206, 250),
        "lightslategray" | "lightslategrey" => Rgba::rgb(119, 136, 153),
        "lightsteelblue" => Rgba::rgb(176, 196, 222),
        "lightyellow" => Rgba::rgb(255, 255, 224),
        "lime" => Rgba::rgb(0, 255, 0),
        "limegreen" => Rgba::rgb(50, 205, 50),
        "linen" => Rgba::rgb(250, 240, 230),
        "magenta" => Rgba::rgb(255, 0, 255),
        "maroon" => Rgba::rgb(128, 0, 0),
        "mediumaquamarine" => Rgba::rgb(102, 205, 170),
        "mediumblue" => Rgba::rgb(0, 0, 205),
        "mediumorchid" => Rgba::rgb(186, 85, 211),
        "mediumpurple" => Rgba::rgb(147, 112, 219),
        "mediumseagreen" => Rgba::rgb(60, 179, 113),
        "mediumslateblue" => Rgba::rgb(123, 104, 238),
        "mediumspringgreen" => Rgba::rgb(0, 250, 154),
        "mediumturquoise" => Rgba::rgb(72, 209, 204),
        "mediumvioletred" => Rgba::rgb(199, 21, 133),
        "midnightblue" => Rgba::rgb(25, 25, 112),
        "mintcream" => Rgba::rgb(245, 255, 250),
        "mistyrose" => Rgba::rgb(255, 228, 225),
        "moccasin" => Rgba::rgb(255, 228, 181),
        "navajowhite" => Rgba::rgb(255, 222, 173),
        "navy" => Rgba::rgb(0, 0, 128),
        "oldlace" => Rgba::rgb(253, 245, 230),
        "olive" => Rgba::rgb(128, 128, 0),
        "olivedrab" => Rgba::rgb(107, 142, 35),
        "orange" => Rgba::rgb(255, 165, 0),
        "orangered" => Rgba::rgb(255, 69, 0),
        "orchid" => Rgba::rgb(218, 112, 214),
        "palegoldenrod" => Rgba::rgb(238, 232, 170),
        "palegreen" => Rgba::rgb(152, 251, 152),
        "paleturquoise" => Rgba::rgb(175, 238, 238),
        "palevioletred" => Rgba::rgb(219, 112, 147),
        "papayawhip" => Rgba::rgb(255, 239, 213),
        "peachpuff" => Rgba::rgb(255, 218, 185),
        "peru" => Rgba::rgb(205, 133, 63),
        "pink" => Rgba::rgb(255, 192, 203),
        "plum" => Rgba::rgb(221, 160, 221),
        "powderblue" => Rgba::rgb(176, 224, 230),
        "purple" => Rgba::rgb(128, 0, 128),
        "rebeccapurple" => Rgba::rgb(102, 51, 153),
        "red" => Rgba::rgb(255, 0, 0),
        "rosybrown" => Rgba::rgb(188, 143, 143),
        "royalblue" => Rgba::rgb(65, 105, 225),
        "saddlebrown" => Rgba::rgb(139, 69, 19),
        "salmon" => Rgba::rgb(250, 128, 114),
        "sandybrown" => Rgba::rgb(244, 164, 96),
        "seagreen" => Rgba::rgb(46, 139, 87),
        "seashell" => Rgba::rgb(255, 245, 238),
        "sienna" => Rgba::rgb(160, 82, 45),
        "silver" => Rgba::rgb(192, 192, 192),
        "skyblue" => Rgba::rgb(135, 206, 235),
        "slateblue" => Rgba::rgb(106, 90, 205),
        "slategray" | "slategrey" => Rgba::rgb(112, 128, 144),
        "snow" => Rgba::rgb(255, 250, 250),
        "springgreen" => Rgba::rgb(0, 255, 127),
        "steelblue" => Rgba::rgb(70, 130, 180),
        "tan" => Rgba::rgb(210, 180, 140),
        "teal" => Rgba::rgb(0, 128, 128),
        "thistle" => Rgba::rgb(216, 191, 216),
        "tomato" => Rgba::rgb(255, 99, 71),
        "turquoise" => Rgba::rgb(64, 224, 208),
        "violet" => Rgba::rgb(238, 130, 238),
        "wheat" => Rgba::rgb(245, 222, 179),
        "white" => Rgba::WHITE,
        "whitesmoke" => Rgba::rgb(245, 245, 245),
        "yellow" => Rgba::rgb(255, 255, 0),
        "yellowgreen" => Rgba::rgb(154, 205, 50),
        "transparent" => Rgba::TRANSPARENT,
        _ => return None,
    })
}

/// Reverse lookup for minification. Only names that can beat their hex form
/// are listed; seven-letter names tie with #rrggbb and win on preference.
fn color_name(color: Rgba) -> Option<&'static str> {
    if color.a < 1.0 {
        return None;
    }
    Some(match (color.r, color.g, color.b) {
        (255, 0, 0) => "red",
        (210, 180, 140) => "tan",
        (0, 255, 255) => "cyan",
        (0, 0, 255) => "blue",
        (255, 215, 0) => "gold",
        (128, 128, 128) => "gray",
        (0, 255, 0) => "lime",
        (0, 0, 128) => "navy",
        (205, 133, 63) => "peru",
        (255, 192, 203) => "pink",
        (221, 160, 221) => "plum",
        (255, 250, 250) => "snow",
        (0, 128, 128) => "teal",
        (240, 255, 255) => "azure",
        (245, 245, 220) => "beige",
        (0, 0, 0) => "black",
        (165, 42, 42) => "brown",
        (255, 127, 80) => "coral",
        (0, 128, 0) => "green",
        (255, 255, 240) => "ivory",
        (240, 230, 140) => "khaki",
        (250, 240, 230) => "linen",
        (128, 128, 0) => "olive",
        (245, 222, 179) => "wheat",
        (255, 255, 255) => "white",
        (255, 228, 196) => "bisque",
        (75, 0, 130) => "indigo",
        (128, 0, 0) => "maroon",
        (255, 165, 0) => "orange",
        (218, 112, 214) => "orchid",
        (128, 0, 128) => "purple",
        (250, 128, 114) => "salmon",
        (160, 82, 45) => "sienna",
        (192, 192, 192) => "silver",
        (255, 99, 71) => "tomato",
        (238, 130, 238) => "violet",
        (220, 20, 60) => "crimson",
        (139, 0, 0) => "darkred",
        (105, 105, 105) => "dimgray",
        (255, 0, 255) => "magenta",
        (255, 105, 180) => "hotpink",
        (253, 245, 230) => "oldlace",
        (135, 206, 235) => "skyblue",
        (216, 191, 216) => "thistle",
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSeparator {
    Space,
    Comma,
    Layer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    #[default]
    Double,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializeOptions {
    pub quote: QuoteStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberForm {
    Canonical,
    Minified,
}

/// Typed CSS component value. `Op` only ever appears inside `Function`
/// arguments and slash-separated positions of space lists, carrying the
/// punctuation needed to round-trip `calc()` and shorthand syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number { value: f32, unit: CssUnit },
    Ident(String),
    String(String),
    Uri(String),
    Color(Rgba),
    Function { name: String, args: Vec<PropertyValue> },
    List { values: Vec<PropertyValue>, separator: ListSeparator },
    Op(char),
    Inherit,
    Initial,
    Unset,
    Revert,
}

impl PropertyValue {
    pub fn number(value: f32) -> PropertyValue {
        PropertyValue::Number {
            value,
            unit: CssUnit::None,
        }
    }

    pub fn dimension(value: f32, unit: CssUnit) -> PropertyValue {
        PropertyValue::Number { value, unit }
    }

    pub fn ident(name: impl Into<String>) -> PropertyValue {
        PropertyValue::Ident(name.into())
    }

    /// Parse a full declaration value from text. Comma-separated groups
    /// become a comma list; whitespace-separated components a space list.
    pub fn parse_str(text: &str) -> Result<PropertyValue> {
        let mut input = ParserInput::new(text);
        let mut parser = Parser::new(&mut input);
        let value = Self::parse(&mut parser)?;
        if !parser.is_exhausted() {
            return Err(invalid_at(&parser, "unexpected trailing input"));
        }
        Ok(value)
    }

    pub fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<PropertyValue> {
        let mut groups: Vec<PropertyValue> = Vec::new();
        let mut current: Vec<PropertyValue> = Vec::new();
        loop {
            if parser.is_exhausted() {
                break;
            }
            let location = parser.current_source_location();
            let token = match parser.next() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };
            match token {
                Token::Comma => {
                    groups.push(collapse_group(std::mem::take(&mut current), location)?);
                }
                token => {
                    let value = parse_component(parser, token)?;
                    current.push(value);
                }
            }
        }
        if groups.is_empty() {
            let location = cssparser::SourceLocation { line: 0, column: 0 };
            let single = collapse_group(current, location)?;
            return Ok(normalize_global(single));
        }
        let location = cssparser::SourceLocation { line: 0, column: 0 };
        groups.push(collapse_group(current, location)?);
        Ok(PropertyValue::List {
            values: groups,
            separator: ListSeparator::Comma,
        })
    }

    pub fn to_css_text(&self) -> String {
        self.to_css_text_with(&SerializeOptions::default())
    }

    pub fn to_css_text_with(&self, options: &SerializeOptions) -> String {
        let mut out = String::new();
        write_value(&mut out, self, NumberForm::Canonical, options, false);
        out
    }

    pub fn to_minified_css_text(&self) -> String {
        let mut out = String::new();
        write_value(
            &mut out,
            self,
            NumberForm::Minified,
            &SerializeOptions::default(),
            false,
        );
        out
    }

    /// Numeric conversion against a target unit, per the fixed ratios of the
    /// unit's category.
    pub fn float_value(&self, target: CssUnit) -> Result<f32> {
        match self {
            PropertyValue::Number { value, unit } => convert_unit(*value, *unit, target),
            other => Err(CascataError::Style(StyleError::UnitMismatch {
                wanted: target.as_str().to_string(),
                got: format!("{}", ValueKind(other)),
            })),
        }
    }

    pub fn is_global_keyword(&self) -> bool {
        matches!(
            self,
            PropertyValue::Inherit
                | PropertyValue::Initial
                | PropertyValue::Unset
                | PropertyValue::Revert
        )
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            PropertyValue::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<(f32, CssUnit)> {
        match self {
            PropertyValue::Number { value, unit } => Some((*value, *unit)),
            _ => None,
        }
    }

    /// Splits `var(--name, fallback)` into its name and fallback values.
    pub fn as_var(&self) -> Option<(&str, Option<&[PropertyValue]>)> {
        let PropertyValue::Function { name, args } = self else {
            return None;
        };
        if !name.eq_ignore_ascii_case("var") {
            return None;
        }
        let var_name = args.first()?.as_ident()?;
        if !var_name.starts_with("--") {
            return None;
        }
        let fallback = args
            .iter()
            .position(|a| matches!(a, PropertyValue::Op(',')))
            .map(|idx| &args[idx + 1..]);
        Some((var_name, fallback))
    }

    /// True when a `var()` reference occurs anywhere in the value.
    pub fn contains_var(&self) -> bool {
        match self {
            PropertyValue::Function { name, args } => {
                name.eq_ignore_ascii_case("var") || args.iter().any(|a| a.contains_var())
            }
            PropertyValue::List { values, .. } => values.iter().any(|v| v.contains_var()),
            _ => false,
        }
    }

    /// Iterates the layers of a comma or layered list, or the value itself.
    pub fn layers(&self) -> Vec<&PropertyValue> {
        match self {
            PropertyValue::List {
                values,
                separator: ListSeparator::Comma | ListSeparator::Layer,
            } => values.iter().collect(),
            other => vec![other],
        }
    }

    /// Iterates the space-separated components of the value, or the value
    /// itself when it is not a space list.
    pub fn components(&self) -> Vec<&PropertyValue> {
        match self {
            PropertyValue::List {
                values,
                separator: ListSeparator::Space,
            } => values.iter().collect(),
            other => vec![other],
        }
    }
}

struct ValueKind<'a>(&'a PropertyValue);

impl std::fmt::Display for ValueKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.0 {
            PropertyValue::Number { .. } => "number",
            PropertyValue::Ident(_) => "identifier",
            PropertyValue::String(_) => "string",
            PropertyValue::Uri(_) => "uri",
            PropertyValue::Color(_) => "color",
            PropertyValue::Function { .. } => "function",
            PropertyValue::List { .. } => "list",
            PropertyValue::Op(_) => "operator",
            PropertyValue::Inherit => "inherit",
            PropertyValue::Initial => "initial",
            PropertyValue::Unset => "unset",
            PropertyValue::Revert => "revert",
        };
        f.write_str(kind)
    }
}

fn invalid_at(parser: &Parser, message: &str) -> CascataError {
    let location = parser.current_source_location();
    CascataError::Parse(ParseError::InvalidCss {
        message: message.to_string(),
        line: location.line,
        column: location.column,
    })
}

fn collapse_group(
    mut values: Vec<PropertyValue>,
    location: cssparser::SourceLocation,
) -> Result<PropertyValue> {
    match values.len() {
        0 => Err(CascataError::Parse(ParseError::InvalidCss {
            message: "empty value".to_string(),
            line: location.line,
            column: location.column,
        })),
        1 => Ok(values.remove(0)),
        _ => Ok(PropertyValue::List {
            values,
            separator: ListSeparator::Space,
        }),
    }
}

/// A lone global keyword becomes its marker variant; inside longer values the
/// identifier spelling is preserved.
fn normalize_global(value: PropertyValue) -> PropertyValue {
    if let PropertyValue::Ident(name) = &value {
        match name.to_ascii_lowercase().as_str() {
            "inherit" => return PropertyValue::Inherit,
            "initial" => return PropertyValue::Initial,
            "unset" => return PropertyValue::Unset,
            "revert" => return PropertyValue::Revert,
            _ => {}
        }
    }
    value
}

fn parse_component<'i>(parser: &mut Parser<'i, '_>, token: Token<'i>) -> Result<PropertyValue> {
    match token {
        Token::Number { value, .. } => Ok(PropertyValue::number(value)),
        Token::Percentage { unit_value, .. } => Ok(PropertyValue::Number {
            value: unit_value * 100.0,
            unit: CssUnit::Percent,
        }),
        Token::Dimension { value, unit, .. } => match CssUnit::parse(&unit) {
            Some(unit) => Ok(PropertyValue::Number { value, unit }),
            None => Err(invalid_at(parser, &format!("unknown unit '{unit}'"))),
        },
        Token::Ident(name) => Ok(PropertyValue::Ident(name.to_string())),
        Token::QuotedString(text) => Ok(PropertyValue::String(text.to_string())),
        Token::UnquotedUrl(url) => Ok(PropertyValue::Uri(url.to_string())),
        Token::Hash(hex) | Token::IDHash(hex) => match Rgba::from_hex(&hex) {
            Some(color) => Ok(PropertyValue::Color(color)),
            None => Err(invalid_at(parser, &format!("invalid hex color '#{hex}'"))),
        },
        Token::Delim(op @ ('/' | '+' | '-' | '*')) => Ok(PropertyValue::Op(op)),
        Token::Function(name) => {
            let name = name.to_string();
            if name.eq_ignore_ascii_case("url") {
                let url = parser
                    .parse_nested_block(|p| {
                        let url = p.expect_string()?.to_string();
                        Ok::<_, cssparser::ParseError<()>>(url)
                    })
                    .map_err(|_| invalid_at(parser, "invalid url()"))?;
                return Ok(PropertyValue::Uri(url));
            }
            let args = parse_function_args(parser)?;
            if name.eq_ignore_ascii_case("rgb") || name.eq_ignore_ascii_case("rgba") {
                if let Some(color) = color_from_args(&args) {
                    return Ok(PropertyValue::Color(color));
                }
            }
            Ok(PropertyValue::Function { name, args })
        }
        Token::ParenthesisBlock => {
            let args = parse_function_args(parser)?;
            Ok(PropertyValue::Function {
                name: String::new(),
                args,
            })
        }
        _ => Err(invalid_at(parser, "unexpected token")),
    }
}

fn parse_function_args<'i>(parser: &mut Parser<'i, '_>) -> Result<Vec<PropertyValue>> {
    let args = parser.parse_nested_block(|p| {
        let mut args: Vec<PropertyValue> = Vec::new();
        loop {
            if p.is_exhausted() {
                break;
            }
            let token = match p.next() {
                Ok(token) => token.clone(),
                Err(_) => break,
            };
            match token {
                Token::Comma => args.push(PropertyValue::Op(',')),
                token => match parse_component(p, token) {
                    Ok(value) => args.push(value),
                    Err(err) => {
                        return Err(p.new_custom_error(err));
                    }
                },
            }
        }
        Ok::<_, cssparser::ParseError<CascataError>>(args)
    });
    match args {
        Ok(args) => Ok(args),
        Err(err) => match err.kind {
            cssparser::ParseErrorKind::Custom(custom) => Err(custom),
            _ => Err(CascataError::Parse(ParseError::InvalidCss {
                message: "invalid function arguments".to_string(),
                line: err.location.line,
                column: err.location.column,
            })),
        },
    }
}

/// Legacy rgb()/rgba() argument lists with plain numbers or percentages.
/// Anything else (var() inside, modern slash syntax) stays a Function.
fn color_from_args(args: &[PropertyValue]) -> Option<Rgba> {
    let parts: Vec<&PropertyValue> = args
        .iter()
        .filter(|a| !matches!(a, PropertyValue::Op(',')))
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |value: &PropertyValue| -> Option<u8> {
        match value {
            PropertyValue::Number {
                value,
                unit: CssUnit::None,
            } => Some(value.round().clamp(0.0, 255.0) as u8),
            PropertyValue::Number {
                value,
                unit: CssUnit::Percent,
            } => Some((value / 100.0 * 255.0).round().clamp(0.0, 255.0) as u8),
            _ => None,
        }
    };
    let r = channel(parts[0])?;
    let g = channel(parts[1])?;
    let b = channel(parts[2])?;
    let a = if parts.len() == 4 {
        match parts[3] {
            PropertyValue::Number {
                value,
                unit: CssUnit::None,
            } => value.clamp(0.0, 1.0),
            PropertyValue::Number {
                value,
                unit: CssUnit::Percent,
            } => (value / 100.0).clamp(0.0, 1.0),
            _ => return None,
        }
    } else {
        1.0
    };
    Some(Rgba::rgba(r, g, b, a))
}

fn fmt_number(value: f32, form: NumberForm) -> String {
    let rounded = (value as f64 * 100000.0).round() / 100000.0;
    let mut text = if rounded == rounded.trunc() && rounded.abs() < 1.0e9 {
        format!("{}", rounded as i64)
    } else {
        let mut text = format!("{rounded:.5}");
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
        text
    };
    if form == NumberForm::Minified {
        if let Some(stripped) = text.strip_prefix("0.") {
            text = format!(".{stripped}");
        } else if let Some(stripped) = text.strip_prefix("-0.") {
            text = format!("-.{stripped}");
        }
    }
    text
}

fn write_string(out: &mut String, text: &str, options: &SerializeOptions) {
    let quote = match options.quote {
        QuoteStyle::Double => '"',
        QuoteStyle::Single => '\'',
    };
    out.push(quote);
    for ch in text.chars() {
        if ch == quote || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push(quote);
}

fn write_value(
    out: &mut String,
    value: &PropertyValue,
    form: NumberForm,
    options: &SerializeOptions,
    spaced_ops: bool,
) {
    match value {
        PropertyValue::Number { value, unit } => {
            out.push_str(&fmt_number(*value, form));
            out.push_str(unit.as_str());
        }
        PropertyValue::Ident(name) => {
            let _ = cssparser::serialize_identifier(name, out);
        }
        PropertyValue::String(text) => write_string(out, text, options),
        PropertyValue::Uri(url) => {
            out.push_str("url(");
            write_string(out, url, options);
            out.push(')');
        }
        PropertyValue::Color(color) => match form {
            NumberForm::Canonical => out.push_str(&color.to_css_text()),
            NumberForm::Minified => out.push_str(&color.to_minified_css_text()),
        },
        PropertyValue::Function { name, args } => {
            let _ = cssparser::serialize_identifier(name, out);
            out.push('(');
            let spaced = name.eq_ignore_ascii_case("calc") || name.is_empty();
            write_args(out, args, form, options, spaced);
            out.push(')');
        }
        PropertyValue::List { values, separator } => match separator {
            ListSeparator::Space => write_args(out, values, form, options, spaced_ops),
            ListSeparator::Comma | ListSeparator::Layer => {
                for (idx, item) in values.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                        if form == NumberForm::Canonical {
                            out.push(' ');
                        }
                    }
                    write_value(out, item, form, options, spaced_ops);
                }
            }
        },
        PropertyValue::Op(op) => out.push(*op),
        PropertyValue::Inherit => out.push_str("inherit"),
        PropertyValue::Initial => out.push_str("initial"),
        PropertyValue::Unset => out.push_str("unset"),
        PropertyValue::Revert => out.push_str("revert"),
    }
}

/// Writes a run of components with the spacing rules punctuation needs:
/// commas bind tight on the left, slashes bind tight both ways outside
/// calc(), and arithmetic operators inside calc() keep both spaces.
fn write_args(
    out: &mut String,
    args: &[PropertyValue],
    form: NumberForm,
    options: &SerializeOptions,
    spaced_ops: bool,
) {
    let mut pending_space = false;
    for arg in args {
        match arg {
            PropertyValue::Op(',') => {
                out.push(',');
                pending_space = form == NumberForm::Canonical;
            }
            PropertyValue::Op(op) => {
                if spaced_ops {
                    out.push(' ');
                    out.push(*op);
                    pending_space = true;
                } else {
                    out.push(*op);
                    pending_space = false;
                }
            }
            value => {
                if pending_space {
                    out.push(' ');
                }
                write_value(out, value, form, options, spaced_ops);
                pending_space = true;
            }
        }
    }
}

mod compute;
mod debug;
mod declaration;
mod dom;
mod error;
mod matcher;
mod selector;
mod shorthand;
mod types;
mod value;

pub use compute::{ComputedStyle, DeviceInfo, ResolutionContext, StyleResolver};
pub use debug::DebugLogger;
pub use declaration::{CompatTag, Declaration, ParserFlags, StyleDeclaration};
pub use dom::{DomAdapter, NoState, StateProvider};
pub use error::{CascataError, Issue, ParseError, Result, Severity, StyleError};
pub use matcher::{MatchContext, matches};
pub use selector::{
    AttrOp, AttrSelector, Combinator, NthKind, PseudoClass, RelativeSelector, SelectorList,
    SelectorPattern, SimpleSelector, Specificity,
};
pub use types::{Pt, Size};
pub use value::{
    CssUnit, ListSeparator, PropertyValue, QuoteStyle, Rgba, SerializeOptions, UnitCategory,
    convert_unit, named_color,
};

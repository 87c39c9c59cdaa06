use std::fmt::Debug;
use std::hash::Hash;

/// DOM access for selector matching and style resolution. Implement this for
/// your document layer; the crate never stores or mutates tree state itself.
///
/// `element_id` decides which attribute `#id` selectors read, so adapters for
/// non-HTML trees can designate their own id attribute.
pub trait DomAdapter {
    type Handle: Copy + Eq + Hash + Debug;

    fn parent(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Nearest preceding sibling that is an element; text and comment nodes
    /// are invisible to matching.
    fn previous_sibling_element(&self, element: Self::Handle) -> Option<Self::Handle>;

    /// Element children in document order.
    fn children(&self, element: Self::Handle) -> Vec<Self::Handle>;

    /// Tag name in ASCII lowercase.
    fn tag_name(&self, element: Self::Handle) -> &str;

    fn element_id(&self, element: Self::Handle) -> Option<&str>;

    fn has_class(&self, element: Self::Handle, class: &str) -> bool;

    /// All class names on the element. Feeds the rule index; matching goes
    /// through `has_class`.
    fn classes(&self, element: Self::Handle) -> Vec<String>;

    fn attr(&self, element: Self::Handle, name: &str) -> Option<&str>;

    /// True when the element has child nodes of any kind, including
    /// non-whitespace text. Drives `:empty`.
    fn has_content(&self, element: Self::Handle) -> bool;

    /// True when the element has no child elements and its text content is
    /// empty or whitespace. Drives `:blank`; the default collapses it to
    /// `:empty` for adapters that cannot see raw text nodes.
    fn is_blank(&self, element: Self::Handle) -> bool {
        !self.has_content(element)
    }

    fn is_root(&self, element: Self::Handle) -> bool {
        self.parent(element).is_none()
    }

    /// 0-based position among the parent's element children. The root is 0.
    fn element_index(&self, element: Self::Handle) -> usize {
        let Some(parent) = self.parent(element) else {
            return 0;
        };
        self.children(parent)
            .iter()
            .position(|&c| c == element)
            .unwrap_or(0)
    }
}

/// Supplies dynamic pseudo-class state (`:hover`, `:focus`, `:checked`
/// overrides and the rest) from the embedding UI layer. The matcher asks by
/// pseudo-class name without the leading colon.
pub trait StateProvider<H> {
    fn is_active(&self, element: H, state: &str) -> bool;
}

/// Default provider: no dynamic state is ever active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoState;

impl<H> StateProvider<H> for NoState {
    fn is_active(&self, _element: H, _state: &str) -> bool {
        false
    }
}

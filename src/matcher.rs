//! Selector matching against a caller-provided element tree.
//!
//! Compound selectors are tested right to left: the rightmost compound must
//! match the candidate element, then each combinator walks to ancestor or
//! sibling candidates for the compound to its left. Descendant and
//! subsequent-sibling combinators retry every candidate, so patterns like
//! `a > b c` still match when the nearest `b` ancestor fails the `a` check
//! but a farther one passes.

use crate::dom::{DomAdapter, NoState, StateProvider};
use crate::selector::{
    AttrOp, AttrSelector, Combinator, NthKind, PseudoClass, RelativeSelector, SelectorList,
    SelectorPattern, SimpleSelector,
};

/// Matches `list` against `element`, returning the 0-based index of the
/// first matching alternative. `None` means no alternative matched; it is
/// not an error.
pub fn matches<D: DomAdapter>(
    list: &SelectorList,
    dom: &D,
    element: D::Handle,
) -> Option<usize> {
    MatchContext::new(dom, &NoState).matches(list, element)
}

/// Borrowed matching environment: the element tree plus the dynamic-state
/// collaborator answering `:hover`-style pseudo-classes.
pub struct MatchContext<'a, D: DomAdapter, S: StateProvider<D::Handle>> {
    dom: &'a D,
    state: &'a S,
}

impl<'a, D: DomAdapter, S: StateProvider<D::Handle>> MatchContext<'a, D, S> {
    pub fn new(dom: &'a D, state: &'a S) -> Self {
        MatchContext { dom, state }
    }

    pub fn matches(&self, list: &SelectorList, element: D::Handle) -> Option<usize> {
        self.matches_with_pseudo(list, element, None)
    }

    /// Matches against the `pseudo` box of `element` (`Some("before")` for
    /// `::before`) instead of the element itself. The subject compound must
    /// name that pseudo-element, so `p::before` never matches plain `p` and
    /// a plain `p` never matches the box.
    pub fn matches_with_pseudo(
        &self,
        list: &SelectorList,
        element: D::Handle,
        pseudo: Option<&str>,
    ) -> Option<usize> {
        list.alternatives
            .iter()
            .position(|pattern| self.matches_pattern_with_pseudo(pattern, element, pseudo))
    }

    pub fn matches_pattern(&self, pattern: &SelectorPattern, element: D::Handle) -> bool {
        self.matches_pattern_with_pseudo(pattern, element, None)
    }

    pub fn matches_pattern_with_pseudo(
        &self,
        pattern: &SelectorPattern,
        element: D::Handle,
        pseudo: Option<&str>,
    ) -> bool {
        let Some(last) = pattern.parts.len().checked_sub(1) else {
            return false;
        };
        self.matches_from(pattern, last, element, None, pseudo)
    }

    /// Walk one compound and recurse leftwards. `anchor` carries the scope
    /// element and leading combinator of a relative selector; when the
    /// leftmost compound matches, the matched element must still stand in
    /// that relation to the scope. `pseudo` applies to the compound at
    /// `index` only; compounds left of the subject address elements.
    fn matches_from(
        &self,
        pattern: &SelectorPattern,
        index: usize,
        element: D::Handle,
        anchor: Option<(D::Handle, Combinator)>,
        pseudo: Option<&str>,
    ) -> bool {
        if !self.matches_compound(&pattern.parts[index], element, pseudo) {
            return false;
        }
        let Some(next) = index.checked_sub(1) else {
            return match anchor {
                None => true,
                Some((scope, combinator)) => self.anchored_to(element, scope, combinator),
            };
        };
        match pattern.combinators[next] {
            Combinator::Child => self
                .dom
                .parent(element)
                .is_some_and(|parent| self.matches_from(pattern, next, parent, anchor, None)),
            Combinator::Descendant => {
                let mut current = self.dom.parent(element);
                while let Some(ancestor) = current {
                    if self.matches_from(pattern, next, ancestor, anchor, None) {
                        return true;
                    }
                    current = self.dom.parent(ancestor);
                }
                false
            }
            Combinator::AdjacentSibling => self
                .dom
                .previous_sibling_element(element)
                .is_some_and(|sibling| self.matches_from(pattern, next, sibling, anchor, None)),
            Combinator::GeneralSibling => {
                let mut current = self.dom.previous_sibling_element(element);
                while let Some(sibling) = current {
                    if self.matches_from(pattern, next, sibling, anchor, None) {
                        return true;
                    }
                    current = self.dom.previous_sibling_element(sibling);
                }
                false
            }
        }
    }

    fn anchored_to(
        &self,
        element: D::Handle,
        scope: D::Handle,
        combinator: Combinator,
    ) -> bool {
        match combinator {
            Combinator::Child => self.dom.parent(element) == Some(scope),
            Combinator::Descendant => self.is_strict_ancestor(scope, element),
            Combinator::AdjacentSibling => {
                self.dom.previous_sibling_element(element) == Some(scope)
            }
            Combinator::GeneralSibling => {
                let mut current = self.dom.previous_sibling_element(element);
                while let Some(sibling) = current {
                    if sibling == scope {
                        return true;
                    }
                    current = self.dom.previous_sibling_element(sibling);
                }
                false
            }
        }
    }

    fn matches_compound(
        &self,
        simple: &SimpleSelector,
        element: D::Handle,
        pseudo: Option<&str>,
    ) -> bool {
        let box_fits = match (simple.pseudo_element.as_deref(), pseudo) {
            (None, None) => true,
            (Some(have), Some(want)) => have.eq_ignore_ascii_case(want),
            _ => false,
        };
        if !box_fits {
            return false;
        }
        if let Some(tag) = &simple.tag {
            if tag != "*" && !self.dom.tag_name(element).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &simple.id {
            if self.dom.element_id(element) != Some(id.as_str()) {
                return false;
            }
        }
        if !simple
            .classes
            .iter()
            .all(|class| self.dom.has_class(element, class))
        {
            return false;
        }
        if !simple.attrs.iter().all(|attr| self.attr_matches(attr, element)) {
            return false;
        }
        simple
            .pseudos
            .iter()
            .all(|pseudo_class| self.pseudo_matches(pseudo_class, element))
    }

    fn attr_matches(&self, attr: &AttrSelector, element: D::Handle) -> bool {
        let Some(actual) = self.dom.attr(element, &attr.name) else {
            return false;
        };
        if attr.op == AttrOp::Exists {
            return true;
        }
        let Some(wanted) = attr.value.as_deref() else {
            return false;
        };
        let actual_folded;
        let wanted_folded;
        let (actual, wanted) = if attr.case_insensitive {
            actual_folded = actual.to_ascii_lowercase();
            wanted_folded = wanted.to_ascii_lowercase();
            (actual_folded.as_str(), wanted_folded.as_str())
        } else {
            (actual, wanted)
        };
        match attr.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == wanted,
            AttrOp::Includes => {
                !wanted.is_empty() && actual.split_ascii_whitespace().any(|word| word == wanted)
            }
            AttrOp::DashMatch => actual == wanted || actual.starts_with(&format!("{wanted}-")),
            AttrOp::Prefix => !wanted.is_empty() && actual.starts_with(wanted),
            AttrOp::Suffix => !wanted.is_empty() && actual.ends_with(wanted),
            AttrOp::Substring => !wanted.is_empty() && actual.contains(wanted),
        }
    }

    fn pseudo_matches(&self, pseudo: &PseudoClass, element: D::Handle) -> bool {
        match pseudo {
            PseudoClass::Root => self.dom.is_root(element),
            PseudoClass::Empty => !self.dom.has_content(element),
            PseudoClass::Blank => self.dom.is_blank(element),
            PseudoClass::FirstChild => self.dom.previous_sibling_element(element).is_none(),
            PseudoClass::LastChild => self.is_last_child(element),
            PseudoClass::OnlyChild => {
                self.dom.previous_sibling_element(element).is_none()
                    && self.is_last_child(element)
            }
            PseudoClass::FirstOfType => self.preceding_of_type(element).is_none(),
            PseudoClass::LastOfType => !self.has_following_of_type(element),
            PseudoClass::OnlyOfType => {
                self.preceding_of_type(element).is_none() && !self.has_following_of_type(element)
            }
            PseudoClass::Nth { kind, a, b, of } => self
                .nth_position(element, *kind, of.as_ref())
                .map(|position| nth_formula_matches(*a, *b, position))
                .unwrap_or(false),
            PseudoClass::Not(list) => self.matches(list, element).is_none(),
            PseudoClass::Is(list) | PseudoClass::Where(list) => {
                self.matches(list, element).is_some()
            }
            PseudoClass::Has(relatives) => relatives
                .iter()
                .any(|relative| self.matches_relative(relative, element)),
            PseudoClass::Lang(ranges) => {
                let Some(language) = self.effective_language(element) else {
                    return false;
                };
                ranges
                    .iter()
                    .any(|range| lang_range_matches(range, &language))
            }
            PseudoClass::Dir(direction) => {
                self.effective_direction(element).eq_ignore_ascii_case(direction)
            }
            PseudoClass::Link => {
                self.is_link(element) && !self.state.is_active(element, "visited")
            }
            PseudoClass::AnyLink => self.is_link(element),
            PseudoClass::Checked => {
                self.state.is_active(element, "checked")
                    || self.dom.attr(element, "checked").is_some()
                    || (self.dom.tag_name(element).eq_ignore_ascii_case("option")
                        && self.dom.attr(element, "selected").is_some())
            }
            PseudoClass::Indeterminate => {
                self.state.is_active(element, "indeterminate")
                    || self.dom.attr(element, "indeterminate").is_some()
            }
            PseudoClass::Disabled => {
                self.is_form_control(element) && self.dom.attr(element, "disabled").is_some()
            }
            PseudoClass::Enabled => {
                self.is_form_control(element) && self.dom.attr(element, "disabled").is_none()
            }
            PseudoClass::ReadOnly => !self.is_read_write(element),
            PseudoClass::ReadWrite => self.is_read_write(element),
            PseudoClass::PlaceholderShown => {
                let tag = self.dom.tag_name(element);
                (tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea"))
                    && self.dom.attr(element, "placeholder").is_some()
                    && self.dom.attr(element, "value").map_or(true, str::is_empty)
            }
            PseudoClass::Default => {
                self.state.is_active(element, "default")
                    || self.dom.attr(element, "checked").is_some()
                    || self.dom.attr(element, "selected").is_some()
            }
            PseudoClass::State(name) => self.state.is_active(element, name),
        }
    }

    fn is_link(&self, element: D::Handle) -> bool {
        let tag = self.dom.tag_name(element);
        (tag.eq_ignore_ascii_case("a") || tag.eq_ignore_ascii_case("area"))
            && self.dom.attr(element, "href").is_some()
    }

    fn is_form_control(&self, element: D::Handle) -> bool {
        matches!(
            self.dom.tag_name(element).to_ascii_lowercase().as_str(),
            "input" | "button" | "select" | "textarea" | "optgroup" | "option" | "fieldset"
        )
    }

    fn is_read_write(&self, element: D::Handle) -> bool {
        if self
            .dom
            .attr(element, "contenteditable")
            .map_or(false, |v| v.is_empty() || v.eq_ignore_ascii_case("true"))
        {
            return true;
        }
        let tag = self.dom.tag_name(element);
        (tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea"))
            && self.dom.attr(element, "readonly").is_none()
            && self.dom.attr(element, "disabled").is_none()
    }

    fn is_last_child(&self, element: D::Handle) -> bool {
        match self.dom.parent(element) {
            None => true,
            Some(parent) => self.dom.children(parent).last() == Some(&element),
        }
    }

    fn preceding_of_type(&self, element: D::Handle) -> Option<D::Handle> {
        let tag = self.dom.tag_name(element);
        let mut current = self.dom.previous_sibling_element(element);
        while let Some(sibling) = current {
            if self.dom.tag_name(sibling).eq_ignore_ascii_case(tag) {
                return Some(sibling);
            }
            current = self.dom.previous_sibling_element(sibling);
        }
        None
    }

    fn has_following_of_type(&self, element: D::Handle) -> bool {
        let tag = self.dom.tag_name(element);
        self.following_siblings(element)
            .iter()
            .any(|&sibling| self.dom.tag_name(sibling).eq_ignore_ascii_case(tag))
    }

    /// 1-based position among the counted siblings, from the end for the
    /// `last` kinds. `None` when the element itself is not counted, which
    /// happens when it fails the `of S` filter.
    fn nth_position(
        &self,
        element: D::Handle,
        kind: NthKind,
        of: Option<&SelectorList>,
    ) -> Option<i32> {
        let siblings = match self.dom.parent(element) {
            Some(parent) => self.dom.children(parent),
            None => vec![element],
        };
        let of_type = matches!(kind, NthKind::OfType | NthKind::LastOfType);
        let tag = self.dom.tag_name(element);
        let counted: Vec<D::Handle> = siblings
            .into_iter()
            .filter(|&sibling| {
                if of_type {
                    self.dom.tag_name(sibling).eq_ignore_ascii_case(tag)
                } else if let Some(list) = of {
                    self.matches(list, sibling).is_some()
                } else {
                    true
                }
            })
            .collect();
        let index = counted.iter().position(|&sibling| sibling == element)?;
        let position = match kind {
            NthKind::Child | NthKind::OfType => index + 1,
            NthKind::LastChild | NthKind::LastOfType => counted.len() - index,
        };
        Some(position as i32)
    }

    fn matches_relative(&self, relative: &RelativeSelector, scope: D::Handle) -> bool {
        let candidates = match relative.combinator {
            Combinator::Child | Combinator::Descendant => self.descendants(scope),
            Combinator::AdjacentSibling | Combinator::GeneralSibling => {
                let siblings = self.following_siblings(scope);
                let mut all = siblings.clone();
                for sibling in siblings {
                    all.extend(self.descendants(sibling));
                }
                all
            }
        };
        let last = match relative.pattern.parts.len().checked_sub(1) {
            Some(last) => last,
            None => return false,
        };
        candidates.into_iter().any(|candidate| {
            self.matches_from(
                &relative.pattern,
                last,
                candidate,
                Some((scope, relative.combinator)),
                None,
            )
        })
    }

    fn is_strict_ancestor(&self, ancestor: D::Handle, element: D::Handle) -> bool {
        let mut current = self.dom.parent(element);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.dom.parent(node);
        }
        false
    }

    fn descendants(&self, element: D::Handle) -> Vec<D::Handle> {
        let mut out = Vec::new();
        let mut stack = self.dom.children(element);
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.dom.children(node));
        }
        out
    }

    fn following_siblings(&self, element: D::Handle) -> Vec<D::Handle> {
        let Some(parent) = self.dom.parent(element) else {
            return Vec::new();
        };
        let children = self.dom.children(parent);
        match children.iter().position(|&c| c == element) {
            Some(index) => children[index + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    fn effective_language(&self, element: D::Handle) -> Option<String> {
        let mut current = Some(element);
        while let Some(node) = current {
            if let Some(lang) = self
                .dom
                .attr(node, "lang")
                .or_else(|| self.dom.attr(node, "xml:lang"))
            {
                if lang.is_empty() {
                    return None;
                }
                return Some(lang.to_string());
            }
            current = self.dom.parent(node);
        }
        None
    }

    fn effective_direction(&self, element: D::Handle) -> &str {
        let mut current = Some(element);
        while let Some(node) = current {
            if let Some(dir) = self.dom.attr(node, "dir") {
                if dir.eq_ignore_ascii_case("ltr") {
                    return "ltr";
                }
                if dir.eq_ignore_ascii_case("rtl") {
                    return "rtl";
                }
            }
            current = self.dom.parent(node);
        }
        "ltr"
    }
}

fn nth_formula_matches(a: i32, b: i32, position: i32) -> bool {
    // i64: position - b wraps i32 when B is near i32::MIN.
    let (a, b, position) = (i64::from(a), i64::from(b), i64::from(position));
    if a == 0 {
        return position == b;
    }
    let diff = position - b;
    diff % a == 0 && diff / a >= 0
}

/// RFC 4647 extended filtering, which is what `:lang()` ranges use. The
/// wildcard subtag matches any subtag; single-letter tag subtags stop the
/// scan because they open an extension.
fn lang_range_matches(range: &str, tag: &str) -> bool {
    let range_parts: Vec<&str> = range.split('-').collect();
    let tag_parts: Vec<&str> = tag.split('-').collect();
    let (Some(first_range), Some(first_tag)) = (range_parts.first(), tag_parts.first()) else {
        return false;
    };
    if *first_range != "*" && !first_range.eq_ignore_ascii_case(first_tag) {
        return false;
    }
    let mut r = 1;
    let mut t = 1;
    while r < range_parts.len() {
        let range_part = range_parts[r];
        if range_part == "*" {
            r += 1;
            continue;
        }
        if t >= tag_parts.len() {
            return false;
        }
        if range_part.eq_ignore_ascii_case(tag_parts[t]) {
            r += 1;
            t += 1;
            continue;
        }
        if tag_parts[t].len() == 1 {
            return false;
        }
        t += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fixture::{NodeId, TestDom};
    use crate::selector::Specificity;

    fn list(text: &str) -> SelectorList {
        SelectorList::parse_str(text).expect("selector should parse")
    }

    #[test]
    fn adjacent_sibling_scenario() {
        let mut dom = TestDom::new();
        let div = dom.element(None, "div");
        dom.set_id(div, "div1");
        let first = dom.element(Some(div), "p");
        dom.add_class(first, "exampleclass");
        dom.set_id(first, "childid1");
        let second = dom.element(Some(div), "p");
        dom.set_id(second, "childid2");

        let selector = list("p.exampleclass + p");
        assert_eq!(matches(&selector, &dom, second), Some(0));
        assert_eq!(matches(&selector, &dom, first), None);
        assert_eq!(selector.specificity_of(0), Specificity(0, 1, 2));
    }

    #[test]
    fn nth_child_with_of_filter() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        dom.element(Some(parent), "div");
        let target = dom.element(Some(parent), "p");
        dom.element(Some(parent), "div");

        let selector = list("p:nth-child(1 of p)");
        assert_eq!(matches(&selector, &dom, target), Some(0));

        let late = dom.element(Some(parent), "p");
        let last_two = list("p:nth-last-child(2 of p)");
        assert_eq!(matches(&last_two, &dom, target), Some(0));
        assert_eq!(matches(&last_two, &dom, late), None);
    }

    #[test]
    fn nth_child_keywords() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "ul");
        let items: Vec<NodeId> = (0..4).map(|_| dom.element(Some(parent), "li")).collect();

        let even = list("li:nth-child(even)");
        let odd = list("li:nth-child(odd)");
        assert_eq!(matches(&even, &dom, items[0]), None);
        assert_eq!(matches(&even, &dom, items[1]), Some(0));
        assert_eq!(matches(&odd, &dom, items[0]), Some(0));
        assert_eq!(matches(&odd, &dom, items[3]), None);

        let first_three = list("li:nth-child(-n+3)");
        assert_eq!(matches(&first_three, &dom, items[2]), Some(0));
        assert_eq!(matches(&first_three, &dom, items[3]), None);
    }

    #[test]
    fn nth_formula_tolerates_extreme_b() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "ul");
        let items: Vec<NodeId> = (0..3).map(|_| dom.element(Some(parent), "li")).collect();

        // B is i32::MIN; every position satisfies 1n-2147483648.
        let always = list("li:nth-child(1n-2147483648)");
        assert_eq!(matches(&always, &dom, items[0]), Some(0));
        assert_eq!(matches(&always, &dom, items[2]), Some(0));

        let never = list("li:nth-child(0n-2147483648)");
        assert_eq!(matches(&never, &dom, items[1]), None);
    }

    #[test]
    fn descendant_backtracks_over_multiple_candidates() {
        // a > b1 > d > b2 > c: the nearest `b` ancestor of `c` is not a
        // child of `a`, but the farther one is.
        let mut dom = TestDom::new();
        let a = dom.element(None, "a");
        let b1 = dom.element(Some(a), "b");
        let d = dom.element(Some(b1), "d");
        let b2 = dom.element(Some(d), "b");
        let c = dom.element(Some(b2), "c");

        assert_eq!(matches(&list("a > b c"), &dom, c), Some(0));
        assert_eq!(matches(&list("a > d c"), &dom, c), None);
    }

    #[test]
    fn child_and_descendant_combinators() {
        let mut dom = TestDom::new();
        let html = dom.element(None, "html");
        let body = dom.element(Some(html), "body");
        let p = dom.element(Some(body), "p");

        assert_eq!(matches(&list("html p"), &dom, p), Some(0));
        assert_eq!(matches(&list("html > p"), &dom, p), None);
        assert_eq!(matches(&list("body > p"), &dom, p), Some(0));
    }

    #[test]
    fn general_sibling_walks_all_preceding() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        let h1 = dom.element(Some(parent), "h1");
        dom.element(Some(parent), "p");
        let span = dom.element(Some(parent), "span");

        assert_eq!(matches(&list("h1 ~ span"), &dom, span), Some(0));
        assert_eq!(matches(&list("h1 + span"), &dom, span), None);
        assert_eq!(matches(&list("h1 ~ span"), &dom, h1), None);
    }

    #[test]
    fn attribute_operators_match() {
        let mut dom = TestDom::new();
        let el = dom.element(None, "div");
        dom.set_attr(el, "title", "Hello World");
        dom.set_attr(el, "lang", "en-US");
        dom.set_attr(el, "class-list", "alpha beta");

        assert_eq!(matches(&list("[title]"), &dom, el), Some(0));
        assert_eq!(matches(&list("[title='Hello World']"), &dom, el), Some(0));
        assert_eq!(matches(&list("[title='hello world']"), &dom, el), None);
        assert_eq!(matches(&list("[title='hello world' i]"), &dom, el), Some(0));
        assert_eq!(matches(&list("[class-list~=beta]"), &dom, el), Some(0));
        assert_eq!(matches(&list("[class-list~=bet]"), &dom, el), None);
        assert_eq!(matches(&list("[lang|=en]"), &dom, el), Some(0));
        assert_eq!(matches(&list("[lang|=e]"), &dom, el), None);
        assert_eq!(matches(&list("[title^=Hello]"), &dom, el), Some(0));
        assert_eq!(matches(&list("[title$=World]"), &dom, el), Some(0));
        assert_eq!(matches(&list("[title*='lo Wo']"), &dom, el), Some(0));
        assert_eq!(matches(&list("[missing]"), &dom, el), None);
    }

    #[test]
    fn negation_and_is_recurse() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        let p = dom.element(Some(parent), "p");
        dom.add_class(p, "note");
        let q = dom.element(Some(parent), "q");

        assert_eq!(matches(&list("p:not(.other)"), &dom, p), Some(0));
        assert_eq!(matches(&list("p:not(.note)"), &dom, p), None);
        assert_eq!(matches(&list(":is(p, q)"), &dom, q), Some(0));
        assert_eq!(matches(&list(":where(.note)"), &dom, p), Some(0));
        assert_eq!(matches(&list(":not(p, q)"), &dom, q), None);
    }

    #[test]
    fn has_child_and_descendant_scopes() {
        let mut dom = TestDom::new();
        let article = dom.element(None, "article");
        let section = dom.element(Some(article), "section");
        let img = dom.element(Some(section), "img");
        dom.set_attr(img, "src", "x.png");

        // img is a grandchild of article, a child of section.
        assert_eq!(matches(&list("article:has(img)"), &dom, article), Some(0));
        assert_eq!(matches(&list("article:has(> img)"), &dom, article), None);
        assert_eq!(matches(&list("section:has(> img)"), &dom, section), Some(0));
        assert_eq!(
            matches(&list("article:has(section img)"), &dom, article),
            Some(0)
        );
        assert_eq!(matches(&list("article:has(div img)"), &dom, article), None);
    }

    #[test]
    fn has_sibling_scopes() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        let h1 = dom.element(Some(parent), "h1");
        let p = dom.element(Some(parent), "p");
        dom.element(Some(p), "em");
        dom.element(Some(parent), "span");

        assert_eq!(matches(&list("h1:has(+ p)"), &dom, h1), Some(0));
        assert_eq!(matches(&list("h1:has(+ span)"), &dom, h1), None);
        assert_eq!(matches(&list("h1:has(~ span)"), &dom, h1), Some(0));
        assert_eq!(matches(&list("h1:has(~ p em)"), &dom, h1), Some(0));
        assert_eq!(matches(&list("p:has(~ h1)"), &dom, p), None);
    }

    #[test]
    fn lang_ranges_inherit_and_wildcard() {
        let mut dom = TestDom::new();
        let root = dom.element(None, "html");
        dom.set_attr(root, "lang", "sr-Latn-RS");
        let child = dom.element(Some(root), "p");
        let other = dom.element(Some(root), "span");
        dom.set_attr(other, "lang", "en");

        assert_eq!(matches(&list(":lang(sr)"), &dom, child), Some(0));
        assert_eq!(matches(&list(":lang(\"*-Latn\")"), &dom, child), Some(0));
        assert_eq!(matches(&list(":lang(sr-RS)"), &dom, child), Some(0));
        assert_eq!(matches(&list(":lang(en)"), &dom, child), None);
        assert_eq!(matches(&list(":lang(en)"), &dom, other), Some(0));
        assert_eq!(matches(&list(":lang(\"*-Latn\")"), &dom, other), None);
    }

    #[test]
    fn structural_pseudo_classes() {
        let mut dom = TestDom::new();
        let root = dom.element(None, "html");
        let body = dom.element(Some(root), "body");
        let first = dom.element(Some(body), "p");
        dom.set_text(first, "text");
        let middle = dom.element(Some(body), "div");
        let last = dom.element(Some(body), "p");

        assert_eq!(matches(&list(":root"), &dom, root), Some(0));
        assert_eq!(matches(&list(":root"), &dom, body), None);
        assert_eq!(matches(&list("p:first-child"), &dom, first), Some(0));
        assert_eq!(matches(&list("p:last-child"), &dom, last), Some(0));
        assert_eq!(matches(&list("p:last-child"), &dom, first), None);
        assert_eq!(matches(&list("div:only-child"), &dom, middle), None);
        assert_eq!(matches(&list("div:only-of-type"), &dom, middle), Some(0));
        assert_eq!(matches(&list("p:first-of-type"), &dom, first), Some(0));
        assert_eq!(matches(&list("p:last-of-type"), &dom, last), Some(0));
        assert_eq!(matches(&list("p:only-of-type"), &dom, first), None);
        assert_eq!(matches(&list(":empty"), &dom, middle), Some(0));
        assert_eq!(matches(&list(":empty"), &dom, first), None);
    }

    #[test]
    fn blank_permits_whitespace_text() {
        let mut dom = TestDom::new();
        let a = dom.element(None, "div");
        dom.set_text(a, "  \n  ");

        assert_eq!(matches(&list(":empty"), &dom, a), None);
        assert_eq!(matches(&list(":blank"), &dom, a), Some(0));
    }

    #[test]
    fn form_state_from_attributes() {
        let mut dom = TestDom::new();
        let form = dom.element(None, "form");
        let on = dom.element(Some(form), "input");
        dom.set_attr(on, "checked", "");
        let off = dom.element(Some(form), "input");
        dom.set_attr(off, "disabled", "");
        let field = dom.element(Some(form), "textarea");
        dom.set_attr(field, "readonly", "");
        let anchor = dom.element(Some(form), "a");
        dom.set_attr(anchor, "href", "#top");

        assert_eq!(matches(&list(":checked"), &dom, on), Some(0));
        assert_eq!(matches(&list(":checked"), &dom, off), None);
        assert_eq!(matches(&list(":disabled"), &dom, off), Some(0));
        assert_eq!(matches(&list(":enabled"), &dom, on), Some(0));
        assert_eq!(matches(&list(":enabled"), &dom, anchor), None);
        assert_eq!(matches(&list(":read-only"), &dom, field), Some(0));
        assert_eq!(matches(&list(":read-write"), &dom, on), Some(0));
        assert_eq!(matches(&list(":any-link"), &dom, anchor), Some(0));
        assert_eq!(matches(&list(":link"), &dom, anchor), Some(0));
        assert_eq!(matches(&list(":any-link"), &dom, on), None);
    }

    #[test]
    fn state_provider_answers_dynamic_pseudos() {
        struct Hovered(NodeId);

        impl StateProvider<NodeId> for Hovered {
            fn is_active(&self, element: NodeId, state: &str) -> bool {
                state == "hover" && element == self.0
            }
        }

        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        let a = dom.element(Some(parent), "button");
        let b = dom.element(Some(parent), "button");

        let hovered = Hovered(a);
        let context = MatchContext::new(&dom, &hovered);
        let selector = list("button:hover");
        assert_eq!(context.matches(&selector, a), Some(0));
        assert_eq!(context.matches(&selector, b), None);
    }

    #[test]
    fn pseudo_element_selectors_skip_the_element() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        let p = dom.element(Some(parent), "p");

        assert_eq!(matches(&list("p::before"), &dom, p), None);
        assert_eq!(matches(&list("p:after"), &dom, p), None);
        assert_eq!(matches(&list("p::first-line"), &dom, p), None);
        assert_eq!(matches(&list("p"), &dom, p), Some(0));
        assert_eq!(list("p::before").specificity_of(0), Specificity(0, 0, 2));
    }

    #[test]
    fn pseudo_box_requires_the_named_target() {
        let mut dom = TestDom::new();
        let parent = dom.element(None, "div");
        let p = dom.element(Some(parent), "p");
        dom.add_class(p, "note");

        let context = MatchContext::new(&dom, &NoState);
        let selector = list("div > p.note::before");
        assert_eq!(
            context.matches_with_pseudo(&selector, p, Some("before")),
            Some(0)
        );
        assert_eq!(context.matches_with_pseudo(&selector, p, Some("after")), None);
        assert_eq!(context.matches_with_pseudo(&selector, p, None), None);
        // Plain selectors address the element, never one of its boxes.
        assert_eq!(
            context.matches_with_pseudo(&list("p.note"), p, Some("before")),
            None
        );
    }

    #[test]
    fn first_matching_alternative_wins() {
        let mut dom = TestDom::new();
        let el = dom.element(None, "div");
        dom.add_class(el, "c");
        dom.set_id(el, "i");

        let selector = list("q, .c, #i");
        assert_eq!(matches(&selector, &dom, el), Some(1));
        assert_eq!(selector.specificity_of(1), Specificity(0, 1, 0));
    }

    #[test]
    fn direction_inherits_with_ltr_default() {
        let mut dom = TestDom::new();
        let root = dom.element(None, "html");
        let plain = dom.element(Some(root), "p");
        let rtl_zone = dom.element(Some(root), "div");
        dom.set_attr(rtl_zone, "dir", "rtl");
        let inner = dom.element(Some(rtl_zone), "p");

        assert_eq!(matches(&list(":dir(ltr)"), &dom, plain), Some(0));
        assert_eq!(matches(&list(":dir(rtl)"), &dom, inner), Some(0));
        assert_eq!(matches(&list(":dir(rtl)"), &dom, plain), None);
    }
}

use super::{Element, Text};

/// An owned, detached subtree.
///
/// Fragments are what goes into a document (parsed HTML, synthesized
/// wrappers) and what comes out of it when content is overwritten.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    Element {
        element: Element,
        children: Vec<Fragment>,
    },
    Text(Text),
}

impl Fragment {
    pub fn element(tag: impl Into<String>) -> Self {
        Self::from_element(Element::new(tag))
    }

    pub fn from_element(element: Element) -> Self {
        Fragment::Element {
            element,
            children: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Fragment::Text(Text::new(value))
    }

    /// Sets an attribute; a no-op on text fragments.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Fragment::Element { element, .. } = &mut self {
            element.attrs.insert(key.into(), value.into());
        }
        self
    }

    /// Appends a child; a no-op on text fragments.
    pub fn with_child(mut self, child: Fragment) -> Self {
        if let Fragment::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = Fragment>) -> Self {
        children.into_iter().fold(self, Fragment::with_child)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Fragment::Element { element, .. } => Some(element),
            Fragment::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[Fragment] {
        match self {
            Fragment::Element { children, .. } => children,
            Fragment::Text(_) => &[],
        }
    }

    /// Size in absolute addressing once inserted.
    pub fn size(&self) -> usize {
        match self {
            Fragment::Text(text) => text.len(),
            Fragment::Element { children, .. } => {
                children.iter().map(Fragment::size).sum::<usize>() + 2
            }
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Fragment::Text(text) => out.push_str(&text.value),
            Fragment::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

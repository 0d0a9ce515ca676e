//! Node structures for XML tree representation.
//!
//! Documents are trees of reference-counted nodes so that the merge engine
//! can hold on to records while editing their children in place. Every node
//! keeps a weak reference to its parent, which lets edits be undone by
//! detaching inserted nodes.

mod xml_content;

pub use xml_content::{XmlComment, XmlContent, XmlElement, XmlText};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A reference-counted pointer to a node.
pub type NodeRef = Rc<RefCell<NodeInner>>;

/// Creates a new node reference.
pub fn new_node(content: Option<XmlContent>) -> NodeRef {
    Rc::new(RefCell::new(NodeInner::new(content)))
}

/// Creates a new element node without attributes.
pub fn new_element(name: impl Into<String>) -> NodeRef {
    new_node(Some(XmlContent::Element(XmlElement::named(name))))
}

/// Creates a new text node.
pub fn new_text(text: impl Into<String>) -> NodeRef {
    new_node(Some(XmlContent::Text(XmlText::new(text))))
}

/// The inner data of a node in the parse tree.
#[derive(Debug)]
pub struct NodeInner {
    /// Child nodes.
    children: Vec<NodeRef>,
    /// XML content of this node.
    content: Option<XmlContent>,
    /// Weak reference to parent node.
    parent: Weak<RefCell<NodeInner>>,
}

impl NodeInner {
    /// Creates a detached node with the given content.
    pub fn new(content: Option<XmlContent>) -> Self {
        NodeInner {
            children: Vec::new(),
            content,
            parent: Weak::new(),
        }
    }

    /// Returns the content of this node.
    pub fn content(&self) -> Option<&XmlContent> {
        self.content.as_ref()
    }

    /// Returns the element name, if this is an element node.
    pub fn element_name(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(XmlContent::as_element)
            .map(XmlElement::qname)
    }

    /// Returns true if this is an element called `name`.
    pub fn is_element_named(&self, name: &str) -> bool {
        self.element_name() == Some(name)
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Returns a weak reference to the parent.
    pub fn parent(&self) -> &Weak<RefCell<NodeInner>> {
        &self.parent
    }
}

/// Helper functions that work with NodeRef.
impl NodeInner {
    /// Adds a child node. Must be called on the NodeRef wrapper.
    pub fn add_child_to_ref(parent_ref: &NodeRef, child_ref: NodeRef) {
        child_ref.borrow_mut().parent = Rc::downgrade(parent_ref);
        parent_ref.borrow_mut().children.push(child_ref);
    }

    /// Inserts a child at the given index.
    pub fn add_child_at_to_ref(parent_ref: &NodeRef, index: usize, child_ref: NodeRef) {
        child_ref.borrow_mut().parent = Rc::downgrade(parent_ref);
        let mut parent = parent_ref.borrow_mut();
        let index = index.min(parent.children.len());
        parent.children.insert(index, child_ref);
    }

    /// Removes the child at the given index.
    pub fn remove_child_to_ref(parent_ref: &NodeRef, index: usize) -> Option<NodeRef> {
        let mut parent = parent_ref.borrow_mut();
        if index >= parent.children.len() {
            return None;
        }
        let child = parent.children.remove(index);
        child.borrow_mut().parent = Weak::new();
        Some(child)
    }

    /// Removes a node from its parent. Returns false if it had none.
    pub fn detach(node_ref: &NodeRef) -> bool {
        let Some(parent) = node_ref.borrow().parent.upgrade() else {
            return false;
        };
        let index = parent
            .borrow()
            .children
            .iter()
            .position(|c| Rc::ptr_eq(c, node_ref));
        match index {
            Some(index) => NodeInner::remove_child_to_ref(&parent, index).is_some(),
            None => false,
        }
    }
}

/// Returns the first element child of the synthetic parse root.
pub fn document_element(root: &NodeRef) -> Option<NodeRef> {
    root.borrow()
        .children()
        .iter()
        .find(|c| c.borrow().content().is_some_and(XmlContent::is_element))
        .cloned()
}

/// Finds the first child element called `name`.
pub fn find_child(node: &NodeRef, name: &str) -> Option<NodeRef> {
    node.borrow()
        .children()
        .iter()
        .find(|c| c.borrow().is_element_named(name))
        .cloned()
}

/// Collects every descendant element called `name`, in document order.
pub fn descendants_named(node: &NodeRef, name: &str) -> Vec<NodeRef> {
    let mut found = Vec::new();
    collect_named(node, name, &mut found);
    found
}

fn collect_named(node: &NodeRef, name: &str, found: &mut Vec<NodeRef>) {
    for child in node.borrow().children() {
        if child.borrow().is_element_named(name) {
            found.push(child.clone());
        }
        collect_named(child, name, found);
    }
}

/// Returns the concatenated text children, or None if there are none.
pub fn text_of(node: &NodeRef) -> Option<String> {
    let borrowed = node.borrow();
    let mut text: Option<String> = None;
    for child in borrowed.children() {
        if let Some(XmlContent::Text(t)) = child.borrow().content() {
            text.get_or_insert_with(String::new).push_str(t.text());
        }
    }
    text
}

/// Returns the text of child element `name`, if present and non-empty.
pub fn child_text(node: &NodeRef, name: &str) -> Option<String> {
    find_child(node, name)
        .and_then(|child| text_of(&child))
        .filter(|text| !text.is_empty())
}

/// Replaces the text children of an element, keeping element children.
pub fn set_text(node: &NodeRef, text: &str) {
    let position = {
        let mut borrowed = node.borrow_mut();
        let position = borrowed
            .children
            .iter()
            .position(|c| c.borrow().content().is_some_and(XmlContent::is_text));
        borrowed
            .children
            .retain(|c| !c.borrow().content().is_some_and(XmlContent::is_text));
        position.unwrap_or(0)
    };

    if !text.is_empty() {
        NodeInner::add_child_at_to_ref(node, position, new_text(text));
    }
}

/// Appends a new child element holding `text`.
pub fn append_element(parent: &NodeRef, name: &str, text: &str) -> NodeRef {
    let element = new_element(name);
    set_text(&element, text);
    NodeInner::add_child_to_ref(parent, element.clone());
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> NodeRef {
        let game = new_element("Game");
        append_element(&game, "ID", "g1");
        append_element(&game, "Title", "Old");
        game
    }

    #[test]
    fn test_add_child() {
        let parent = new_element("parent");
        let child1 = new_element("child1");
        let child2 = new_element("child2");

        NodeInner::add_child_to_ref(&parent, child1.clone());
        NodeInner::add_child_to_ref(&parent, child2.clone());

        assert_eq!(parent.borrow().child_count(), 2);
        let back = child1.borrow().parent().upgrade().unwrap();
        assert!(Rc::ptr_eq(&back, &parent));
    }

    #[test]
    fn test_insert_and_remove_child() {
        let parent = new_element("p");
        let a = new_element("a");
        let c = new_element("c");
        NodeInner::add_child_to_ref(&parent, a.clone());
        NodeInner::add_child_to_ref(&parent, c.clone());
        NodeInner::add_child_at_to_ref(&parent, 1, new_element("b"));

        let names: Vec<String> = parent
            .borrow()
            .children()
            .iter()
            .map(|n| n.borrow().element_name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let removed = NodeInner::remove_child_to_ref(&parent, 0).unwrap();
        assert!(Rc::ptr_eq(&removed, &a));
        assert!(a.borrow().parent().upgrade().is_none());
        assert_eq!(parent.borrow().child_count(), 2);
    }

    #[test]
    fn test_detach() {
        let game = game();
        let title = find_child(&game, "Title").unwrap();
        assert!(NodeInner::detach(&title));
        assert!(find_child(&game, "Title").is_none());
        assert!(!NodeInner::detach(&title));
    }

    #[test]
    fn test_text_access() {
        let game = game();
        let title = find_child(&game, "Title").unwrap();
        assert_eq!(text_of(&title).as_deref(), Some("Old"));

        set_text(&title, "New");
        assert_eq!(child_text(&game, "Title").as_deref(), Some("New"));
        assert_eq!(title.borrow().child_count(), 1);

        set_text(&title, "");
        assert_eq!(text_of(&title), None);
        assert_eq!(child_text(&game, "Title"), None);
    }

    #[test]
    fn test_set_text_keeps_elements() {
        let node = new_element("Mixed");
        NodeInner::add_child_to_ref(&node, new_text("before"));
        NodeInner::add_child_to_ref(&node, new_element("Inner"));

        set_text(&node, "after");
        assert_eq!(node.borrow().child_count(), 2);
        assert_eq!(text_of(&node).as_deref(), Some("after"));
        assert!(find_child(&node, "Inner").is_some());
    }

    #[test]
    fn test_descendants_named() {
        let root = new_node(None);
        let launchbox = new_element("LaunchBox");
        NodeInner::add_child_to_ref(&root, launchbox.clone());
        NodeInner::add_child_to_ref(&launchbox, game());
        NodeInner::add_child_to_ref(&launchbox, game());
        append_element(&launchbox, "AdditionalApplication", "");

        assert_eq!(descendants_named(&root, "Game").len(), 2);
        assert_eq!(descendants_named(&root, "ID").len(), 2);
        let doc = document_element(&root).unwrap();
        assert!(doc.borrow().is_element_named("LaunchBox"));
    }
}

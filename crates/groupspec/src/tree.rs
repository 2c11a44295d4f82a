//! Singly-parented tree with owning children and weak parent links.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

/// A node holding a value and an ordered list of children.
///
/// Children are owned through `Rc`; the parent link is a `Weak`, so a
/// subtree never keeps its ancestors alive. Child order is attachment order.
pub struct TreeNode<V> {
    pub value: V,
    parent: RefCell<Weak<TreeNode<V>>>,
    children: RefCell<Vec<Rc<TreeNode<V>>>>,
}

impl<V> TreeNode<V> {
    pub fn new(value: V) -> Rc<Self> {
        Rc::new(TreeNode {
            value,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        })
    }

    /// Attach `child` as the last child of this node.
    ///
    /// # Panics
    ///
    /// If `child` is already attached to a parent.
    pub fn attach(self: &Rc<Self>, child: Rc<TreeNode<V>>) {
        assert!(
            child.parent().is_none(),
            "groupspec: tree node is already attached to a parent"
        );
        *child.parent.borrow_mut() = Rc::downgrade(self);
        self.children.borrow_mut().push(child);
    }

    /// The parent node, if this node is attached and the parent is still alive.
    pub fn parent(&self) -> Option<Rc<TreeNode<V>>> {
        self.parent.borrow().upgrade()
    }

    pub fn children(&self) -> Ref<'_, [Rc<TreeNode<V>>]> {
        Ref::map(self.children.borrow(), |c| c.as_slice())
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Visit this node and every descendant, depth-first in attachment order.
    pub fn walk(&self, f: &mut impl FnMut(&TreeNode<V>)) {
        f(self);
        for child in self.children().iter() {
            child.walk(f);
        }
    }

    /// Number of ancestors between this node and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }
}

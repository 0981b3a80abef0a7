//! Mutating operations over a [`Tree`].
//!
//! All structure changes go through these methods so the two-way parent
//! consistency invariant holds: a node appears in its parent's contents (or
//! one of the parent's secondary strings) exactly when its `parent` field
//! points there.

use crate::ast::{Node, NodeId, Tree};
use crate::error::StructuralError;

impl Tree {
    /// Append `child` to `parent`'s contents and set its back-link.
    pub fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Attach `children` as one of `parent`'s secondary strings.
    ///
    /// `slot` selects the secondary field by index in the payload's fixed
    /// order (every current kind has at most one, so this is 0 today).
    pub fn adopt_secondary(&mut self, parent: NodeId, slot: usize, children: Vec<NodeId>) {
        for child in &children {
            if let Some(node) = self.get_mut(*child) {
                node.parent = Some(parent);
            }
        }
        if let Some(node) = self.get_mut(parent)
            && let Some(list) = node.data.secondary_mut().into_iter().nth(slot)
        {
            *list = children;
        }
    }

    /// Detach `node` from its parent (contents or secondary string), clear
    /// its back-link and return it.
    pub fn extract(&mut self, id: NodeId) -> Result<NodeId, StructuralError> {
        let parent = self
            .get(id)
            .ok_or(StructuralError::StaleHandle)?
            .parent
            .ok_or(StructuralError::DetachedAnchor)?;
        let removed = self.detach_from(parent, id);
        if !removed {
            return Err(StructuralError::MissingAnchor);
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        Ok(id)
    }

    fn detach_from(&mut self, parent: NodeId, id: NodeId) -> bool {
        let Some(node) = self.get_mut(parent) else { return false };
        if let Some(pos) = node.children.iter().position(|c| *c == id) {
            node.children.remove(pos);
            return true;
        }
        for list in node.data.secondary_mut() {
            if let Some(pos) = list.iter().position(|c| *c == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Insert `node` into `anchor`'s parent just before `anchor`. Works for
    /// contents children and for secondary-string members, including an
    /// anchor that is first in its secondary string.
    pub fn insert_before(&mut self, node: NodeId, anchor: NodeId) -> Result<(), StructuralError> {
        let parent = self
            .get(anchor)
            .ok_or(StructuralError::StaleHandle)?
            .parent
            .ok_or(StructuralError::DetachedAnchor)?;
        let Some(parent_node) = self.get_mut(parent) else {
            return Err(StructuralError::StaleHandle);
        };
        let mut inserted = false;
        if let Some(pos) = parent_node.children.iter().position(|c| *c == anchor) {
            parent_node.children.insert(pos, node);
            inserted = true;
        } else {
            for list in parent_node.data.secondary_mut() {
                if let Some(pos) = list.iter().position(|c| *c == anchor) {
                    list.insert(pos, node);
                    inserted = true;
                    break;
                }
            }
        }
        if !inserted {
            return Err(StructuralError::MissingAnchor);
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = Some(parent);
        }
        Ok(())
    }

    /// Rewrite `old` in place with `new`'s kind, properties and contents.
    ///
    /// `new` must be detached; its children are re-parented to `old` and its
    /// slot is freed. `old`'s previous subtree is dropped. External
    /// references to `old` stay valid since its identity is preserved.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), StructuralError> {
        if !self.contains(old) || !self.contains(new) {
            return Err(StructuralError::StaleHandle);
        }
        let old_node = self.get(old).ok_or(StructuralError::StaleHandle)?;
        let parent = old_node.parent;
        let former_children: Vec<NodeId> = old_node.children.clone();
        let former_secondary: Vec<NodeId> = old_node
            .data
            .secondary()
            .into_iter()
            .flat_map(|l| l.iter().copied())
            .collect();

        let mut incoming: Node = std::mem::replace(
            self.get_mut(new).ok_or(StructuralError::StaleHandle)?,
            Node::new(crate::ast::NodeData::Document, 0, 0),
        );
        incoming.parent = parent;
        let adopted: Vec<NodeId> = incoming
            .children
            .iter()
            .copied()
            .chain(incoming.data.secondary().into_iter().flat_map(|l| l.iter().copied()))
            .collect();
        *self.get_mut(old).ok_or(StructuralError::StaleHandle)? = incoming;
        self.free(new);

        for child in adopted {
            if let Some(n) = self.get_mut(child) {
                n.parent = Some(old);
            }
        }
        for child in former_children.into_iter().chain(former_secondary) {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Depth-first visit of the subtree at `id`, secondary strings first,
    /// then contents, matching buffer order closely enough for traversals.
    pub fn map<F: FnMut(&Tree, NodeId)>(&self, id: NodeId, f: &mut F) {
        let Some(node) = self.get(id) else { return };
        f(self, id);
        let mut pending: Vec<NodeId> = Vec::new();
        for list in node.data.secondary() {
            pending.extend(list.iter().copied());
        }
        pending.extend(node.children.iter().copied());
        for child in pending {
            self.map(child, f);
        }
    }
}

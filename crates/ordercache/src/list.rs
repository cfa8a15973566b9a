//! Arena-backed doubly linked list
//!
//! Nodes live in a slot vector and link to each other by slot index, so the
//! list is the single owner of every node. Freed slots are recycled through a
//! free-list and never shrink the arena.

/// Node in the doubly-linked list
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency list with O(1) push-front, pop-back, remove and move-to-front
pub(crate) struct List<T> {
    nodes: Vec<Option<Node<T>>>,
    free_list: Vec<usize>,
    front: Option<usize>,
    back: Option<usize>,
    size: usize,
}

impl<T> List<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            front: None,
            back: None,
            size: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&T> {
        self.node(idx).map(|node| &node.value)
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.node_mut(idx).map(|node| &mut node.value)
    }

    /// Insert a value as the new front and return its slot
    pub(crate) fn push_front(&mut self, value: T) -> usize {
        let idx = self.alloc_node(Node {
            value,
            prev: None,
            next: None,
        });
        self.link_front(idx);
        self.size += 1;
        idx
    }

    /// Remove and return the back value
    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let idx = self.back?;
        self.remove(idx)
    }

    /// Unlink the node in `idx` and release its slot
    ///
    /// Returns `None` when the slot is vacant.
    pub(crate) fn remove(&mut self, idx: usize) -> Option<T> {
        if self.node(idx).is_none() {
            return None;
        }

        self.unlink(idx);
        self.size -= 1;
        self.free_list.push(idx);
        self.nodes[idx].take().map(|node| node.value)
    }

    /// Promote the node in `idx` to the front
    pub(crate) fn move_to_front(&mut self, idx: usize) {
        if self.front == Some(idx) || self.node(idx).is_none() {
            return;
        }

        self.unlink(idx);
        self.link_front(idx);
    }

    /// Iterate values from front (most recent) to back
    #[cfg(test)]
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.front,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn link_front(&mut self, idx: usize) {
        let old_front = self.front;

        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_front;
        }

        match old_front {
            Some(front_idx) => {
                if let Some(front) = self.node_mut(front_idx) {
                    front.prev = Some(idx);
                }
            }
            None => self.back = Some(idx),
        }

        self.front = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node_mut(idx) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };

        match prev {
            Some(prev_idx) => {
                if let Some(prev_node) = self.node_mut(prev_idx) {
                    prev_node.next = next;
                }
            }
            None => self.front = next,
        }

        match next {
            Some(next_idx) => {
                if let Some(next_node) = self.node_mut(next_idx) {
                    next_node.prev = prev;
                }
            }
            None => self.back = prev,
        }
    }

    fn alloc_node(&mut self, node: Node<T>) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    /// Panics unless links, ends and size agree with each other
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut count = 0;
        let mut prev: Option<usize> = None;
        let mut cursor = self.front;

        while let Some(idx) = cursor {
            let node = self.node(idx).expect("linked slot is vacant");
            assert_eq!(node.prev, prev, "broken prev link at slot {}", idx);
            count += 1;
            assert!(count <= self.size, "cycle or size undercount");
            prev = Some(idx);
            cursor = node.next;
        }

        assert_eq!(self.back, prev, "back does not match last reachable node");
        assert_eq!(count, self.size, "size does not match reachable nodes");

        let occupied = self.nodes.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(occupied, self.size, "unreachable occupied slots");
        assert_eq!(self.nodes.len() - occupied, self.free_list.len());
    }
}

/// Front-to-back iterator over list values
#[cfg(test)]
pub(crate) struct Iter<'a, T> {
    list: &'a List<T>,
    cursor: Option<usize>,
}

#[cfg(test)]
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &List<i32>) -> Vec<i32> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_push_front_order() {
        let mut list = List::with_capacity(4);

        list.push_front(1);
        list.push_front(2);
        list.push_front(3);

        assert_eq!(values(&list), vec![3, 2, 1]);
        assert_eq!(list.len(), 3);
        list.assert_consistent();
    }

    #[test]
    fn test_single_node_is_front_and_back() {
        let mut list = List::with_capacity(1);
        let idx = list.push_front(7);

        assert_eq!(list.front, Some(idx));
        assert_eq!(list.back, Some(idx));
        list.assert_consistent();
    }

    #[test]
    fn test_pop_back() {
        let mut list = List::with_capacity(2);
        list.push_front(1);
        list.push_front(2);

        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_back(), None);

        assert_eq!(list.len(), 0);
        assert_eq!(list.front, None);
        assert_eq!(list.back, None);
        list.assert_consistent();
    }

    #[test]
    fn test_remove_middle_front_and_back() {
        let mut list = List::with_capacity(5);
        let a = list.push_front(1);
        let b = list.push_front(2);
        let c = list.push_front(3);
        let d = list.push_front(4);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(values(&list), vec![4, 3, 1]);
        list.assert_consistent();

        assert_eq!(list.remove(d), Some(4));
        assert_eq!(values(&list), vec![3, 1]);
        assert_eq!(list.front, Some(c));
        list.assert_consistent();

        assert_eq!(list.remove(a), Some(1));
        assert_eq!(values(&list), vec![3]);
        assert_eq!(list.back, Some(c));
        list.assert_consistent();
    }

    #[test]
    fn test_remove_vacant_slot() {
        let mut list = List::with_capacity(2);
        let a = list.push_front(1);

        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);
        assert_eq!(list.remove(42), None);
        assert_eq!(list.len(), 0);
        list.assert_consistent();
    }

    #[test]
    fn test_move_to_front() {
        let mut list = List::with_capacity(3);
        let a = list.push_front(1);
        let b = list.push_front(2);
        list.push_front(3);

        list.move_to_front(b);
        assert_eq!(values(&list), vec![2, 3, 1]);
        list.assert_consistent();

        list.move_to_front(a);
        assert_eq!(values(&list), vec![1, 2, 3]);
        list.assert_consistent();

        // Already front
        list.move_to_front(a);
        assert_eq!(values(&list), vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
        list.assert_consistent();
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = List::with_capacity(2);
        list.push_front(1);
        list.push_front(2);
        list.pop_back();

        list.push_front(3);
        assert_eq!(list.nodes.len(), 2);
        assert_eq!(values(&list), vec![3, 2]);
        list.assert_consistent();
    }

    #[test]
    fn test_get_and_get_mut() {
        let mut list = List::with_capacity(1);
        let idx = list.push_front(10);

        *list.get_mut(idx).unwrap() += 5;
        assert_eq!(list.get(idx), Some(&15));
        assert_eq!(list.get(idx + 1), None);
    }
}

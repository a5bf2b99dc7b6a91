use serde::{Deserialize, Serialize};

/// Slot arena with a LIFO free list.
///
/// The free list is part of the serialized state, so a restored arena hands
/// out exactly the indices the original would have handed out. Iteration is
/// always in ascending slot order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value in the most recently freed slot, or a new one.
    pub fn insert(&mut self, value: T) -> u32 {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(None);
                (self.slots.len() - 1) as u32
            }
        };
        self.slots[index as usize] = Some(value);
        self.len += 1;
        index
    }

    /// Store a value at a specific slot, returning whatever occupied it.
    ///
    /// Slots skipped over to reach `index` become free, lowest first.
    pub fn insert_at(&mut self, index: u32, value: T) -> Option<T> {
        let slot = index as usize;
        if slot >= self.slots.len() {
            let old_len = self.slots.len() as u32;
            self.slots.resize_with(slot + 1, || None);
            self.free.extend((old_len..index).rev());
        } else {
            self.free.retain(|&i| i != index);
        }
        let previous = self.slots[slot].replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn remove(&mut self, index: u32) -> Option<T> {
        let removed = self.slots.get_mut(index as usize)?.take();
        if removed.is_some() {
            self.free.push(index);
            self.len -= 1;
        }
        removed
    }

    pub fn contains(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.as_mut()
    }

    /// Mutable access to two distinct slots at once.
    pub fn get2_mut(&mut self, a: u32, b: u32) -> Option<(&mut T, &mut T)> {
        if a == b || a.max(b) as usize >= self.slots.len() {
            return None;
        }
        let (lo, hi, swapped) = if a < b { (a, b, false) } else { (b, a, true) };
        let (head, tail) = self.slots.split_at_mut(hi as usize);
        let first = head.get_mut(lo as usize)?.as_mut()?;
        let second = tail.first_mut()?.as_mut()?;
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i as u32, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|v| (i as u32, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_assigns_sequential_indices() {
        let mut arena = Arena::new();
        assert_eq!(arena.insert("a"), 0);
        assert_eq!(arena.insert("b"), 1);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn removed_slots_are_reused_lifo() {
        let mut arena = Arena::new();
        for i in 0..4 {
            arena.insert(i);
        }
        arena.remove(1);
        arena.remove(2);
        assert_eq!(arena.insert(10), 2);
        assert_eq!(arena.insert(11), 1);
        assert_eq!(arena.insert(12), 4);
    }

    #[test]
    fn insert_at_frees_skipped_slots_lowest_first() {
        let mut arena = Arena::new();
        arena.insert_at(3, 'd');
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.insert('a'), 0);
        assert_eq!(arena.insert('b'), 1);
        assert_eq!(arena.insert('c'), 2);
        assert_eq!(arena.insert('e'), 4);
    }

    #[test]
    fn insert_at_claims_a_free_slot() {
        let mut arena = Arena::new();
        arena.insert(0);
        arena.insert(1);
        arena.remove(0);
        assert_eq!(arena.insert_at(0, 5), None);
        assert_eq!(arena.insert(6), 2);
        assert_eq!(arena.insert_at(2, 7), Some(6));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn serialized_free_list_keeps_allocation_deterministic() {
        let mut arena = Arena::new();
        for i in 0..6 {
            arena.insert(i);
        }
        arena.remove(4);
        arena.remove(0);
        let json = serde_json::to_string(&arena).unwrap();
        let mut restored: Arena<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.insert(100), arena.insert(100));
        assert_eq!(restored.insert(101), arena.insert(101));
        assert_eq!(restored, arena);
    }

    #[test]
    fn get2_mut_returns_in_argument_order() {
        let mut arena = Arena::new();
        arena.insert(1);
        arena.insert(2);
        let (a, b) = arena.get2_mut(1, 0).unwrap();
        assert_eq!((*a, *b), (2, 1));
        assert!(arena.get2_mut(0, 0).is_none());
        assert!(arena.get2_mut(0, 9).is_none());
    }

    #[test]
    fn iteration_is_ascending_and_skips_holes() {
        let mut arena = Arena::new();
        for i in 0..5 {
            arena.insert(i * 10);
        }
        arena.remove(2);
        let keys: Vec<u32> = arena.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![0, 1, 3, 4]);
    }
}

use std::collections::VecDeque;
use std::marker::PhantomData;

use super::ResourceId;

/// Free-list backed id space over a dense slot store.
///
/// Slot `0` is reserved so raw id `0` can mean "no resource". Slots are never
/// removed: a destroyed entry leaves an empty slot behind, and the id is handed
/// out again in FIFO order of release before the store grows.
///
/// Performance characteristics:
/// - `next()`, `get()`, `insert()`, `take()` are O(1)
/// - the store only grows, by one slot per fresh id
#[derive(Debug)]
pub struct IdAllocator<I, T> {
    slots: Vec<Option<T>>,
    free: VecDeque<u32>,
    _id: PhantomData<I>,
}

impl<I: ResourceId, T> IdAllocator<I, T> {
    pub fn new() -> Self {
        Self {
            slots: vec![None],
            free: VecDeque::new(),
            _id: PhantomData,
        }
    }

    /// Returns the oldest released id, or grows the store by one slot.
    ///
    /// A reissued slot is always empty, so the caller sees the same state as
    /// for a freshly grown id.
    pub fn next(&mut self) -> I {
        if let Some(raw) = self.free.pop_front() {
            return I::from_raw(raw);
        }

        self.slots.push(None);
        I::from_raw((self.slots.len() - 1) as u32)
    }

    /// Queues `id` for reuse and empties its slot.
    ///
    /// Returns the entry that was still stored there, if any. Releasing the
    /// reserved id or an id that was never issued is ignored.
    pub fn release(&mut self, id: I) -> Option<T> {
        let raw = id.raw();
        if raw == 0 || raw as usize >= self.slots.len() {
            log::warn!("release of {id:?} outside the issued range ignored");
            return None;
        }
        debug_assert!(!self.free.contains(&raw), "{id:?} released twice");

        self.free.push_back(raw);
        self.slots[raw as usize].take()
    }

    /// Stores `entry` in the slot of `id`, returning the previous occupant.
    ///
    /// Ids beyond the issued range extend the store; the engine is allowed to
    /// create resources under ids it did not obtain from `next()`.
    pub fn insert(&mut self, id: I, entry: T) -> Option<T> {
        let idx = id.raw() as usize;
        debug_assert!(idx != 0, "insert into reserved slot 0");
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx].replace(entry)
    }

    /// Removes the entry of `id` without releasing the id.
    pub fn take(&mut self, id: I) -> Option<T> {
        self.slots.get_mut(id.raw() as usize)?.take()
    }

    #[inline]
    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.raw() as usize)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.raw() as usize)?.as_mut()
    }

    #[inline]
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Number of slots ever issued, excluding the reserved one.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of slots currently holding an entry.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Iterates live entries with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|e| (I::from_raw(i as u32), e)))
    }

    /// Empties every slot, returning the entries in id order.
    pub fn drain(&mut self) -> Vec<T> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

impl<I: ResourceId, T> Default for IdAllocator<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Fixed-size slot pool for the solver's free-rectangle records.
//!
//! The search allocates and discards records at a rate proportional to the
//! branching factor (often thousands per item), so slots are recycled
//! through an intrusive free list instead of going back to the system
//! allocator. Backing storage grows one page worth of slots at a time.
//! Handles carry a generation so a handle kept past `remove` is inert
//! rather than aliasing whatever the slot holds next.

use std::marker::PhantomData;

const PAGE_SIZE: usize = 4096;

/// Handle to an occupied slot in a [`Pool`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// The pool cannot grow: the configured slot budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    Exhausted { limit: usize },
}

impl std::fmt::Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { limit } => write!(f, "slot pool exhausted (limit {limit})"),
        }
    }
}

impl std::error::Error for PoolError {}

pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    live: usize,
    limit: usize,
}

impl<T> Pool<T> {
    /// Pool with no backing storage yet and no slot budget.
    pub fn new() -> Self {
        Self::with_limit(u32::MAX as usize)
    }

    /// Pool that refuses to grow past `limit` slots. Exceeding the budget
    /// surfaces as [`PoolError::Exhausted`], the resource-exhaustion signal
    /// of the solver.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            live: 0,
            limit,
        }
    }

    /// Number of occupied slots.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Slots per growth step: as many as fit in one page, minimum 1.
    fn slots_per_page() -> usize {
        (PAGE_SIZE / size_of::<Slot<T>>()).max(1)
    }

    fn grow(&mut self) -> Result<(), PoolError> {
        let want = Self::slots_per_page().min(self.limit.saturating_sub(self.slots.len()));
        if want == 0 {
            return Err(PoolError::Exhausted { limit: self.limit });
        }
        self.slots.reserve(want);
        for _ in 0..want {
            let index = self.slots.len() as u32;
            self.slots.push(Slot::Vacant {
                generation: 0,
                next_free: self.free_head,
            });
            self.free_head = Some(index);
        }
        Ok(())
    }

    /// O(1) except when a new page of slots must be linked in.
    pub fn insert(&mut self, value: T) -> Result<Handle<T>, PoolError> {
        if self.free_head.is_none() {
            self.grow()?;
        }
        let index = self.free_head.expect("grow links at least one slot");
        let slot = &mut self.slots[index as usize];
        let (generation, next_free) = match *slot {
            Slot::Vacant {
                generation,
                next_free,
            } => (generation, next_free),
            Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
        };
        *slot = Slot::Occupied { generation, value };
        self.free_head = next_free;
        self.live += 1;
        Ok(Handle {
            index,
            generation,
            _marker: PhantomData,
        })
    }

    /// Returns the slot to the free list. A stale handle (already removed)
    /// yields `None` and leaves the pool untouched.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == handle.generation => {
                let vacant = Slot::Vacant {
                    generation: handle.generation.wrapping_add(1),
                    next_free: self.free_head,
                };
                let Slot::Occupied { value, .. } = std::mem::replace(slot, vacant) else {
                    unreachable!()
                };
                self.free_head = Some(handle.index);
                self.live -= 1;
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        match self.slots.get(handle.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == handle.generation => {
                Some(value)
            }
            _ => None,
        }
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<Handle<T>> for Pool<T> {
    type Output = T;

    /// Panics on a stale handle. Exclusive handle ownership in the solver
    /// makes that a logic bug, not a runtime condition.
    fn index(&self, handle: Handle<T>) -> &T {
        self.get(handle).expect("stale pool handle")
    }
}

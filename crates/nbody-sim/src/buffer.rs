/// Two resources with rotating read/write roles.
///
/// `front` is the slot readers use this frame, `back` the slot writers fill.
/// [`swap`](DoubleBuffer::swap) exchanges the roles by flipping one flag; the
/// resources themselves never move, so handles stay valid across swaps.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    swapped: bool,
    swaps: u64,
}

impl<T> DoubleBuffer<T> {
    /// `front` starts as the readable slot, `back` as the writable one.
    pub fn new(front: T, back: T) -> Self {
        Self {
            slots: [front, back],
            swapped: false,
            swaps: 0,
        }
    }

    #[inline]
    fn front_index(&self) -> usize {
        usize::from(self.swapped)
    }

    #[inline]
    fn back_index(&self) -> usize {
        1 - self.front_index()
    }

    #[inline]
    pub fn front(&self) -> &T {
        &self.slots[self.front_index()]
    }

    #[inline]
    pub fn back(&self) -> &T {
        &self.slots[self.back_index()]
    }

    #[inline]
    pub fn front_mut(&mut self) -> &mut T {
        let i = self.front_index();
        &mut self.slots[i]
    }

    #[inline]
    pub fn back_mut(&mut self) -> &mut T {
        let i = self.back_index();
        &mut self.slots[i]
    }

    /// Exchanges front and back.
    #[inline]
    pub fn swap(&mut self) {
        self.swapped = !self.swapped;
        self.swaps = self.swaps.wrapping_add(1);
    }

    /// Number of swaps since construction.
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }

    /// Returns `(front, back)` in their current roles.
    pub fn into_inner(self) -> (T, T) {
        let [a, b] = self.slots;
        if self.swapped { (b, a) } else { (a, b) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_and_back_never_alias() {
        let mut db = DoubleBuffer::new(1, 2);
        for _ in 0..5 {
            assert!(!std::ptr::eq(db.front(), db.back()));
            db.swap();
        }
    }

    #[test]
    fn initial_orientation() {
        let db = DoubleBuffer::new("a", "b");
        assert_eq!(*db.front(), "a");
        assert_eq!(*db.back(), "b");
        assert_eq!(db.swap_count(), 0);
    }

    #[test]
    fn one_swap_exchanges_roles() {
        let mut db = DoubleBuffer::new("a", "b");
        db.swap();
        assert_eq!(*db.front(), "b");
        assert_eq!(*db.back(), "a");
        assert_eq!(db.swap_count(), 1);
    }

    #[test]
    fn two_swaps_are_identity() {
        let mut db = DoubleBuffer::new("a", "b");
        let front = db.front() as *const _;
        db.swap();
        db.swap();
        assert!(std::ptr::eq(db.front(), front));
        assert_eq!(*db.back(), "b");
    }

    #[test]
    fn swap_does_not_move_values() {
        let mut db = DoubleBuffer::new(vec![1u8; 4], vec![2u8; 4]);
        let heap_a = db.front().as_ptr();
        db.swap();
        assert_eq!(db.back().as_ptr(), heap_a);
    }

    #[test]
    fn back_mut_writes_become_front_after_swap() {
        let mut db = DoubleBuffer::new(0, 0);
        *db.back_mut() = 7;
        db.swap();
        assert_eq!(*db.front(), 7);
        *db.front_mut() += 1;
        assert_eq!(*db.front(), 8);
    }

    #[test]
    fn into_inner_follows_orientation() {
        let mut db = DoubleBuffer::new('x', 'y');
        db.swap();
        assert_eq!(db.into_inner(), ('y', 'x'));
    }
}

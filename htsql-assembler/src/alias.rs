use std::cell::Cell;

use smol_str::SmolStr;

/// Hands out `t0`, `t1`, ... in construction order. One allocator per
/// `compile` call, shared by every frame built during assembly, so that
/// alias assignment is a single monotonic counter walked depth-first over
/// the term tree — deterministic regardless of how the tree is shaped
/// (§5 "deterministic alias assignment").
#[derive(Debug, Default)]
pub struct AliasAllocator {
    next: Cell<u32>,
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self { next: Cell::new(0) }
    }

    pub fn next(&self) -> SmolStr {
        let n = self.next.get();
        self.next.set(n + 1);
        SmolStr::new(format!("t{n}"))
    }
}

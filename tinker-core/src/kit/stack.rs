//! Native stack headroom for the recursive passes
//!
//! Parsing, checking and evaluation all recurse over the syntax tree. Each
//! recursion point runs through [`guarded`], which moves onto a fresh heap
//! segment when the current stack runs low. Logical limits (call depth,
//! nesting depth) still bound the recursion itself.

/// Remaining stack below which a new segment is allocated
const RED_ZONE: usize = 128 * 1024;

/// Size of each additional segment
const SEGMENT: usize = 2 * 1024 * 1024;

/// Run `f`, growing the stack first if it is close to exhausted
#[inline]
pub fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        guarded(|| {
            let pad = std::hint::black_box([n as u8; 512]);
            1 + depth(n - 1) + usize::from(pad[0] != n as u8)
        })
    }

    #[test]
    fn test_deep_recursion_survives_small_threads() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| depth(50_000))
            .unwrap();
        assert_eq!(handle.join().unwrap(), 50_000);
    }
}

//! A small value type for the sample suites to test.

/// Panic payload raised by [`Thingy::throws_badly_with`] when asked for stuff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stuff(pub &'static str);

/// Something with a size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Thingy {
    size: i32,
}

impl Thingy {
    /// Creates a thingy of the given size.
    pub const fn new(size: i32) -> Self {
        Self { size }
    }

    /// Returns true for a zero-sized thingy.
    pub const fn is_zero(self) -> bool {
        self.size == 0
    }

    /// Returns true, unless asked to panic.
    ///
    /// # Panics
    ///
    /// Panics if `do_panic` is set.
    pub fn throws_badly(self, do_panic: bool) -> bool {
        assert!(!do_panic, "thingy of size {} gave up", self.size);
        true
    }

    /// Returns true, unless asked to panic; with `stuff` set, the panic
    /// payload is a [`Stuff`].
    ///
    /// # Panics
    ///
    /// Panics if `do_panic` is set.
    pub fn throws_badly_with(self, do_panic: bool, stuff: bool) -> bool {
        if do_panic && stuff {
            std::panic::panic_any(Stuff("Message from within exception."));
        }
        self.throws_badly(do_panic)
    }
}

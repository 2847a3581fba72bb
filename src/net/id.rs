//! Identifiers correlating simulated entities with their visual shapes.

use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

pub type Id = u64;

/// Hands out increasing identifiers, never reusing one.
///
/// A project owns one generator and passes it to every entity it creates.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> IdGenerator {
        IdGenerator::starting_at(1)
    }

    /// Creates a generator continuing after ids already handed out, e.g. when
    /// a saved project is loaded.
    pub fn starting_at(next: Id) -> IdGenerator {
        IdGenerator {
            next: AtomicU64::new(next),
        }
    }

    /// Allocates the next identifier.
    pub fn next_id(&self) -> Id {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the identifier the next call to next_id() will hand out.
    pub fn peek(&self) -> Id {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> IdGenerator {
        IdGenerator::new()
    }
}

lazy_static! {
    static ref GLOBAL: IdGenerator = IdGenerator::new();
}

/// Returns the process wide generator, for callers without a project.
pub fn global() -> &'static IdGenerator {
    &GLOBAL
}

/// Allocates an identifier from the process wide generator.
pub fn next_id() -> Id {
    GLOBAL.next_id()
}

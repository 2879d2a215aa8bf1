// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::arguments::CallArgs;
use std::hash::{DefaultHasher, Hash, Hasher};

/**
Identifies one open timing span of a [Timer](crate::Timer).

Calls are keyed by the calling thread *and* a fingerprint of the function name
and its rendered arguments, so the same timer can be open for `f(1)`, `f(2)` and
`g(1)` on one thread at once. Scoped blocks are keyed by thread alone. A recursive
timer puts every span under the single [CallKey::Recursive] key, which is what lets
the outermost call report the whole recursion.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKey {
    Call { thread: u64, fingerprint: u64 },
    Scope { thread: u64 },
    Recursive,
}

impl CallKey {
    /// Key for a call to `name` with `args` on the current thread.
    pub fn for_call(name: &str, args: &CallArgs) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        args.fingerprint().hash(&mut hasher);
        CallKey::Call {
            thread: crate::sys::thread_ident(),
            fingerprint: hasher.finish(),
        }
    }

    /// Key for a scoped block on the current thread.
    pub fn for_scope() -> Self {
        CallKey::Scope {
            thread: crate::sys::thread_ident(),
        }
    }

    /// The thread the key belongs to; `None` for the recursion sentinel.
    pub fn thread(&self) -> Option<u64> {
        match self {
            CallKey::Call { thread, .. } | CallKey::Scope { thread } => Some(*thread),
            CallKey::Recursive => None,
        }
    }
}

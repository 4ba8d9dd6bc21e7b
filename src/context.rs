use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::ignore::IgnoreSet;
use crate::printer::Printer;
use crate::symloop::SymloopGuard;

/// Shared, read-only state for one search run.
///
/// Every task receives a handle to this at construction; nothing in here is
/// mutated during the search except the match flag and the guarded interiors
/// of the printer and the symloop set.
pub struct SearchContext {
    pub config: Config,
    pub root_ignores: Arc<IgnoreSet>,
    pub printer: Printer,
    pub symloop: SymloopGuard,
    match_found: AtomicBool,
}

impl SearchContext {
    pub fn new(config: Config, root_ignores: Arc<IgnoreSet>, printer: Printer) -> SearchContext {
        SearchContext {
            config,
            root_ignores,
            printer,
            symloop: SymloopGuard::new(),
            match_found: AtomicBool::new(false),
        }
    }

    pub fn found_match(&self) {
        self.match_found.store(true, Ordering::Relaxed);
    }

    pub fn any_match_found(&self) -> bool {
        self.match_found.load(Ordering::Relaxed)
    }
}

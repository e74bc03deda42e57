// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Thread-safe identifier allocation
//!
//! Hands out monotonically increasing `u64` identifiers and recycles released
//! ones. Used for entity IDs and rigid-body handles.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Allocator for reusable numeric identifiers
///
/// Released identifiers are handed out again (oldest first) before the
/// counter advances.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
    free_list: Mutex<VecDeque<u64>>,
}

impl IdAllocator {
    /// Create an allocator whose first fresh identifier is `init`
    pub fn new(init: u64) -> Self {
        IdAllocator {
            next: AtomicU64::new(init),
            free_list: Mutex::new(VecDeque::new()),
        }
    }

    /// The next fresh identifier, ignoring the free list
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }

    /// Allocate an identifier, preferring a released one
    pub fn allocate(&self) -> u64 {
        let recycled = self
            .free_list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match recycled {
            Some(id) => id,
            None => self.next.fetch_add(1, Ordering::AcqRel),
        }
    }

    /// Return an identifier to the free list
    pub fn release(&self, id: u64) {
        self.free_list
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(id);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Per-user state slots. Each slot is populated lazily by its owning user
/// task; `drain` is only called once every user task has finished.
pub struct UserArena<T> {
    slots: Mutex<HashMap<u64, Arc<tokio::sync::Mutex<Option<T>>>>>,
}

impl<T> Default for UserArena<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> UserArena<T> {
    /// Returns the slot for `user_id`, creating an empty one on first use.
    pub fn slot(&self, user_id: u64) -> Arc<tokio::sync::Mutex<Option<T>>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(user_id).or_default())
    }

    /// Removes and returns every populated slot's state.
    pub fn drain(&self) -> Vec<T> {
        let slots = {
            let mut guard = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        slots
            .into_values()
            .filter_map(|slot| slot.try_lock().ok().and_then(|mut state| state.take()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_per_user_and_drain_once() -> Result<(), String> {
        let arena: UserArena<u32> = UserArena::default();
        for user_id in 1..=3 {
            let slot = arena.slot(user_id);
            let mut state = slot
                .try_lock()
                .map_err(|err| format!("slot busy: {}", err))?;
            *state = Some(u32::try_from(user_id).map_err(|err| err.to_string())?.saturating_mul(10));
        }
        let again = arena.slot(2);
        let value = again
            .try_lock()
            .map_err(|err| format!("slot busy: {}", err))?
            .as_ref()
            .copied();
        if value != Some(20) {
            return Err(format!("Expected the same slot, got {:?}", value));
        }
        drop(again);

        let mut drained = arena.drain();
        drained.sort_unstable();
        if drained != vec![10, 20, 30] || !arena.drain().is_empty() {
            return Err(format!("Unexpected drain: {:?}", drained));
        }
        Ok(())
    }
}

use super::GpuError;

/// Lazily created resource with a one-way lifecycle.
///
/// `Uninitialized → Active → Released`. Once released, the slot never
/// recreates its value; a fresh owner must be built instead.
#[derive(Debug, Default)]
pub enum ResourceSlot<T> {
    #[default]
    Uninitialized,
    Active(T),
    Released,
}

impl<T> ResourceSlot<T> {
    /// Returns the live value, creating it on first use.
    pub fn ensure_created<F>(&mut self, what: &'static str, create: F) -> Result<&mut T, GpuError>
    where
        F: FnOnce() -> Result<T, GpuError>,
    {
        if let ResourceSlot::Released = self {
            return Err(GpuError::Released(what));
        }
        if let ResourceSlot::Uninitialized = self {
            *self = ResourceSlot::Active(create()?);
        }
        match self {
            ResourceSlot::Active(value) => Ok(value),
            _ => Err(GpuError::Released(what)),
        }
    }

    /// Moves the slot to `Released`, handing back the live value if any.
    pub fn release(&mut self) -> Option<T> {
        match std::mem::replace(self, ResourceSlot::Released) {
            ResourceSlot::Active(value) => Some(value),
            _ => None,
        }
    }

    /// Drops a live value and returns to `Uninitialized` so the next
    /// `ensure_created` builds a new one. A released slot stays released.
    pub fn discard(&mut self) -> Option<T> {
        match self {
            ResourceSlot::Active(_) => match std::mem::take(self) {
                ResourceSlot::Active(value) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, ResourceSlot::Active(_))
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        matches!(self, ResourceSlot::Released)
    }
}

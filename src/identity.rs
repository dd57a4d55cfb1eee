//! Bidirectional mapping between capture buffers and display surfaces.
//!
//! Both handles wrap the same memory (for example a dmabuf exported by the
//! capture driver and imported as a framebuffer). Pairings are registered
//! once while buffers are allocated and are read-only afterwards.

use std::collections::HashMap;

use crate::traits::{BufferId, ExchangeError, Result, SurfaceId};

/// Fixed bijection between [`BufferId`]s and [`SurfaceId`]s.
#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
    to_surface: HashMap<BufferId, SurfaceId>,
    to_buffer: HashMap<SurfaceId, BufferId>,
}

impl IdentityMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(buffer, surface)` pairs, failing on the first
    /// duplicate.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (BufferId, SurfaceId)>,
    {
        let mut map = Self::new();
        for (buffer, surface) in pairs {
            map.register(buffer, surface)?;
        }
        Ok(map)
    }

    /// Pair `buffer` with `surface`.
    ///
    /// Fails with [`ExchangeError::DuplicateBinding`] if either side is
    /// already registered; the map is left untouched in that case.
    pub fn register(&mut self, buffer: BufferId, surface: SurfaceId) -> Result<()> {
        if self.to_surface.contains_key(&buffer) || self.to_buffer.contains_key(&surface) {
            return Err(ExchangeError::DuplicateBinding { buffer, surface });
        }

        self.to_surface.insert(buffer, surface);
        self.to_buffer.insert(surface, buffer);
        Ok(())
    }

    /// Surface wrapping the same memory as `buffer`.
    pub fn surface_of(&self, buffer: BufferId) -> Result<SurfaceId> {
        self.to_surface
            .get(&buffer)
            .copied()
            .ok_or(ExchangeError::UnknownBuffer(buffer))
    }

    /// Buffer wrapping the same memory as `surface`.
    pub fn buffer_of(&self, surface: SurfaceId) -> Result<BufferId> {
        self.to_buffer
            .get(&surface)
            .copied()
            .ok_or(ExchangeError::UnknownSurface(surface))
    }

    /// Number of registered pairs.
    pub fn len(&self) -> usize {
        self.to_surface.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.to_surface.is_empty()
    }

    /// All registered buffers, in handle order.
    pub fn buffers(&self) -> Vec<BufferId> {
        let mut buffers: Vec<BufferId> = self.to_surface.keys().copied().collect();
        buffers.sort_unstable();
        buffers
    }
}

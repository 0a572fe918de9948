// Vulkan surface handles
//
// The application never sees a native VkSurfaceKHR. It gets an id
// that indexes a table of reference counted wrappers. Dropping the
// last reference to a wrapper destroys the native surface.
//
// The table lives inside the driver's global lock, so the counts
// are only ever changed with that lock held.
//
// Austin Shafer - 2020
use super::NativeVulkan;
use crate::context::Hwnd;
use crate::error::{DriverError, Result};
use ash::vk::{self, Handle};
use utils::log;

use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// The native surface behind an application surface handle
pub struct NativeSurfaceHandle {
    nsh_native: Arc<dyn NativeVulkan>,
    nsh_instance: vk::Instance,
    nsh_surface: vk::SurfaceKHR,
    /// the window this surface presents for
    nsh_hwnd: Hwnd,
}

impl NativeSurfaceHandle {
    pub fn new(
        native: Arc<dyn NativeVulkan>,
        instance: vk::Instance,
        surface: vk::SurfaceKHR,
        hwnd: Hwnd,
    ) -> Self {
        Self {
            nsh_native: native,
            nsh_instance: instance,
            nsh_surface: surface,
            nsh_hwnd: hwnd,
        }
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.nsh_surface
    }
}

impl Drop for NativeSurfaceHandle {
    fn drop(&mut self) {
        log::debug!(
            "Releasing native surface {:#x} for window {:#x}",
            self.nsh_surface.as_raw(),
            self.nsh_hwnd
        );
        // The instance and surface were valid when this handle was
        // made, and the application may not destroy the instance
        // while it still has surfaces from it.
        unsafe {
            self.nsh_native
                .destroy_surface(self.nsh_instance, self.nsh_surface);
        }
    }
}

/// The application facing surface handles
pub struct SurfaceTable {
    st_next_id: u64,
    st_handles: HashMap<u64, Arc<NativeSurfaceHandle>>,
}

impl SurfaceTable {
    pub fn new() -> Self {
        Self {
            st_next_id: 1,
            st_handles: HashMap::new(),
        }
    }

    /// Make room for one more handle, so that `insert` cannot fail
    /// after the native surface exists.
    pub fn reserve(&mut self) -> Result<()> {
        self.st_handles
            .try_reserve(1)
            .map_err(|_| DriverError::OUT_OF_HOST_MEMORY)
    }

    /// Store a wrapper with a count of one and hand out its id
    pub fn insert(&mut self, handle: NativeSurfaceHandle) -> vk::SurfaceKHR {
        let id = self.st_next_id;
        self.st_next_id += 1;
        self.st_handles.insert(id, Arc::new(handle));

        vk::SurfaceKHR::from_raw(id)
    }

    /// Take a reference to the wrapper behind `handle`
    pub fn get(&self, handle: vk::SurfaceKHR) -> Result<Arc<NativeSurfaceHandle>> {
        self.st_handles
            .get(&handle.as_raw())
            .cloned()
            .ok_or(DriverError::INVALID_HANDLE)
    }

    /// Drop the table's reference. The native surface goes away once
    /// no one else holds the wrapper.
    pub fn release(&mut self, handle: vk::SurfaceKHR) -> Result<Weak<NativeSurfaceHandle>> {
        let wrapper = self
            .st_handles
            .remove(&handle.as_raw())
            .ok_or(DriverError::INVALID_HANDLE)?;

        Ok(Arc::downgrade(&wrapper))
    }

    /// Number of live references to the wrapper behind `handle`
    pub fn refcount(&self, handle: vk::SurfaceKHR) -> usize {
        self.st_handles
            .get(&handle.as_raw())
            .map(Arc::strong_count)
            .unwrap_or(0)
    }
}

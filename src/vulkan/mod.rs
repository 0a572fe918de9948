// The Vulkan WSI bridge
//
// Applications ask for win32 surfaces. We hand them a surface made
// on our own compositor surface instead, and otherwise pass their
// calls through to the native library. Surface handles are wrapped
// so we can find our native surface again from the handle the
// application gives us.
//
// Austin Shafer - 2020
pub mod handle;
pub mod loader;

pub use loader::{AshVulkan, NativeVulkan};

use crate::context::{Hwnd, NO_WINDOW};
use crate::driver::{Backend, Driver, DriverState, Host};
use crate::error::{DriverError, Result};
use crate::surface::PresentationSurface;
use handle::NativeSurfaceHandle;
use utils::log;

use ash::extensions::khr;
use ash::prelude::VkResult;
use ash::vk::{self, Handle};

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::Arc;

/// Spec version reported for the win32 surface extension
pub const WIN32_SURFACE_SPEC_VERSION: u32 = 6;
/// Dispatch rounds to wait for a new surface to be configured
pub const REALIZE_ROUNDS: usize = 8;

/// Global functions, answered for a null instance
const GLOBAL_FUNCTIONS: &[&str] = &[
    "vkCreateInstance",
    "vkEnumerateInstanceExtensionProperties",
    "vkGetInstanceProcAddr",
];

/// Device level functions the bridge provides itself
const DEVICE_FUNCTIONS: &[&str] = &[
    "vkCreateSwapchainKHR",
    "vkDestroySwapchainKHR",
    "vkGetDeviceGroupSurfacePresentModesKHR",
    "vkGetDeviceProcAddr",
    "vkGetSwapchainImagesKHR",
    "vkQueuePresentKHR",
];

/// Instance level functions the bridge provides itself
const INSTANCE_FUNCTIONS: &[&str] = &[
    "vkCreateWin32SurfaceKHR",
    "vkDestroyInstance",
    "vkDestroySurfaceKHR",
    "vkGetPhysicalDevicePresentRectanglesKHR",
    "vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
    "vkGetPhysicalDeviceSurfaceFormatsKHR",
    "vkGetPhysicalDeviceSurfacePresentModesKHR",
    "vkGetPhysicalDeviceSurfaceSupportKHR",
    "vkGetPhysicalDeviceWin32PresentationSupportKHR",
];

/// Where a function name resolves to
#[derive(Debug, Copy, Clone)]
pub enum ProcAddr {
    /// One of the driver's own entry points, by name
    Driver(&'static str),
    /// A native function from the loaded library
    Native(unsafe extern "system" fn()),
}

impl PartialEq for ProcAddr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProcAddr::Driver(a), ProcAddr::Driver(b)) => a == b,
            (ProcAddr::Native(a), ProcAddr::Native(b)) => *a as usize == *b as usize,
            _ => false,
        }
    }
}

fn find_function(list: &[&'static str], name: &str) -> Option<ProcAddr> {
    list.iter()
        .find(|f| **f == name)
        .map(|f| ProcAddr::Driver(*f))
}

/// Copy `name` into a fixed size extension name buffer
fn write_extension_name(dst: &mut [c_char; vk::MAX_EXTENSION_NAME_SIZE], name: &CStr) {
    let bytes = name.to_bytes();
    let len = bytes.len().min(dst.len() - 1);

    for (d, s) in dst.iter_mut().zip(bytes[..len].iter()) {
        *d = *s as c_char;
    }
    for d in dst[len..].iter_mut() {
        *d = 0;
    }
}

fn log_allocator(func: &str, allocator: Option<&vk::AllocationCallbacks>) {
    if allocator.is_some() {
        log::error!("{}: allocation callbacks are not implemented, ignoring them", func);
    }
}

impl<B: Backend, H: Host> Driver<B, H> {
    /// The native vulkan library, loaded on first use
    ///
    /// None if no candidate library could be loaded. Everything that
    /// is not vulkan keeps working in that case.
    pub fn get_vulkan_driver(&self) -> Option<Arc<dyn NativeVulkan>> {
        self.d_vulkan
            .get_or_init(|| (self.d_vulkan_loader)(&self.d_ctx.dc_config))
            .clone()
    }

    fn native(&self) -> VkResult<Arc<dyn NativeVulkan>> {
        self.get_vulkan_driver()
            .ok_or(vk::Result::ERROR_INCOMPATIBLE_DRIVER)
    }

    /// Create an instance with the win32 surface extension swapped
    /// for the wayland one. Layers are left to the native loader.
    pub unsafe fn create_instance(
        &self,
        info: &vk::InstanceCreateInfo,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::Instance> {
        log_allocator("create_instance", allocator);
        let native = self.native()?;

        let win32 = khr::Win32Surface::name();
        let wayland = khr::WaylandSurface::name();
        let requested: &[*const c_char] = match info.enabled_extension_count {
            0 => &[],
            n => std::slice::from_raw_parts(info.pp_enabled_extension_names, n as usize),
        };
        let extensions: Vec<*const c_char> = requested
            .iter()
            .map(|ext| match CStr::from_ptr(*ext) == win32 {
                true => wayland.as_ptr(),
                false => *ext,
            })
            .collect();

        let mut host_info = *info;
        host_info.enabled_layer_count = 0;
        host_info.pp_enabled_layer_names = std::ptr::null();
        host_info.enabled_extension_count = extensions.len() as u32;
        host_info.pp_enabled_extension_names = extensions.as_ptr();

        native.create_instance(&host_info)
    }

    pub unsafe fn destroy_instance(
        &self,
        instance: vk::Instance,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        log_allocator("destroy_instance", allocator);
        if let Some(native) = self.get_vulkan_driver() {
            native.destroy_instance(instance);
        }
    }

    /// The native instance extensions, with the wayland surface
    /// extension reported as the win32 one
    pub unsafe fn enumerate_instance_extension_properties(
        &self,
        layer: Option<&CStr>,
    ) -> VkResult<Vec<vk::ExtensionProperties>> {
        if let Some(name) = layer {
            log::error!("Layer {:?} enumeration is not supported by the driver", name);
            return Err(vk::Result::ERROR_LAYER_NOT_PRESENT);
        }

        let mut props = self.native()?.enumerate_instance_extension_properties()?;
        let wayland = khr::WaylandSurface::name();
        for prop in props.iter_mut() {
            if CStr::from_ptr(prop.extension_name.as_ptr()) == wayland {
                write_extension_name(&mut prop.extension_name, khr::Win32Surface::name());
                prop.spec_version = WIN32_SURFACE_SPEC_VERSION;
            }
        }

        Ok(props)
    }

    /// Create a presentation surface for `hwnd`
    ///
    /// Any existing presentation surface is destroyed first, there
    /// is only ever one. Windows that are hidden or that belong to a
    /// denied class get a surface but are not activated.
    pub unsafe fn create_win32_surface(
        &self,
        instance: vk::Instance,
        hwnd: Hwnd,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::SurfaceKHR> {
        log_allocator("create_win32_surface", allocator);
        let native = self.native()?;
        let ctx = &self.d_ctx;

        let info = self.d_host.window_info(hwnd);
        if !info.toplevel {
            log::error!("Window {:#x} is not a toplevel window", hwnd);
            return Err(DriverError::INCOMPATIBLE_WINDOW.as_vk_result());
        }
        let visible = info.visible && !ctx.dc_config.is_denied_class(&info.class);

        let mut st = self.state();
        self.destroy_presentation(&mut st);

        if visible {
            ctx.set_gpu_window(hwnd);
            self.d_host.activate_window(hwnd, ctx.dc_config.surface_extent);
        }

        // Set before connecting so the pointer binds the gpu sink
        ctx.set_gpu_active(true);

        match self.build_presentation(&mut st, native, instance, hwnd) {
            Ok(handle) => {
                log::debug!(
                    "Created surface {:#x} for window {:#x}",
                    handle.as_raw(),
                    hwnd
                );
                Ok(handle)
            }
            Err(e) => {
                log::error!("Could not create a surface for window {:#x}: {}", hwnd, e);
                // keys fall back to the focus window
                ctx.set_gpu_window(NO_WINDOW);
                ctx.set_gpu_active(false);
                Err(e.as_vk_result())
            }
        }
    }

    /// Everything in surface creation that can fail. On failure no
    /// presentation surface or handle is left behind.
    unsafe fn build_presentation(
        &self,
        st: &mut DriverState<B>,
        native: Arc<dyn NativeVulkan>,
        instance: vk::Instance,
        hwnd: Hwnd,
    ) -> Result<vk::SurfaceKHR> {
        st.ds_handles.reserve()?;
        self.connect_once(st)?;

        let backend = st.ds_backend.as_mut().ok_or(DriverError::NO_DISPLAY)?;
        let (width, height) = self.d_ctx.dc_config.surface_extent;
        let surface = PresentationSurface::create(backend, width, height)?;

        let realized = (|| {
            for _ in 0..REALIZE_ROUNDS {
                if backend.is_realized(surface.base()) {
                    break;
                }
                backend.dispatch_round()?;
            }
            surface.swap_buffers(backend)
        })();
        if let Err(e) = realized {
            surface.destroy(backend);
            return Err(e);
        }

        let native_surface = match native.create_wayland_surface(
            instance,
            backend.display_ptr(),
            backend.surface_ptr(surface.base()),
        ) {
            Ok(s) => s,
            Err(e) => {
                surface.destroy(backend);
                return Err(DriverError::VULKAN(e));
            }
        };

        st.ds_surface = Some(surface);
        let handle = st.ds_handles.insert(NativeSurfaceHandle::new(
            native,
            instance,
            native_surface,
            hwnd,
        ));

        Ok(handle)
    }

    /// Release the application's handle. A null handle is ignored.
    pub unsafe fn destroy_surface(
        &self,
        _instance: vk::Instance,
        surface: vk::SurfaceKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        log_allocator("destroy_surface", allocator);
        if surface == vk::SurfaceKHR::null() {
            return;
        }

        // The native surface is destroyed with the last reference,
        // which is dropped here under the lock
        if let Err(e) = self.state().ds_handles.release(surface) {
            log::error!("Could not destroy surface {:#x}: {}", surface.as_raw(), e);
        }
    }

    /// The native surface behind an application handle
    fn unwrap_surface(&self, surface: vk::SurfaceKHR) -> VkResult<Arc<NativeSurfaceHandle>> {
        self.state()
            .ds_handles
            .get(surface)
            .map_err(|e| e.as_vk_result())
    }

    /// Live references to the native surface behind `surface`, 0 once
    /// the application has released it
    pub fn surface_refcount(&self, surface: vk::SurfaceKHR) -> usize {
        self.state().ds_handles.refcount(surface)
    }

    pub unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> VkResult<vk::SwapchainKHR> {
        log_allocator("create_swapchain", allocator);
        let native = self.native()?;
        let wrapped = self.unwrap_surface(info.surface)?;

        let mut host_info = *info;
        host_info.surface = wrapped.surface();
        native.create_swapchain(device, &host_info)
    }

    pub unsafe fn destroy_swapchain(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        allocator: Option<&vk::AllocationCallbacks>,
    ) {
        log_allocator("destroy_swapchain", allocator);
        if let Some(native) = self.get_vulkan_driver() {
            native.destroy_swapchain(device, swapchain);
        }
    }

    pub unsafe fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>> {
        self.native()?.get_swapchain_images(device, swapchain)
    }

    pub unsafe fn queue_present(&self, queue: vk::Queue, info: &vk::PresentInfoKHR) -> vk::Result {
        match self.native() {
            Ok(native) => native.queue_present(queue, info),
            Err(e) => e,
        }
    }

    pub unsafe fn get_physical_device_surface_support(
        &self,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        let native = self.native()?;
        let wrapped = self.unwrap_surface(surface)?;
        native.get_physical_device_surface_support(pdev, queue_family, wrapped.surface())
    }

    pub unsafe fn get_physical_device_surface_capabilities(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        let native = self.native()?;
        let wrapped = self.unwrap_surface(surface)?;
        native.get_physical_device_surface_capabilities(pdev, wrapped.surface())
    }

    pub unsafe fn get_physical_device_surface_formats(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        let native = self.native()?;
        let wrapped = self.unwrap_surface(surface)?;
        native.get_physical_device_surface_formats(pdev, wrapped.surface())
    }

    pub unsafe fn get_physical_device_surface_present_modes(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        let native = self.native()?;
        let wrapped = self.unwrap_surface(surface)?;
        native.get_physical_device_surface_present_modes(pdev, wrapped.surface())
    }

    pub unsafe fn get_physical_device_present_rectangles(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::Rect2D>> {
        let native = self.native()?;
        let wrapped = self.unwrap_surface(surface)?;
        native.get_physical_device_present_rectangles(pdev, wrapped.surface())
    }

    pub unsafe fn get_device_group_surface_present_modes(
        &self,
        device: vk::Device,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::DeviceGroupPresentModeFlagsKHR> {
        let native = self.native()?;
        let wrapped = self.unwrap_surface(surface)?;
        native.get_device_group_surface_present_modes(device, wrapped.surface())
    }

    /// Win32 presentation support is wayland presentation support
    /// on our display connection
    pub unsafe fn get_physical_device_win32_presentation_support(
        &self,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
    ) -> bool {
        let native = match self.get_vulkan_driver() {
            Some(n) => n,
            None => return false,
        };

        let display = {
            let mut st = self.state();
            if let Err(e) = self.connect_once(&mut st) {
                log::error!("Could not connect to the compositor: {}", e);
                return false;
            }
            match st.ds_backend.as_ref() {
                Some(b) => b.display_ptr(),
                None => return false,
            }
        };

        native.get_physical_device_wayland_presentation_support(pdev, queue_family, display)
    }

    /// Resolve a function for `instance`, preferring our own entry
    /// points. A null instance only resolves global functions.
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        name: &CStr,
    ) -> Option<ProcAddr> {
        let native = self.get_vulkan_driver()?;
        let fname = name.to_str().ok()?;

        if let Some(f) = find_function(GLOBAL_FUNCTIONS, fname) {
            return Some(f);
        }
        if instance == vk::Instance::null() {
            return None;
        }
        if let Some(f) = find_function(INSTANCE_FUNCTIONS, fname)
            .or_else(|| find_function(DEVICE_FUNCTIONS, fname))
        {
            return Some(f);
        }

        native
            .get_instance_proc_addr(instance, name)
            .map(ProcAddr::Native)
    }

    /// Resolve a device function, preferring our own entry points
    pub unsafe fn get_device_proc_addr(
        &self,
        device: vk::Device,
        name: &CStr,
    ) -> Option<ProcAddr> {
        let native = self.get_vulkan_driver()?;
        if let Some(f) = name
            .to_str()
            .ok()
            .and_then(|n| find_function(DEVICE_FUNCTIONS, n))
        {
            return Some(f);
        }

        native
            .get_device_proc_addr(device, name)
            .map(ProcAddr::Native)
    }
}

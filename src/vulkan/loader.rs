// Loading the native Vulkan library
//
// The system's vulkan loader is opened at runtime from a list of
// candidate names. Everything the bridge delegates to goes through
// the NativeVulkan trait so the bridge never touches the library
// directly.
//
// Austin Shafer - 2020
use crate::context::lock;
use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use ash::Entry;
use utils::log;

use std::collections::HashMap;
use std::ffi::CStr;
use std::os::raw::c_void;
use std::ptr;
use std::sync::{Arc, Mutex};

/// The native entry points the bridge delegates to
///
/// All of these are thin wrappers over the matching native call, so
/// they carry the same safety requirements: every handle passed in
/// must be a live native handle.
pub trait NativeVulkan: Send + Sync {
    unsafe fn create_instance(&self, info: &vk::InstanceCreateInfo) -> VkResult<vk::Instance>;
    unsafe fn destroy_instance(&self, instance: vk::Instance);
    unsafe fn enumerate_instance_extension_properties(
        &self,
    ) -> VkResult<Vec<vk::ExtensionProperties>>;

    unsafe fn create_wayland_surface(
        &self,
        instance: vk::Instance,
        display: *mut c_void,
        surface: *mut c_void,
    ) -> VkResult<vk::SurfaceKHR>;
    unsafe fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR);

    unsafe fn get_physical_device_surface_support(
        &self,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    unsafe fn get_physical_device_surface_capabilities(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    unsafe fn get_physical_device_surface_formats(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    unsafe fn get_physical_device_surface_present_modes(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;
    /// ERROR_EXTENSION_NOT_PRESENT if the library does not have it
    unsafe fn get_physical_device_present_rectangles(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::Rect2D>>;
    unsafe fn get_physical_device_wayland_presentation_support(
        &self,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
        display: *mut c_void,
    ) -> bool;

    unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR,
    ) -> VkResult<vk::SwapchainKHR>;
    unsafe fn destroy_swapchain(&self, device: vk::Device, swapchain: vk::SwapchainKHR);
    unsafe fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>>;
    /// Returns the raw result so SUBOPTIMAL_KHR reaches the caller
    unsafe fn queue_present(&self, queue: vk::Queue, info: &vk::PresentInfoKHR) -> vk::Result;
    /// ERROR_EXTENSION_NOT_PRESENT if the library does not have it
    unsafe fn get_device_group_surface_present_modes(
        &self,
        device: vk::Device,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::DeviceGroupPresentModeFlagsKHR>;

    unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        name: &CStr,
    ) -> vk::PFN_vkVoidFunction;
    unsafe fn get_device_proc_addr(&self, device: vk::Device, name: &CStr)
        -> vk::PFN_vkVoidFunction;
}

/// Run a two call enumeration: once for the count, once for the data
unsafe fn read_into_vec<T, F>(mut f: F) -> VkResult<Vec<T>>
where
    F: FnMut(&mut u32, *mut T) -> vk::Result,
{
    loop {
        let mut count = 0;
        f(&mut count, ptr::null_mut()).result()?;

        let mut data = Vec::with_capacity(count as usize);
        let res = f(&mut count, data.as_mut_ptr());
        if res != vk::Result::INCOMPLETE {
            res.result()?;
            data.set_len(count as usize);
            return Ok(data);
        }
    }
}

/// Function tables resolved against one instance
struct InstanceTable {
    it_instance: ash::Instance,
    it_surface: vk::KhrSurfaceFn,
    it_wayland: vk::KhrWaylandSurfaceFn,
    it_swapchain: vk::KhrSwapchainFn,
    it_has_present_rects: bool,
    it_has_group_modes: bool,
}

/// Tables for every live instance, keyed by the raw handle
///
/// Lookups hand out a shared table so native calls run with the map
/// unlocked. Presents can block on vblank.
struct TableMap<T> {
    tm_tables: Mutex<HashMap<u64, Arc<T>>>,
}

impl<T> TableMap<T> {
    fn new() -> Self {
        Self {
            tm_tables: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, instance: vk::Instance, table: T) {
        lock(&self.tm_tables).insert(instance.as_raw(), Arc::new(table));
    }

    fn remove(&self, instance: vk::Instance) -> Option<Arc<T>> {
        lock(&self.tm_tables).remove(&instance.as_raw())
    }

    fn get(&self, instance: vk::Instance) -> Option<Arc<T>> {
        lock(&self.tm_tables).get(&instance.as_raw()).cloned()
    }

    fn any(&self) -> Option<Arc<T>> {
        lock(&self.tm_tables).values().next().cloned()
    }
}

/// NativeVulkan over the system vulkan loader
pub struct AshVulkan {
    av_entry: Entry,
    av_instances: TableMap<InstanceTable>,
}

impl AshVulkan {
    /// Try each library name in turn. Failure is logged and
    /// reported as None so non-vulkan applications keep working.
    pub fn load(candidates: &[String]) -> Option<Self> {
        for name in candidates.iter() {
            // Loading runs the library's initializers, the vulkan
            // loader has none that can misbehave here
            match unsafe { Entry::load_from(name) } {
                Ok(entry) => {
                    log::debug!("Loaded native vulkan from {}", name);
                    return Some(Self {
                        av_entry: entry,
                        av_instances: TableMap::new(),
                    });
                }
                Err(e) => log::debug!("Could not load {}: {}", name, e),
            }
        }

        log::error!("Could not load a native vulkan library from {:?}", candidates);
        return None;
    }

    unsafe fn table_for(&self, instance: vk::Instance) -> InstanceTable {
        let entry = &self.av_entry;
        let load = |name: &CStr| {
            std::mem::transmute::<vk::PFN_vkVoidFunction, *const c_void>(
                entry.get_instance_proc_addr(instance, name.as_ptr()),
            )
        };
        let has = |name: &[u8]| {
            CStr::from_bytes_with_nul(name)
                .map(|n| entry.get_instance_proc_addr(instance, n.as_ptr()).is_some())
                .unwrap_or(false)
        };

        InstanceTable {
            it_instance: ash::Instance::load(entry.static_fn(), instance),
            it_surface: vk::KhrSurfaceFn::load(load),
            it_wayland: vk::KhrWaylandSurfaceFn::load(load),
            it_swapchain: vk::KhrSwapchainFn::load(load),
            it_has_present_rects: has(b"vkGetPhysicalDevicePresentRectanglesKHR\0"),
            it_has_group_modes: has(b"vkGetDeviceGroupSurfacePresentModesKHR\0"),
        }
    }

    /// Run `f` with the table for `instance`
    fn with_instance<T, F>(&self, instance: vk::Instance, f: F) -> Option<T>
    where
        F: FnOnce(&InstanceTable) -> T,
    {
        let table = self.av_instances.get(instance)?;
        Some(f(&table))
    }

    /// Run `f` with any instance's table
    ///
    /// Physical device and device level calls resolved through the
    /// loader dispatch on their first argument, so any instance's
    /// pointers will do.
    fn with_any<T, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&InstanceTable) -> T,
    {
        let table = self.av_instances.any()?;
        Some(f(&table))
    }
}

impl NativeVulkan for AshVulkan {
    unsafe fn create_instance(&self, info: &vk::InstanceCreateInfo) -> VkResult<vk::Instance> {
        let mut instance = vk::Instance::null();
        (self.av_entry.fp_v1_0().create_instance)(info, ptr::null(), &mut instance).result()?;

        let table = self.table_for(instance);
        self.av_instances.insert(instance, table);
        Ok(instance)
    }

    unsafe fn destroy_instance(&self, instance: vk::Instance) {
        if let Some(table) = self.av_instances.remove(instance) {
            table.it_instance.destroy_instance(None);
        }
    }

    unsafe fn enumerate_instance_extension_properties(
        &self,
    ) -> VkResult<Vec<vk::ExtensionProperties>> {
        let fp = self.av_entry.fp_v1_0();
        read_into_vec(|count, data| {
            (fp.enumerate_instance_extension_properties)(ptr::null(), count, data)
        })
    }

    unsafe fn create_wayland_surface(
        &self,
        instance: vk::Instance,
        display: *mut c_void,
        surface: *mut c_void,
    ) -> VkResult<vk::SurfaceKHR> {
        let info = vk::WaylandSurfaceCreateInfoKHR {
            display: display,
            surface: surface,
            ..Default::default()
        };

        self.with_instance(instance, |t| {
            let mut ret = vk::SurfaceKHR::null();
            (t.it_wayland.create_wayland_surface_khr)(instance, &info, ptr::null(), &mut ret)
                .result_with_success(ret)
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn destroy_surface(&self, instance: vk::Instance, surface: vk::SurfaceKHR) {
        self.with_instance(instance, |t| {
            (t.it_surface.destroy_surface_khr)(instance, surface, ptr::null())
        });
    }

    unsafe fn get_physical_device_surface_support(
        &self,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.with_any(|t| {
            let mut supported = vk::FALSE;
            (t.it_surface.get_physical_device_surface_support_khr)(
                pdev,
                queue_family,
                surface,
                &mut supported,
            )
            .result_with_success(supported == vk::TRUE)
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn get_physical_device_surface_capabilities(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.with_any(|t| {
            let mut caps = vk::SurfaceCapabilitiesKHR::default();
            (t.it_surface.get_physical_device_surface_capabilities_khr)(pdev, surface, &mut caps)
                .result_with_success(caps)
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn get_physical_device_surface_formats(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        self.with_any(|t| {
            read_into_vec(|count, data| {
                (t.it_surface.get_physical_device_surface_formats_khr)(pdev, surface, count, data)
            })
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn get_physical_device_surface_present_modes(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        self.with_any(|t| {
            read_into_vec(|count, data| {
                (t.it_surface.get_physical_device_surface_present_modes_khr)(
                    pdev, surface, count, data,
                )
            })
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn get_physical_device_present_rectangles(
        &self,
        pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::Rect2D>> {
        self.with_any(|t| {
            if !t.it_has_present_rects {
                return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
            }
            read_into_vec(|count, data| {
                (t.it_swapchain.get_physical_device_present_rectangles_khr)(
                    pdev, surface, count, data,
                )
            })
        })
        .unwrap_or(Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT))
    }

    unsafe fn get_physical_device_wayland_presentation_support(
        &self,
        pdev: vk::PhysicalDevice,
        queue_family: u32,
        display: *mut c_void,
    ) -> bool {
        self.with_any(|t| {
            (t.it_wayland
                .get_physical_device_wayland_presentation_support_khr)(
                pdev, queue_family, display
            ) == vk::TRUE
        })
        .unwrap_or(false)
    }

    unsafe fn create_swapchain(
        &self,
        device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR,
    ) -> VkResult<vk::SwapchainKHR> {
        self.with_any(|t| {
            let mut ret = vk::SwapchainKHR::null();
            (t.it_swapchain.create_swapchain_khr)(device, info, ptr::null(), &mut ret)
                .result_with_success(ret)
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn destroy_swapchain(&self, device: vk::Device, swapchain: vk::SwapchainKHR) {
        self.with_any(|t| {
            (t.it_swapchain.destroy_swapchain_khr)(device, swapchain, ptr::null())
        });
    }

    unsafe fn get_swapchain_images(
        &self,
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>> {
        self.with_any(|t| {
            read_into_vec(|count, data| {
                (t.it_swapchain.get_swapchain_images_khr)(device, swapchain, count, data)
            })
        })
        .unwrap_or(Err(vk::Result::ERROR_INITIALIZATION_FAILED))
    }

    unsafe fn queue_present(&self, queue: vk::Queue, info: &vk::PresentInfoKHR) -> vk::Result {
        self.with_any(|t| (t.it_swapchain.queue_present_khr)(queue, info))
            .unwrap_or(vk::Result::ERROR_INITIALIZATION_FAILED)
    }

    unsafe fn get_device_group_surface_present_modes(
        &self,
        device: vk::Device,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::DeviceGroupPresentModeFlagsKHR> {
        self.with_any(|t| {
            if !t.it_has_group_modes {
                return Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT);
            }
            let mut modes = vk::DeviceGroupPresentModeFlagsKHR::empty();
            (t.it_swapchain.get_device_group_surface_present_modes_khr)(device, surface, &mut modes)
                .result_with_success(modes)
        })
        .unwrap_or(Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT))
    }

    unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        name: &CStr,
    ) -> vk::PFN_vkVoidFunction {
        self.av_entry.get_instance_proc_addr(instance, name.as_ptr())
    }

    unsafe fn get_device_proc_addr(
        &self,
        device: vk::Device,
        name: &CStr,
    ) -> vk::PFN_vkVoidFunction {
        self.with_any(|t| (t.it_instance.fp_v1_0().get_device_proc_addr)(device, name.as_ptr()))
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(raw: u64) -> vk::Instance {
        vk::Instance::from_raw(raw)
    }

    #[test]
    fn tables_are_usable_with_the_map_unlocked() {
        let map = TableMap::new();
        map.insert(inst(1), 10u32);

        let table = map.any().unwrap();
        // would deadlock if the lookup still held the map
        map.insert(inst(2), *table + 1);
        assert_eq!(map.get(inst(2)).map(|t| *t), Some(11));

        // removing an instance leaves tables already handed out alive
        assert_eq!(map.remove(inst(1)).map(|t| *t), Some(10));
        assert!(map.get(inst(1)).is_none());
        assert!(map.remove(inst(1)).is_none());
        assert_eq!(*table, 10);
    }
}

// Recording collaborators for driving a Driver without a compositor
//
// Austin Shafer - 2020
#![allow(dead_code)]

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use utils::region::Rect;
use waylanddrv::error::Result;
use waylanddrv::*;

use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::sync::{Arc, Mutex};

pub const GAME_WINDOW: Hwnd = 0x100;
pub const OTHER_WINDOW: Hwnd = 0x200;
pub const CHILD_WINDOW: Hwnd = 0x300;
pub const HELPER_WINDOW: Hwnd = 0x400;
pub const FOREGROUND: Hwnd = 0x999;
pub const INSTANCE: u64 = 0x1000;

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// A compositor event waiting to be dispatched
#[derive(Debug, Clone, Copy)]
pub enum Event {
    Key { time: u32, key: u32, pressed: bool },
    Motion { time: u32, x: f64, y: f64 },
    Button { time: u32, button: u32, pressed: bool },
    Axis { time: u32, value: f64 },
    Relative { utime: u64, dx: f64, dy: f64 },
}

pub type EventQueue = Arc<Mutex<VecDeque<Event>>>;

/// Stands in for the compositor connection. Objects are plain ids
/// and every request is written to the call log.
pub struct MockBackend {
    mb_log: CallLog,
    mb_events: EventQueue,
    mb_router: InputRouter,
    mb_next_id: u32,
    /// base surfaces not yet configured by a roundtrip
    mb_pending: Vec<u32>,
    mb_realized: Vec<u32>,
    pub mb_fail_egl: bool,
}

impl MockBackend {
    fn call(&self, what: &str) {
        self.mb_log.lock().unwrap().push(what.to_string());
    }

    fn new_id(&mut self) -> u32 {
        self.mb_next_id += 1;
        self.mb_next_id
    }
}

impl SurfaceBackend for MockBackend {
    type Base = u32;
    type Shell = u32;
    type Window = u32;
    type EglSurface = u32;
    type Context = u32;

    fn create_context(&mut self) -> Result<u32> {
        self.call("context");
        Ok(self.new_id())
    }
    fn create_base_surface(&mut self) -> Result<u32> {
        self.call("base");
        let id = self.new_id();
        self.mb_pending.push(id);
        Ok(id)
    }
    fn create_shell_surface(&mut self, _base: &u32) -> Result<u32> {
        self.call("shell");
        Ok(self.new_id())
    }
    fn set_opaque_region(&mut self, _base: &u32, width: u32, height: u32) {
        self.call(&format!("opaque {}x{}", width, height));
    }
    fn create_native_window(&mut self, _base: &u32, _w: u32, _h: u32) -> Result<u32> {
        self.call("window");
        Ok(self.new_id())
    }
    fn create_egl_surface(&mut self, _ctx: &u32, _win: &u32) -> Result<u32> {
        if self.mb_fail_egl {
            return Err(DriverError::EGL("no surface for you".to_string()));
        }
        self.call("egl");
        Ok(self.new_id())
    }
    fn make_current(&mut self, _ctx: &u32, _egl: &u32) -> Result<()> {
        self.call("current");
        Ok(())
    }
    fn swap_buffers(&mut self, _egl: &u32) -> Result<()> {
        self.call("swap");
        Ok(())
    }
    fn set_fullscreen(&mut self, _shell: &u32) {
        self.call("fullscreen");
    }
    fn destroy_egl_surface(&mut self, _egl: u32) {
        self.call("~egl");
    }
    fn destroy_native_window(&mut self, _win: u32) {
        self.call("~window");
    }
    fn destroy_shell_surface(&mut self, _shell: u32) {
        self.call("~shell");
    }
    fn destroy_base_surface(&mut self, base: u32) {
        self.mb_pending.retain(|b| *b != base);
        self.mb_realized.retain(|b| *b != base);
        self.call("~base");
    }
    fn destroy_context(&mut self, _ctx: u32) {
        self.call("~context");
    }
}

impl LockBackend for MockBackend {
    type Surface = u32;
    type Constraint = u32;
    type Relative = u32;

    fn create_constraint(
        &mut self,
        _surface: &u32,
        mode: PointerMode,
        lifetime: LockLifetime,
    ) -> Result<u32> {
        self.call(&format!("constraint {:?} {:?}", mode, lifetime));
        Ok(self.new_id())
    }
    fn destroy_constraint(&mut self, _c: u32) {
        self.call("~constraint");
    }
    fn create_relative(&mut self) -> Result<u32> {
        self.call("relative");
        Ok(self.new_id())
    }
    fn destroy_relative(&mut self, _r: u32) {
        self.call("~relative");
    }
    fn commit_surface(&mut self, _surface: &u32) {
        self.call("commit");
    }
    fn hide_cursor(&mut self) {
        self.call("hide cursor");
    }
    fn restore_cursor(&mut self) {
        self.call("restore cursor");
    }
}

impl DisplayPump for MockBackend {
    fn prepare_read(&mut self) -> bool {
        self.mb_events.lock().unwrap().is_empty()
    }
    fn read_events(&mut self) -> Result<()> {
        Ok(())
    }
    fn cancel_read(&mut self) {
        self.call("cancel read");
    }
    fn dispatch_pending(&mut self) -> Result<usize> {
        let events: Vec<Event> = self.mb_events.lock().unwrap().drain(..).collect();
        let router = &mut self.mb_router;

        for ev in events.iter() {
            match *ev {
                Event::Key { time, key, pressed } => {
                    router.keyboard_key(time, key, pressed);
                }
                Event::Motion { time, x, y } => router.pointer_motion(time, x, y),
                Event::Button {
                    time,
                    button,
                    pressed,
                } => router.pointer_button(time, button, pressed),
                Event::Axis { time, value } => router.pointer_axis(time, value),
                Event::Relative { utime, dx, dy } => router.relative_motion(utime, dx, dy),
            }
        }

        Ok(events.len())
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Backend for MockBackend {
    fn display_ptr(&self) -> *mut c_void {
        0xd15 as *mut c_void
    }
    fn surface_ptr(&self, base: &u32) -> *mut c_void {
        *base as usize as *mut c_void
    }
    fn dispatch_round(&mut self) -> Result<()> {
        self.call("roundtrip");
        // the compositor configures every surface it knows about
        let pending: Vec<u32> = self.mb_pending.drain(..).collect();
        self.mb_realized.extend(pending);
        self.dispatch_pending().map(|_| ())
    }
    fn is_realized(&self, base: &u32) -> bool {
        self.mb_realized.contains(base)
    }
}

/// The host runtime: window table, injected input, focus requests
pub struct MockHost {
    pub mh_windows: Mutex<HashMap<Hwnd, WindowInfo>>,
    pub mh_sent: Mutex<Vec<(Hwnd, HardwareInput)>>,
    pub mh_activated: Mutex<Vec<Hwnd>>,
    pub mh_focused: Mutex<Vec<Hwnd>>,
    pub mh_waits: Mutex<Vec<u32>>,
}

impl MockHost {
    pub fn new() -> Self {
        let mut windows = HashMap::new();
        windows.insert(GAME_WINDOW, window(true, true, "GameWindow"));
        windows.insert(OTHER_WINDOW, window(true, true, "Launcher"));
        windows.insert(CHILD_WINDOW, window(false, true, "Button"));
        windows.insert(HELPER_WINDOW, window(true, true, "IME"));

        Self {
            mh_windows: Mutex::new(windows),
            mh_sent: Mutex::new(Vec::new()),
            mh_activated: Mutex::new(Vec::new()),
            mh_focused: Mutex::new(Vec::new()),
            mh_waits: Mutex::new(Vec::new()),
        }
    }

    /// Take everything injected so far
    pub fn take_sent(&self) -> Vec<(Hwnd, HardwareInput)> {
        std::mem::take(&mut *self.mh_sent.lock().unwrap())
    }
}

pub fn window(toplevel: bool, visible: bool, class: &str) -> WindowInfo {
    WindowInfo {
        toplevel,
        visible,
        class: class.to_string(),
    }
}

impl InputInjector for MockHost {
    fn send_hardware_input(&self, hwnd: Hwnd, input: &HardwareInput) {
        self.mh_sent.lock().unwrap().push((hwnd, *input));
    }
    fn foreground_window(&self) -> Hwnd {
        FOREGROUND
    }
}

impl HostWindows for MockHost {
    fn window_info(&self, hwnd: Hwnd) -> WindowInfo {
        self.mh_windows
            .lock()
            .unwrap()
            .get(&hwnd)
            .cloned()
            .unwrap_or_else(|| window(false, false, ""))
    }
    fn activate_window(&self, hwnd: Hwnd, _extent: (u32, u32)) {
        self.mh_activated.lock().unwrap().push(hwnd);
    }
    fn set_focus(&self, hwnd: Hwnd) {
        self.mh_focused.lock().unwrap().push(hwnd);
    }
    fn virtual_screen_rect(&self) -> Rect<i32> {
        Rect::new(0, 0, 1920, 1080)
    }
}

impl HostWait for MockHost {
    fn wait_for_multiple_objects(
        &self,
        _handles: &[u64],
        _wait_all: bool,
        timeout: u32,
        _alertable: bool,
    ) -> u32 {
        self.mh_waits.lock().unwrap().push(timeout);
        WAIT_TIMEOUT
    }
}

/// The native vulkan library. Surfaces are numbered from 0x5000.
pub struct MockVulkan {
    pub mv_extensions: Vec<&'static CStr>,
    pub mv_next_surface: Mutex<u64>,
    pub mv_destroyed: Mutex<Vec<u64>>,
    pub mv_fail_surface: bool,
    /// Surfaces seen by the last surface query
    pub mv_queried: Mutex<Vec<u64>>,
}

impl MockVulkan {
    pub fn new() -> Self {
        Self {
            mv_extensions: vec![
                CStr::from_bytes_with_nul(b"VK_KHR_surface\0").unwrap(),
                CStr::from_bytes_with_nul(b"VK_KHR_wayland_surface\0").unwrap(),
                CStr::from_bytes_with_nul(b"VK_EXT_debug_utils\0").unwrap(),
            ],
            mv_next_surface: Mutex::new(0x5000),
            mv_destroyed: Mutex::new(Vec::new()),
            mv_fail_surface: false,
            mv_queried: Mutex::new(Vec::new()),
        }
    }

    pub fn destroyed(&self) -> Vec<u64> {
        self.mv_destroyed.lock().unwrap().clone()
    }
}

pub fn extension_name(prop: &vk::ExtensionProperties) -> &CStr {
    unsafe { CStr::from_ptr(prop.extension_name.as_ptr()) }
}

impl NativeVulkan for MockVulkan {
    unsafe fn create_instance(&self, _info: &vk::InstanceCreateInfo) -> VkResult<vk::Instance> {
        Ok(vk::Instance::from_raw(INSTANCE))
    }
    unsafe fn destroy_instance(&self, _instance: vk::Instance) {}
    unsafe fn enumerate_instance_extension_properties(
        &self,
    ) -> VkResult<Vec<vk::ExtensionProperties>> {
        Ok(self
            .mv_extensions
            .iter()
            .map(|name| {
                let mut prop = vk::ExtensionProperties::default();
                for (d, s) in prop.extension_name.iter_mut().zip(name.to_bytes()) {
                    *d = *s as c_char;
                }
                prop.spec_version = 3;
                prop
            })
            .collect())
    }

    unsafe fn create_wayland_surface(
        &self,
        _instance: vk::Instance,
        _display: *mut c_void,
        _surface: *mut c_void,
    ) -> VkResult<vk::SurfaceKHR> {
        if self.mv_fail_surface {
            return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        }
        let mut next = self.mv_next_surface.lock().unwrap();
        *next += 1;
        Ok(vk::SurfaceKHR::from_raw(*next))
    }
    unsafe fn destroy_surface(&self, _instance: vk::Instance, surface: vk::SurfaceKHR) {
        self.mv_destroyed.lock().unwrap().push(surface.as_raw());
    }

    unsafe fn get_physical_device_surface_support(
        &self,
        _pdev: vk::PhysicalDevice,
        _queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        self.mv_queried.lock().unwrap().push(surface.as_raw());
        Ok(true)
    }
    unsafe fn get_physical_device_surface_capabilities(
        &self,
        _pdev: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.mv_queried.lock().unwrap().push(surface.as_raw());
        Ok(vk::SurfaceCapabilitiesKHR::default())
    }
    unsafe fn get_physical_device_surface_formats(
        &self,
        _pdev: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(Vec::new())
    }
    unsafe fn get_physical_device_surface_present_modes(
        &self,
        _pdev: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(vec![vk::PresentModeKHR::FIFO])
    }
    unsafe fn get_physical_device_present_rectangles(
        &self,
        _pdev: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::Rect2D>> {
        Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT)
    }
    unsafe fn get_physical_device_wayland_presentation_support(
        &self,
        _pdev: vk::PhysicalDevice,
        _queue_family: u32,
        display: *mut c_void,
    ) -> bool {
        !display.is_null()
    }

    unsafe fn create_swapchain(
        &self,
        _device: vk::Device,
        info: &vk::SwapchainCreateInfoKHR,
    ) -> VkResult<vk::SwapchainKHR> {
        self.mv_queried.lock().unwrap().push(info.surface.as_raw());
        Ok(vk::SwapchainKHR::from_raw(0x7000))
    }
    unsafe fn destroy_swapchain(&self, _device: vk::Device, _swapchain: vk::SwapchainKHR) {}
    unsafe fn get_swapchain_images(
        &self,
        _device: vk::Device,
        _swapchain: vk::SwapchainKHR,
    ) -> VkResult<Vec<vk::Image>> {
        Ok(Vec::new())
    }
    unsafe fn queue_present(&self, _queue: vk::Queue, _info: &vk::PresentInfoKHR) -> vk::Result {
        vk::Result::SUBOPTIMAL_KHR
    }
    unsafe fn get_device_group_surface_present_modes(
        &self,
        _device: vk::Device,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::DeviceGroupPresentModeFlagsKHR> {
        Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT)
    }

    unsafe fn get_instance_proc_addr(
        &self,
        _instance: vk::Instance,
        _name: &CStr,
    ) -> vk::PFN_vkVoidFunction {
        None
    }
    unsafe fn get_device_proc_addr(
        &self,
        _device: vk::Device,
        _name: &CStr,
    ) -> vk::PFN_vkVoidFunction {
        None
    }
}

pub type TestDriver = Driver<MockBackend, MockHost>;

/// A driver wired to the mocks, with handles to inspect them
pub struct Harness {
    pub h_driver: TestDriver,
    pub h_host: Arc<MockHost>,
    pub h_log: CallLog,
    pub h_events: EventQueue,
    pub h_vulkan: Option<Arc<MockVulkan>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(DriverConfig::default(), Some(MockVulkan::new()), false)
    }

    pub fn build(config: DriverConfig, vulkan: Option<MockVulkan>, fail_egl: bool) -> Self {
        let host = Arc::new(MockHost::new());
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let events: EventQueue = Arc::new(Mutex::new(VecDeque::new()));
        let vulkan = vulkan.map(Arc::new);

        let conn_log = log.clone();
        let conn_events = events.clone();
        let connector: Connector<MockBackend> = Box::new(move |_ctx: &Arc<DriverContext>, mut router: InputRouter| {
            conn_log.lock().unwrap().push("connect".to_string());
            // the seat advertises a pointer during the first roundtrip
            router.bind_pointer();
            Ok(MockBackend {
                mb_log: conn_log.clone(),
                mb_events: conn_events.clone(),
                mb_router: router,
                mb_next_id: 0,
                mb_pending: Vec::new(),
                mb_realized: Vec::new(),
                mb_fail_egl: fail_egl,
            })
        });

        let loader_vulkan = vulkan.clone();
        let loader: VulkanLoader = Box::new(move |_cfg: &DriverConfig| {
            loader_vulkan
                .clone()
                .map(|v| -> Arc<dyn NativeVulkan> { v })
        });

        Self {
            h_driver: Driver::new(config, host.clone(), connector, loader),
            h_host: host,
            h_log: log,
            h_events: events,
            h_vulkan: vulkan,
        }
    }

    pub fn push(&self, ev: Event) {
        self.h_events.lock().unwrap().push_back(ev);
    }

    /// Calls made to the backend since the last take
    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.h_log.lock().unwrap())
    }

    pub fn instance(&self) -> vk::Instance {
        vk::Instance::from_raw(INSTANCE)
    }
}

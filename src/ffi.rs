//! `extern "C"` bindings to the native BVC server library.

use crate::embedded::{NativeBridge, ServerHandle};
use std::ffi::{c_char, c_int, c_void, CStr, CString};

#[link(name = "lib_bvc_server")]
extern "C" {
    fn bvc_init() -> c_int;
    fn bvc_server_create(config_json: *const c_char) -> *mut c_void;
    fn bvc_server_start(handle: *mut c_void) -> c_int;
    fn bvc_server_stop(handle: *mut c_void) -> c_int;
    fn bvc_server_destroy(handle: *mut c_void) -> c_int;
    fn bvc_update_positions(handle: *mut c_void, game_data_json: *const c_char) -> c_int;
    fn bvc_get_last_error() -> *const c_char;
    fn bvc_version() -> *const c_char;
}

/// The linked library. Stateless; every call goes straight through.
///
/// `last_error` is thread-local on the native side, so it only describes
/// failures from calls made on the same thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLibrary;

impl NativeLibrary {
    pub fn new() -> Self {
        Self
    }
}

fn raw(handle: ServerHandle) -> *mut c_void {
    handle.as_raw() as *mut c_void
}

/// Copy a library-owned C string, if any.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

impl NativeBridge for NativeLibrary {
    fn init(&self) -> i32 {
        unsafe { bvc_init() }
    }

    fn version(&self) -> String {
        unsafe { owned_string(bvc_version()) }.unwrap_or_else(|| "unknown".to_string())
    }

    fn create(&self, config_json: &str) -> Option<ServerHandle> {
        let config = CString::new(config_json).ok()?;
        let handle = unsafe { bvc_server_create(config.as_ptr()) };
        ServerHandle::from_raw(handle as usize)
    }

    fn start(&self, handle: ServerHandle) -> i32 {
        unsafe { bvc_server_start(raw(handle)) }
    }

    fn stop(&self, handle: ServerHandle) -> i32 {
        unsafe { bvc_server_stop(raw(handle)) }
    }

    fn destroy(&self, handle: ServerHandle) -> i32 {
        unsafe { bvc_server_destroy(raw(handle)) }
    }

    fn update_positions(&self, handle: ServerHandle, game_data_json: &str) -> i32 {
        let Ok(json) = CString::new(game_data_json) else {
            return -1;
        };
        unsafe { bvc_update_positions(raw(handle), json.as_ptr()) }
    }

    fn last_error(&self) -> Option<String> {
        unsafe { owned_string(bvc_get_last_error()) }
    }
}

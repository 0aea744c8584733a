//! Platform "last error" access around a native call.

use super::types::Errno;

/// Reset the calling thread's last-error value to 0
#[inline]
pub fn clear_last_error() {
    set_last_error(0);
}

/// Read the calling thread's last-error value
#[inline]
pub fn last_error() -> Errno {
    Errno(std::io::Error::last_os_error().raw_os_error().unwrap_or(0))
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))]
pub(crate) fn set_last_error(code: i32) {
    // SAFETY: __errno_location returns the thread-local errno slot.
    unsafe { *libc::__errno_location() = code };
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
pub(crate) fn set_last_error(code: i32) {
    // SAFETY: __error returns the thread-local errno slot.
    unsafe { *libc::__error() = code };
}

#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
pub(crate) fn set_last_error(code: i32) {
    // SAFETY: __errno returns the thread-local errno slot.
    unsafe { *libc::__errno() = code };
}

#[cfg(windows)]
pub(crate) fn set_last_error(code: i32) {
    extern "system" {
        fn SetLastError(code: u32);
    }
    // SAFETY: SetLastError only writes the thread's last-error slot.
    unsafe { SetLastError(code as u32) };
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "emscripten",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    windows
)))]
pub(crate) fn set_last_error(_code: i32) {}

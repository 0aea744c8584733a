//! In-Memory Image Loading
//!
//! Maps a raw shared-object image without writing it to disk. On Linux the
//! bytes go into an anonymous `memfd` which the dynamic loader then opens
//! through `/proc/self/fd`, so relocations, imports and section permissions
//! are handled by the system loader exactly as for a file.

use super::error::{FfiError, FfiResult};
use super::loader::NativeImage;

#[cfg(target_os = "linux")]
const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Load a shared-object image from memory
#[cfg(target_os = "linux")]
pub fn load_image(image: &[u8]) -> FfiResult<NativeImage> {
    use std::fs::File;
    use std::io::{self, Write};
    use std::os::fd::FromRawFd;

    use libloading::Library;
    use tracing::debug;

    if image.is_empty() {
        return Err(FfiError::Load("module image is empty".to_string()));
    }
    if !image.starts_with(ELF_MAGIC) {
        return Err(FfiError::Load(
            "module image has no ELF header".to_string(),
        ));
    }

    // SAFETY: the name is a valid NUL-terminated string.
    let fd = unsafe {
        libc::memfd_create(
            b"dllcall-image\0".as_ptr() as *const libc::c_char,
            libc::MFD_CLOEXEC,
        )
    };
    if fd < 0 {
        return Err(FfiError::Load(format!(
            "memfd_create failed: {}",
            io::Error::last_os_error()
        )));
    }

    // SAFETY: fd was just created and is owned by nobody else.
    let mut file = unsafe { File::from_raw_fd(fd) };
    file.write_all(image)
        .map_err(|e| FfiError::Load(format!("Failed to stage module image: {}", e)))?;

    let path = format!("/proc/self/fd/{}", fd);
    // Safety: see NativeImage::open.
    let library = unsafe { Library::new(&path) }
        .map_err(|e| FfiError::Load(format!("Failed to load module image: {}", e)))?;

    debug!(bytes = image.len(), "mapped in-memory module");
    Ok(NativeImage::from_library(
        library,
        format!("<memory image, {} bytes>", image.len()),
        Some(file),
    ))
}

#[cfg(not(target_os = "linux"))]
pub fn load_image(image: &[u8]) -> FfiResult<NativeImage> {
    if image.is_empty() {
        return Err(FfiError::Load("module image is empty".to_string()));
    }
    Err(FfiError::Load(
        "in-memory loading is not supported on this platform".to_string(),
    ))
}

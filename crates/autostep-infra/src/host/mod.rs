//! `HostPlatform` implementations.
//!
//! [`DefaultHost`] is the implementation for the compilation target:
//! [`WindowsHost`] on Windows, [`UnsupportedHost`] everywhere else.

pub mod tools;
pub mod unsupported;
#[cfg(windows)]
pub mod windows;

pub use unsupported::UnsupportedHost;
#[cfg(windows)]
pub use windows::WindowsHost;

#[cfg(windows)]
pub type DefaultHost = WindowsHost;
#[cfg(not(windows))]
pub type DefaultHost = UnsupportedHost;

pub fn default_host() -> DefaultHost {
    DefaultHost::default()
}

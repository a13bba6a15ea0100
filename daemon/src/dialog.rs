//! User-facing alerts.
//!
//! On Windows the dialog is a native message box shown from its own thread so
//! the event loop keeps running while it is open. Elsewhere it is only logged.

/// Severity of a dialog. Session failures are the only thing the daemon
/// interrupts the user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
    pub detail: String,
}

pub trait Notifier: Send + Sync {
    fn show(&self, dialog: Dialog);
}

pub struct SystemNotifier;

impl Notifier for SystemNotifier {
    fn show(&self, dialog: Dialog) {
        #[cfg(windows)]
        {
            std::thread::spawn(move || imp::message_box(&dialog));
        }
        #[cfg(not(windows))]
        {
            match dialog.kind {
                DialogKind::Error => {
                    tracing::error!("{}: {}\n{}", dialog.title, dialog.message, dialog.detail)
                }
            }
        }
    }
}

#[cfg(windows)]
mod imp {
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

    use super::{Dialog, DialogKind};

    /// Converts a Rust `&str` to a null-terminated UTF-16 `Vec<u16>`.
    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Blocks until the user dismisses the box.
    pub fn message_box(dialog: &Dialog) {
        let text = to_wide(&format!("{}\n\n{}", dialog.message, dialog.detail));
        let caption = to_wide(&dialog.title);
        let icon = match dialog.kind {
            DialogKind::Error => MB_ICONERROR,
        };
        unsafe {
            let _ = MessageBoxW(
                HWND::default(),
                PCWSTR::from_raw(text.as_ptr()),
                PCWSTR::from_raw(caption.as_ptr()),
                MB_OK | icon,
            );
        }
    }
}

use crate::overlay::messages::{HostToOverlay, OverlayToHost};
use crate::overlay::pager::{TapOutcome, WarningPager};
use crate::overlay::view::{compose_scene, hit_test, OverlayTap};
use crate::overlay::OverlayError;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Geometry of the surface the overlay covers, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    LeftDown,
    LeftUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    pub local_point: (i32, i32),
    pub event: PointerEvent,
}

/// Channel endpoints handed back to the manager after the worker is spawned.
pub struct OverlayWorkerHandles {
    pub worker_thread: JoinHandle<()>,
    pub host_to_overlay_tx: Sender<HostToOverlay>,
    pub overlay_to_host_rx: Receiver<OverlayToHost>,
}

/// Spawn the overlay worker thread. The thread owns the window for its whole
/// lifetime; the first message it sends is either `WindowReady` or
/// `WindowFailed`, which the manager uses as its creation handshake.
pub fn spawn_overlay(target_id: String, warnings_json: String) -> Result<OverlayWorkerHandles, OverlayError> {
    let (host_to_overlay_tx, host_to_overlay_rx) = channel::<HostToOverlay>();
    let (overlay_to_host_tx, overlay_to_host_rx) = channel::<OverlayToHost>();

    let worker_thread = thread::Builder::new()
        .name("warning-overlay".to_string())
        .spawn(move || {
            run_overlay_worker(target_id, warnings_json, host_to_overlay_rx, overlay_to_host_tx)
        })
        .map_err(|err| OverlayError::Startup(format!("failed to spawn overlay thread: {err}")))?;

    Ok(OverlayWorkerHandles {
        worker_thread,
        host_to_overlay_tx,
        overlay_to_host_rx,
    })
}

fn run_overlay_worker(
    target_id: String,
    warnings_json: String,
    host_rx: Receiver<HostToOverlay>,
    host_tx: Sender<OverlayToHost>,
) {
    let mut window = match OverlayWindow::create_fullscreen() {
        Ok(window) => {
            let _ = host_tx.send(OverlayToHost::WindowReady);
            window
        }
        Err(err) => {
            let _ = host_tx.send(OverlayToHost::WindowFailed { error: err });
            return;
        }
    };

    let mut pager = WarningPager::from_payload(target_id, &warnings_json);
    let mut scene = compose_scene(&pager, window.size(), Instant::now());

    loop {
        #[cfg(windows)]
        platform::pump_window_messages();

        for sample in window.drain_pointer_events() {
            if sample.event != PointerEvent::LeftUp {
                continue;
            }
            let outcome = match hit_test(&scene.layout, sample.local_point) {
                Some(OverlayTap::Forward) => pager.tap_forward(),
                Some(OverlayTap::Close) => pager.tap_close(),
                None => TapOutcome::Ignored,
            };
            if let TapOutcome::Intent(intent) = outcome {
                let _ = host_tx.send(OverlayToHost::Intent(intent));
            }
        }

        match host_rx.recv_timeout(Duration::from_millis(16)) {
            Ok(HostToOverlay::Show) => window.show(),
            Ok(HostToOverlay::UpdateContent {
                target_id,
                warnings_json,
            }) => pager.replace_content(target_id, &warnings_json),
            Ok(HostToOverlay::Dismiss) => break,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }

        // Repaint every tick; the pulse animation advances even without input.
        scene = compose_scene(&pager, window.size(), Instant::now());
        window.paint_scene(&scene);
        window.request_paint();
    }

    window.shutdown();
    tracing::debug!("overlay worker exited");
}

#[cfg(windows)]
mod platform {
    use super::{PointerEvent, PointerSample, SurfaceRect};
    use crate::overlay::view::{
        Color, OverlayScene, Rect, ALLOW_GREEN, BACKGROUND, HEADER_BG, PROGRESS_TRACK, TEXT_DIM,
        TEXT_WHITE, WARNING_RED,
    };
    use crate::overlay::OverlayError;
    use once_cell::sync::Lazy;
    use std::collections::HashMap;
    use std::mem;
    use std::ptr;
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::sync::{Mutex, Once};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, RECT, WPARAM};
    use windows::Win32::Graphics::Gdi::{
        BeginPaint, BitBlt, CreateCompatibleDC, CreateDIBSection, CreateSolidBrush, DeleteDC,
        DeleteObject, DrawTextW, EndPaint, FillRect, InvalidateRect, SelectObject, SetBkMode,
        SetTextColor, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, DT_CENTER,
        DT_SINGLELINE, DT_VCENTER, DT_WORDBREAK, HBITMAP, HDC, HGDIOBJ, PAINTSTRUCT, SRCCOPY,
        TRANSPARENT,
    };
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetSystemMetrics,
        GetWindowLongPtrW, PeekMessageW, RegisterClassW, ReleaseCapture, SetCapture,
        SetWindowLongPtrW, SetWindowPos, TranslateMessage, GWLP_USERDATA, HWND_TOPMOST, MSG,
        PM_REMOVE, SM_CXSCREEN, SM_CYSCREEN, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
        SWP_SHOWWINDOW, WINDOW_EX_STYLE, WINDOW_STYLE, WM_ERASEBKGND, WM_LBUTTONDOWN,
        WM_LBUTTONUP, WM_PAINT, WM_SHOWWINDOW, WM_WINDOWPOSCHANGED, WNDCLASSW, WS_EX_TOOLWINDOW,
        WS_EX_TOPMOST, WS_POPUP,
    };

    static POINTER_SENDERS: Lazy<Mutex<HashMap<isize, Sender<PointerSample>>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));

    pub fn compose_overlay_window_ex_style() -> WINDOW_EX_STYLE {
        // Topmost tool window: above everything, absent from the taskbar, and
        // click-opaque so the user has to act on the warning buttons.
        WS_EX_TOPMOST | WS_EX_TOOLWINDOW
    }

    fn widestring(value: &str) -> Vec<u16> {
        use std::os::windows::ffi::OsStrExt;
        std::ffi::OsStr::new(value)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    pub fn pump_window_messages() {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            }
        }
    }

    fn colorref(color: Color) -> COLORREF {
        COLORREF((color.r as u32) | ((color.g as u32) << 8) | ((color.b as u32) << 16))
    }

    fn win_rect(rect: Rect) -> RECT {
        RECT {
            left: rect.x,
            top: rect.y,
            right: rect.x + rect.width,
            bottom: rect.y + rect.height,
        }
    }

    unsafe extern "system" fn overlay_wndproc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        match msg {
            WM_ERASEBKGND => LRESULT(1),
            WM_PAINT => {
                let mut ps = PAINTSTRUCT::default();
                let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
                if !hdc.0.is_null() {
                    let mem_dc = HDC(unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut _);
                    if !mem_dc.0.is_null() {
                        let width = ps.rcPaint.right - ps.rcPaint.left;
                        let height = ps.rcPaint.bottom - ps.rcPaint.top;
                        let _ = unsafe {
                            BitBlt(
                                hdc,
                                ps.rcPaint.left,
                                ps.rcPaint.top,
                                width,
                                height,
                                mem_dc,
                                ps.rcPaint.left,
                                ps.rcPaint.top,
                                SRCCOPY,
                            )
                        };
                    }
                }
                unsafe {
                    let _ = EndPaint(hwnd, &ps);
                }
                LRESULT(0)
            }
            WM_SHOWWINDOW | WM_WINDOWPOSCHANGED => {
                // Reassert topmost whenever the z-order shifts underneath us.
                let _ = unsafe {
                    SetWindowPos(
                        hwnd,
                        HWND_TOPMOST,
                        0,
                        0,
                        0,
                        0,
                        SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE,
                    )
                };
                unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
            }
            WM_LBUTTONDOWN | WM_LBUTTONUP => {
                if msg == WM_LBUTTONDOWN {
                    let _ = unsafe { SetCapture(hwnd) };
                } else {
                    unsafe {
                        let _ = ReleaseCapture();
                    }
                }

                let local_x = (lparam.0 & 0xffff) as i16 as i32;
                let local_y = ((lparam.0 >> 16) & 0xffff) as i16 as i32;
                if let Ok(senders) = POINTER_SENDERS.lock() {
                    if let Some(tx) = senders.get(&(hwnd.0 as isize)) {
                        let event = if msg == WM_LBUTTONDOWN {
                            PointerEvent::LeftDown
                        } else {
                            PointerEvent::LeftUp
                        };
                        let _ = tx.send(PointerSample {
                            local_point: (local_x, local_y),
                            event,
                        });
                    }
                }
                LRESULT(0)
            }
            _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        }
    }

    #[derive(Debug)]
    pub struct OverlayWindow {
        hwnd: HWND,
        mem_dc: HDC,
        dib: HBITMAP,
        old_bitmap: HGDIOBJ,
        surface: SurfaceRect,
        pointer_rx: Receiver<PointerSample>,
    }

    unsafe impl Send for OverlayWindow {}

    impl OverlayWindow {
        /// Create a borderless popup covering the primary monitor. A refusal
        /// from the window manager maps to `NotPermitted`; resource setup
        /// failures after that are `Startup` errors.
        pub fn create_fullscreen() -> Result<Self, OverlayError> {
            static REGISTER_CLASS: Once = Once::new();
            let class_name = widestring("WarningGateOverlay");
            let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }
                .map_err(|err| OverlayError::Startup(format!("module handle: {err}")))?;

            REGISTER_CLASS.call_once(|| unsafe {
                let wc = WNDCLASSW {
                    hInstance: hinstance.into(),
                    lpszClassName: PCWSTR(class_name.as_ptr()),
                    lpfnWndProc: Some(overlay_wndproc),
                    ..Default::default()
                };
                let _ = RegisterClassW(&wc);
            });

            let surface = SurfaceRect {
                x: 0,
                y: 0,
                width: unsafe { GetSystemMetrics(SM_CXSCREEN) },
                height: unsafe { GetSystemMetrics(SM_CYSCREEN) },
            };

            let hwnd = unsafe {
                CreateWindowExW(
                    compose_overlay_window_ex_style(),
                    PCWSTR(class_name.as_ptr()),
                    PCWSTR::null(),
                    WINDOW_STYLE(WS_POPUP.0),
                    surface.x,
                    surface.y,
                    surface.width,
                    surface.height,
                    None,
                    None,
                    hinstance,
                    None,
                )
                .map_err(|_| OverlayError::NotPermitted)?
            };

            let mem_dc = unsafe { CreateCompatibleDC(HDC::default()) };
            if mem_dc.0.is_null() {
                unsafe {
                    let _ = DestroyWindow(hwnd);
                }
                return Err(OverlayError::Startup("compatible DC".to_string()));
            }

            let mut bmi = BITMAPINFO::default();
            bmi.bmiHeader = BITMAPINFOHEADER {
                biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: surface.width,
                biHeight: -surface.height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            };

            let mut bits: *mut core::ffi::c_void = ptr::null_mut();
            let dib = unsafe {
                CreateDIBSection(
                    mem_dc,
                    &bmi,
                    DIB_RGB_COLORS,
                    &mut bits,
                    windows::Win32::Foundation::HANDLE::default(),
                    0,
                )
            }
            .map_err(|err| {
                unsafe {
                    let _ = DeleteDC(mem_dc);
                    let _ = DestroyWindow(hwnd);
                }
                OverlayError::Startup(format!("backing bitmap: {err}"))
            })?;

            let old_bitmap = unsafe { SelectObject(mem_dc, dib) };
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, mem_dc.0 as isize);
            }

            let (pointer_tx, pointer_rx) = channel::<PointerSample>();
            if let Ok(mut senders) = POINTER_SENDERS.lock() {
                senders.insert(hwnd.0 as isize, pointer_tx);
            }

            Ok(Self {
                hwnd,
                mem_dc,
                dib,
                old_bitmap,
                surface,
                pointer_rx,
            })
        }

        pub fn size(&self) -> (i32, i32) {
            (self.surface.width, self.surface.height)
        }

        pub fn drain_pointer_events(&self) -> Vec<PointerSample> {
            let mut events = Vec::new();
            loop {
                match self.pointer_rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            events
        }

        pub fn show(&self) {
            unsafe {
                let _ = SetWindowPos(
                    self.hwnd,
                    HWND_TOPMOST,
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW,
                );
            }
        }

        pub fn request_paint(&self) {
            unsafe {
                let _ = InvalidateRect(self.hwnd, None, false);
            }
        }

        /// Rasterize the scene into the backing bitmap via GDI.
        pub fn paint_scene(&mut self, scene: &OverlayScene) {
            if self.mem_dc.0.is_null() {
                return;
            }
            let layout = &scene.layout;
            unsafe {
                self.fill(
                    Rect {
                        x: 0,
                        y: 0,
                        width: self.surface.width,
                        height: self.surface.height,
                    },
                    BACKGROUND,
                );
                self.fill(layout.header, HEADER_BG);
                self.fill(layout.progress_track, PROGRESS_TRACK);
                self.fill(layout.progress_fill, ALLOW_GREEN);
                self.fill(layout.close_button, WARNING_RED);

                SetBkMode(self.mem_dc, TRANSPARENT);
                self.text(layout.header, &scene.header_text, WARNING_RED, true);
                if !scene.page_label.is_empty() {
                    let label_rect = Rect {
                        y: layout.header.y + layout.header.height * 2 / 3,
                        height: layout.header.height / 3,
                        ..layout.header
                    };
                    self.text(label_rect, &scene.page_label, TEXT_DIM, true);
                }
                self.text(layout.body, &scene.body_text, scene.body_color, false);
                self.text(layout.close_button, &scene.close_label, TEXT_WHITE, true);
                if let Some(forward) = &scene.forward_label {
                    self.fill(layout.forward_button, ALLOW_GREEN);
                    self.text(layout.forward_button, forward, TEXT_WHITE, true);
                }
            }
        }

        unsafe fn fill(&self, rect: Rect, color: Color) {
            let brush = CreateSolidBrush(colorref(color));
            let _ = FillRect(self.mem_dc, &win_rect(rect), brush);
            let _ = DeleteObject(brush);
        }

        unsafe fn text(&self, rect: Rect, value: &str, color: Color, single_line: bool) {
            SetTextColor(self.mem_dc, colorref(color));
            let mut wide: Vec<u16> = value.encode_utf16().collect();
            let mut bounds = win_rect(rect);
            let format = if single_line {
                DT_CENTER | DT_VCENTER | DT_SINGLELINE
            } else {
                DT_CENTER | DT_WORDBREAK
            };
            let _ = DrawTextW(self.mem_dc, &mut wide, &mut bounds, format);
        }

        pub fn shutdown(&mut self) {
            unsafe {
                if !self.mem_dc.0.is_null() {
                    let _ = SelectObject(self.mem_dc, self.old_bitmap);
                }
                if !self.dib.0.is_null() {
                    let _ = DeleteObject(self.dib);
                    self.dib = HBITMAP::default();
                }
                if !self.mem_dc.0.is_null() {
                    let _ = DeleteDC(self.mem_dc);
                    self.mem_dc = HDC::default();
                }
                if !self.hwnd.0.is_null() {
                    if let Ok(mut senders) = POINTER_SENDERS.lock() {
                        senders.remove(&(self.hwnd.0 as isize));
                    }
                    let _ = DestroyWindow(self.hwnd);
                    self.hwnd = HWND::default();
                }
            }
        }
    }

    impl Drop for OverlayWindow {
        fn drop(&mut self) {
            self.shutdown();
        }
    }

}

#[cfg(windows)]
pub use platform::OverlayWindow;

#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct OverlayWindow {
    surface: SurfaceRect,
}

#[cfg(not(windows))]
impl OverlayWindow {
    pub fn create_fullscreen() -> Result<Self, OverlayError> {
        Ok(Self {
            surface: SurfaceRect {
                x: 0,
                y: 0,
                width: 1280,
                height: 720,
            },
        })
    }

    pub fn size(&self) -> (i32, i32) {
        (self.surface.width, self.surface.height)
    }

    pub fn drain_pointer_events(&self) -> Vec<PointerSample> {
        Vec::new()
    }

    pub fn show(&self) {}

    pub fn request_paint(&self) {}

    pub fn paint_scene(&mut self, _scene: &crate::overlay::view::OverlayScene) {}

    pub fn shutdown(&mut self) {}
}

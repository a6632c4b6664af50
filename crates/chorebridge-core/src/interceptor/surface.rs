use std::sync::{Arc, Weak};

use super::{interceptor_script, EndpointPatterns};

/// The embedded browser view hosting the remote application.
///
/// Owned by the UI layer; native code only ever holds a [`SurfaceHandle`].
pub trait BrowserSurface: Send + Sync {
    /// Evaluate `script` in the current page.
    fn evaluate_script(&self, script: &str) -> Result<(), String>;
}

/// Non-owning reference to a [`BrowserSurface`].
///
/// The view may be torn down at any time (screen closed, activity
/// recreated), so every use goes through [`SurfaceHandle::with_live`].
#[derive(Clone, Default)]
pub struct SurfaceHandle {
    inner: Option<Weak<dyn BrowserSurface>>,
}

impl SurfaceHandle {
    pub fn new(surface: &Arc<dyn BrowserSurface>) -> Self {
        Self {
            inner: Some(Arc::downgrade(surface)),
        }
    }

    /// Handle that never resolves.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.inner.as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Run `f` against the surface if it still exists.
    pub fn with_live<R>(&self, f: impl FnOnce(&dyn BrowserSurface) -> R) -> Option<R> {
        let surface = self.inner.as_ref()?.upgrade()?;
        Some(f(surface.as_ref()))
    }
}

impl std::fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Install the interceptor into the page behind `handle`.
///
/// Returns `true` if the script was evaluated. A dead surface or a script
/// error is logged and reported as `false`; page loading is never affected.
pub fn inject_interceptor(handle: &SurfaceHandle, patterns: &EndpointPatterns, bridge_name: &str) -> bool {
    let script = interceptor_script(patterns, bridge_name);
    match handle.with_live(|surface| surface.evaluate_script(&script)) {
        Some(Ok(())) => {
            tracing::debug!(bridge = bridge_name, "interceptor injected");
            true
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "interceptor injection failed");
            false
        }
        None => {
            tracing::debug!("browser surface gone, skipping interceptor injection");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSurface {
        scripts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl BrowserSurface for RecordingSurface {
        fn evaluate_script(&self, script: &str) -> Result<(), String> {
            if self.fail {
                return Err("page not ready".into());
            }
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(())
        }
    }

    #[test]
    fn injects_into_live_surface() {
        let concrete = Arc::new(RecordingSurface::default());
        let surface: Arc<dyn BrowserSurface> = concrete.clone();
        let handle = SurfaceHandle::new(&surface);

        assert!(handle.is_alive());
        assert!(inject_interceptor(&handle, &EndpointPatterns::default(), "ChoreBridge"));
        let scripts = concrete.scripts.lock().unwrap();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("ChoreBridge"));
    }

    #[test]
    fn dead_surface_is_a_noop() {
        let surface: Arc<dyn BrowserSurface> = Arc::new(RecordingSurface::default());
        let handle = SurfaceHandle::new(&surface);
        drop(surface);

        assert!(!handle.is_alive());
        assert!(!inject_interceptor(&handle, &EndpointPatterns::default(), "ChoreBridge"));
        assert!(!SurfaceHandle::detached().is_alive());
    }

    #[test]
    fn script_errors_are_swallowed() {
        let surface: Arc<dyn BrowserSurface> = Arc::new(RecordingSurface {
            fail: true,
            ..Default::default()
        });
        let handle = SurfaceHandle::new(&surface);
        assert!(!inject_interceptor(&handle, &EndpointPatterns::default(), "ChoreBridge"));
    }
}

/// Invoked once with the user's answer to a permission request.
pub type PermissionCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Platform notification permission.
pub trait PermissionGate: Send + Sync {
    fn has_permission(&self) -> bool;

    /// Ask the user. `on_result` may run on any thread, possibly much later,
    /// or never if the prompt is dismissed.
    fn request_permission(&self, on_result: PermissionCallback);
}

/// Gate with a fixed answer that reports it immediately.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissionGate(pub bool);

impl StaticPermissionGate {
    pub fn granted() -> Self {
        Self(true)
    }

    pub fn denied() -> Self {
        Self(false)
    }
}

impl PermissionGate for StaticPermissionGate {
    fn has_permission(&self) -> bool {
        self.0
    }

    fn request_permission(&self, on_result: PermissionCallback) {
        on_result(self.0);
    }
}

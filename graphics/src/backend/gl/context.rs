//! GL context ownership and the scoped "make current" primitive.
//!
//! A [`GlContext`] wraps one native context ([`PlatformContext`]) and its
//! entry points ([`GlApi`]). GL calls are only legal while the context is
//! current on the calling thread; [`GlContext::lock`] returns a
//! [`ContextLock`] guard that makes it current and releases it on drop,
//! including during unwinding. The guard is reentrant on one thread: a nested
//! lock of the context that is already innermost only bumps a depth counter,
//! while relocking an outer context makes it current again until the nested
//! guard drops.
//!
//! [`ContextRegistry`] is the process-wide record of which thread has which
//! context current. Each thread also keeps the stack of contexts it made
//! current so that releasing an inner context restores the outer one.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::ThreadId;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use super::api::GlApi;
use super::constants::*;
use crate::error::GraphicsError;

/// The context-creation boundary: a native GL context.
pub trait PlatformContext: Send + Sync {
    /// Make the context current on the calling thread.
    fn make_current(&self) -> Result<(), GraphicsError>;
    /// Release the context from the calling thread.
    fn release_current(&self);
    /// Present the default framebuffer.
    fn swap_buffers(&self) -> Result<(), GraphicsError>;
}

/// Process-unique identifier of a [`GlContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Major and minor version of a GL context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
}

impl GlVersion {
    /// Create a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses the leading `major.minor` of a `GL_VERSION` string
    /// (e.g. `"4.6.0 NVIDIA 535.104"`).
    pub fn parse(version: &str) -> Option<Self> {
        let numeric = version
            .split_whitespace()
            .next()?
            .split('.')
            .take(2)
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        match numeric.as_slice() {
            [major, minor] => Some(Self::new(*major, *minor)),
            _ => None,
        }
    }
}

impl std::fmt::Display for GlVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

// ============================================================================
// Registry
// ============================================================================

struct StackEntry {
    id: ContextId,
    platform: Arc<dyn PlatformContext>,
}

thread_local! {
    static CURRENT_STACK: RefCell<Vec<StackEntry>> = const { RefCell::new(Vec::new()) };
}

fn current_map() -> &'static Mutex<HashMap<ContextId, ThreadId>> {
    static MAP: OnceLock<Mutex<HashMap<ContextId, ThreadId>>> = OnceLock::new();
    MAP.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Process-wide record of current contexts.
pub struct ContextRegistry;

impl ContextRegistry {
    /// The thread the context is current on, if any.
    pub fn current_thread(id: ContextId) -> Option<ThreadId> {
        current_map().lock().get(&id).copied()
    }

    /// The innermost context current on the calling thread.
    pub fn current_on_this_thread() -> Option<ContextId> {
        CURRENT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.id))
    }

    fn push(id: ContextId, platform: Arc<dyn PlatformContext>) {
        current_map().lock().insert(id, std::thread::current().id());
        CURRENT_STACK.with(|stack| stack.borrow_mut().push(StackEntry { id, platform }));
    }

    /// Pops the innermost entry of `id` and returns the outer context to
    /// restore, if any.
    fn pop(id: ContextId) -> Option<Arc<dyn PlatformContext>> {
        CURRENT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|entry| entry.id == id) {
                stack.remove(position);
            }
            if !stack.iter().any(|entry| entry.id == id) {
                current_map().lock().remove(&id);
            }
            stack.last().map(|entry| entry.platform.clone())
        })
    }
}

// ============================================================================
// Context
// ============================================================================

/// A native GL context owned by one logical device.
pub struct GlContext {
    id: ContextId,
    platform: Arc<dyn PlatformContext>,
    gl: Arc<dyn GlApi>,
    depth: ReentrantMutex<Cell<u32>>,
    lost: AtomicBool,
    version: OnceLock<GlVersion>,
}

impl GlContext {
    /// Wrap a platform context and its entry points.
    pub fn new(platform: Arc<dyn PlatformContext>, gl: Arc<dyn GlApi>) -> Self {
        let id = ContextId::next();
        log::trace!("GlContext: created context {:?}", id);
        Self {
            id,
            platform,
            gl,
            depth: ReentrantMutex::new(Cell::new(0)),
            lost: AtomicBool::new(false),
            version: OnceLock::new(),
        }
    }

    /// Identifier of this context.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Whether the context has been lost.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Flag the context as lost; every later acquisition fails.
    pub fn mark_lost(&self) {
        if !self.lost.swap(true, Ordering::AcqRel) {
            log::error!("GlContext {:?}: context lost", self.id);
        }
    }

    /// Make the context current, blocking while another thread holds it.
    pub fn lock(&self) -> Result<ContextLock<'_>, GraphicsError> {
        if self.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        let guard = self.depth.lock();
        self.enter(guard)
    }

    /// Make the context current, failing with [`GraphicsError::ContextBusy`]
    /// when another thread holds it.
    pub fn try_lock(&self) -> Result<ContextLock<'_>, GraphicsError> {
        if self.is_lost() {
            return Err(GraphicsError::DeviceLost);
        }
        let guard = self.depth.try_lock().ok_or(GraphicsError::ContextBusy)?;
        self.enter(guard)
    }

    fn enter<'a>(
        &'a self,
        guard: ReentrantMutexGuard<'a, Cell<u32>>,
    ) -> Result<ContextLock<'a>, GraphicsError> {
        let depth = guard.get();
        // Another context may have been made current since the outer lock.
        let switched = depth == 0 || ContextRegistry::current_on_this_thread() != Some(self.id);
        if switched {
            if let Err(err) = self.platform.make_current() {
                log::error!("GlContext {:?}: make_current failed: {err}", self.id);
                self.mark_lost();
                return Err(GraphicsError::DeviceLost);
            }
            ContextRegistry::push(self.id, self.platform.clone());
        }
        guard.set(depth + 1);
        Ok(ContextLock {
            context: self,
            guard,
            switched,
        })
    }

    /// Version reported by `glGetString(GL_VERSION)`, queried once.
    pub fn version(&self) -> Result<GlVersion, GraphicsError> {
        if let Some(version) = self.version.get() {
            return Ok(*version);
        }
        let lock = self.lock()?;
        let string = lock.gl().get_string(GL_VERSION);
        let version = GlVersion::parse(&string).ok_or_else(|| {
            GraphicsError::InitializationFailed(format!("unparsable GL_VERSION {string:?}"))
        })?;
        log::info!("GlContext {:?}: GL version {version} ({string})", self.id);
        Ok(*self.version.get_or_init(|| version))
    }

    /// Present the default framebuffer.
    pub(crate) fn swap_buffers(&self) -> Result<(), GraphicsError> {
        let _lock = self.lock()?;
        self.platform.swap_buffers().inspect_err(|_| self.mark_lost())
    }
}

impl std::fmt::Debug for GlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlContext")
            .field("id", &self.id)
            .field("lost", &self.is_lost())
            .field("version", &self.version.get())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(GlContext: Send, Sync);

/// Guard keeping a [`GlContext`] current on the calling thread.
pub struct ContextLock<'a> {
    context: &'a GlContext,
    guard: ReentrantMutexGuard<'a, Cell<u32>>,
    /// This guard made the context current and pushed it on the registry.
    switched: bool,
}

impl ContextLock<'_> {
    /// The GL entry points of the locked context.
    pub fn gl(&self) -> &dyn GlApi {
        self.context.gl.as_ref()
    }

    /// The locked context.
    pub fn context(&self) -> &GlContext {
        self.context
    }

    /// Nesting depth of this guard on the current thread.
    pub fn depth(&self) -> u32 {
        self.guard.get()
    }
}

impl Drop for ContextLock<'_> {
    fn drop(&mut self) {
        let depth = self.guard.get() - 1;
        self.guard.set(depth);
        if self.switched {
            self.context.platform.release_current();
            if let Some(outer) = ContextRegistry::pop(self.context.id) {
                if let Err(err) = outer.make_current() {
                    log::error!("GlContext: failed to restore outer context: {err}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::gl::{HeadlessPlatform, RecordingGl};

    fn context() -> (GlContext, HeadlessPlatform) {
        let platform = HeadlessPlatform::new();
        let context = GlContext::new(Arc::new(platform.clone()), Arc::new(RecordingGl::new()));
        (context, platform)
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(
            GlVersion::parse("4.6.0 NVIDIA 535.104"),
            Some(GlVersion::new(4, 6))
        );
        assert_eq!(GlVersion::parse("3.3"), Some(GlVersion::new(3, 3)));
        assert_eq!(GlVersion::parse("OpenGL"), None);
    }

    #[test]
    fn test_lock_is_reentrant() {
        let (context, platform) = context();
        {
            let outer = context.lock().unwrap();
            let inner = context.lock().unwrap();
            assert_eq!(inner.depth(), 2);
            drop(inner);
            assert_eq!(outer.depth(), 1);
            assert_eq!(platform.make_current_count(), 1);
            assert_eq!(platform.release_current_count(), 0);
        }
        assert_eq!(platform.release_current_count(), 1);
        assert_eq!(ContextRegistry::current_thread(context.id()), None);
    }

    #[test]
    fn test_registry_tracks_current_thread() {
        let (context, _platform) = context();
        let lock = context.lock().unwrap();
        assert_eq!(
            ContextRegistry::current_thread(context.id()),
            Some(std::thread::current().id())
        );
        assert_eq!(ContextRegistry::current_on_this_thread(), Some(context.id()));
        drop(lock);
        assert_eq!(ContextRegistry::current_on_this_thread(), None);
    }

    #[test]
    fn test_nested_contexts_restore_outer() {
        let (first, first_platform) = context();
        let (second, _second_platform) = context();
        let outer = first.lock().unwrap();
        {
            let _inner = second.lock().unwrap();
            assert_eq!(ContextRegistry::current_on_this_thread(), Some(second.id()));
        }
        assert_eq!(ContextRegistry::current_on_this_thread(), Some(first.id()));
        assert_eq!(first_platform.make_current_count(), 2);
        drop(outer);
    }

    #[test]
    fn test_relocking_outer_context_makes_it_current_again() {
        let (first, first_platform) = context();
        let (second, second_platform) = context();
        let outer = first.lock().unwrap();
        let middle = second.lock().unwrap();
        {
            let inner = first.lock().unwrap();
            assert_eq!(inner.depth(), 2);
            assert_eq!(ContextRegistry::current_on_this_thread(), Some(first.id()));
            assert_eq!(first_platform.make_current_count(), 2);
        }
        assert_eq!(ContextRegistry::current_on_this_thread(), Some(second.id()));
        assert_eq!(second_platform.make_current_count(), 2);
        assert_eq!(
            ContextRegistry::current_thread(first.id()),
            Some(std::thread::current().id())
        );

        drop(middle);
        assert_eq!(ContextRegistry::current_on_this_thread(), Some(first.id()));
        assert_eq!(first_platform.make_current_count(), 3);
        drop(outer);
        assert_eq!(ContextRegistry::current_on_this_thread(), None);
        assert_eq!(ContextRegistry::current_thread(first.id()), None);
    }

    #[test]
    fn test_failed_make_current_marks_lost() {
        let (context, platform) = context();
        platform.lose();
        assert_eq!(context.lock().err(), Some(GraphicsError::DeviceLost));
        assert!(context.is_lost());
        assert_eq!(ContextRegistry::current_thread(context.id()), None);
    }

    #[test]
    fn test_try_lock_fails_while_another_thread_holds_it() {
        let (context, _platform) = context();
        let lock = context.lock().unwrap();
        std::thread::scope(|scope| {
            let result = scope.spawn(|| context.try_lock().err()).join().unwrap();
            assert_eq!(result, Some(GraphicsError::ContextBusy));
        });
        drop(lock);
        std::thread::scope(|scope| {
            let acquired = scope.spawn(|| context.try_lock().is_ok()).join().unwrap();
            assert!(acquired);
        });
    }

    #[test]
    fn test_lock_released_on_unwind() {
        let (context, platform) = context();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lock = context.lock().unwrap();
            panic!("replay failed");
        }));
        assert!(result.is_err());
        assert_eq!(platform.release_current_count(), 1);
        assert_eq!(ContextRegistry::current_on_this_thread(), None);
        assert!(context.try_lock().is_ok());
    }
}

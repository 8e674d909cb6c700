//! Graphics instance.
//!
//! The [`GraphicsInstance`] is the top-level entry point. It selects the
//! backend once, from [`InstanceParameters`], and creates
//! [`GraphicsDevice`]s from [`Connection`]s.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
#[cfg(feature = "vulkan-backend")]
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::gl::{GlBackend, GlContext, GlProfile};
use crate::backend::test::TestBackend;
#[cfg(feature = "vulkan-backend")]
use crate::backend::vulkan::{VulkanBackend, VulkanDeviceRequest, VulkanInstance};
use crate::backend::{BackendType, DeviceBackend};
use crate::connection::{Connection, Platform};
use crate::device::GraphicsDevice;
use crate::error::{GraphicsError, GraphicsResult};
#[cfg(feature = "vulkan-backend")]
use crate::surface::Surface;

/// Configuration of a [`GraphicsInstance`].
///
/// # Example
///
/// ```ignore
/// let params = InstanceParameters::new()
///     .with_backend(BackendType::Gl4)
///     .with_validation(true);
/// let instance = GraphicsInstance::new(params)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceParameters {
    /// Backend every device of the instance runs on.
    pub backend: BackendType,
    /// Enables native validation: the Khronos layer on Vulkan, a
    /// `glGetError` check after every replayed command on GL.
    pub validation: bool,
    pub application_name: String,
}

impl Default for InstanceParameters {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            validation: cfg!(debug_assertions),
            application_name: "ashes".to_string(),
        }
    }
}

impl InstanceParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}

/// The graphics instance creates and tracks devices.
///
/// # Thread Safety
///
/// `GraphicsInstance` is `Send + Sync` and can be shared across threads.
///
/// # Example
///
/// ```ignore
/// let instance = GraphicsInstance::new(InstanceParameters::default())?;
/// let device = instance.create_device(Connection::headless())?;
/// ```
pub struct GraphicsInstance {
    /// Weak self-reference handed to surfaces.
    self_ref: RwLock<Weak<GraphicsInstance>>,
    parameters: InstanceParameters,
    devices: RwLock<Vec<Arc<GraphicsDevice>>>,
    #[cfg(feature = "vulkan-backend")]
    vulkan: Option<Arc<VulkanInstance>>,
}

impl GraphicsInstance {
    /// Create an instance for the configured backend.
    ///
    /// # Errors
    ///
    /// On Vulkan, fails when the loader or an instance cannot be created.
    /// Selecting Vulkan without the `vulkan-backend` feature fails with
    /// [`GraphicsError::FeatureNotSupported`].
    pub fn new(parameters: InstanceParameters) -> GraphicsResult<Arc<Self>> {
        log::info!(
            "Creating GraphicsInstance ({} backend, validation: {})",
            parameters.backend.name(),
            parameters.validation
        );

        #[cfg(feature = "vulkan-backend")]
        let vulkan = match parameters.backend {
            BackendType::Vulkan => Some(Arc::new(VulkanInstance::new(
                &parameters.application_name,
                parameters.validation,
            )?)),
            _ => None,
        };
        #[cfg(not(feature = "vulkan-backend"))]
        if parameters.backend == BackendType::Vulkan {
            return Err(GraphicsError::FeatureNotSupported(
                "built without the vulkan-backend feature".to_string(),
            ));
        }

        let instance = Arc::new(Self {
            self_ref: RwLock::new(Weak::new()),
            parameters,
            devices: RwLock::new(Vec::new()),
            #[cfg(feature = "vulkan-backend")]
            vulkan,
        });
        *instance.self_ref.write() = Arc::downgrade(&instance);
        Ok(instance)
    }

    pub fn parameters(&self) -> &InstanceParameters {
        &self.parameters
    }

    pub fn backend_type(&self) -> BackendType {
        self.parameters.backend
    }

    /// Create a device on the native objects of `connection`.
    ///
    /// # Errors
    ///
    /// - [`GraphicsError::InvalidParameter`] when the connection's platform
    ///   does not match the instance backend
    /// - [`GraphicsError::InitializationFailed`] when the backend cannot be
    ///   brought up, e.g. a GL context older than the profile requires
    pub fn create_device(&self, connection: Connection) -> GraphicsResult<Arc<GraphicsDevice>> {
        let backend_type = self.parameters.backend;
        let mismatch = || {
            GraphicsError::InvalidParameter(format!(
                "{} backend cannot use a {} connection",
                backend_type.name(),
                connection.platform.name()
            ))
        };
        if !connection.layers.is_empty() {
            log::debug!(
                "GraphicsInstance: device layers {:?} are ignored",
                connection.layers
            );
        }

        let graphics_family = connection.graphics_family.unwrap_or(0);
        let present_family = connection.present_family.unwrap_or(graphics_family);

        let device = match (backend_type, &connection.platform) {
            (BackendType::Test, Platform::Headless) => GraphicsDevice::new(
                backend_type,
                DeviceBackend::Test(TestBackend::new()),
                graphics_family,
                present_family,
            ),
            (BackendType::Gl3 | BackendType::Gl4, Platform::Gl { context, api }) => {
                let profile = if backend_type == BackendType::Gl3 {
                    GlProfile::Gl3
                } else {
                    GlProfile::Gl4
                };
                let context = Arc::new(GlContext::new(Arc::clone(context), Arc::clone(api)));
                let backend = GlBackend::new(context, profile, self.parameters.validation)?;
                GraphicsDevice::new(
                    backend_type,
                    DeviceBackend::Gl(backend),
                    graphics_family,
                    present_family,
                )
            }
            #[cfg(feature = "vulkan-backend")]
            (
                BackendType::Vulkan,
                Platform::Vulkan {
                    physical_device,
                    surface,
                },
            ) => {
                let vulkan = self.vulkan.as_ref().ok_or_else(|| {
                    GraphicsError::Internal("Vulkan instance missing".to_string())
                })?;
                let backend = VulkanBackend::new(
                    Arc::clone(vulkan),
                    VulkanDeviceRequest {
                        physical_device: *physical_device,
                        surface: surface.clone(),
                        graphics_family: connection.graphics_family,
                        present_family: connection.present_family,
                        extensions: &connection.extensions,
                    },
                )?;
                let (graphics_family, present_family) =
                    (backend.graphics_family(), backend.present_family());
                GraphicsDevice::new(
                    backend_type,
                    DeviceBackend::Vulkan(backend),
                    graphics_family,
                    present_family,
                )
            }
            _ => return Err(mismatch()),
        };

        let device = Arc::new(device);
        log::info!(
            "GraphicsInstance: created {} device {:?}",
            backend_type.name(),
            device.id()
        );
        self.devices.write().push(Arc::clone(&device));
        Ok(device)
    }

    /// All devices created by this instance.
    pub fn devices(&self) -> Vec<Arc<GraphicsDevice>> {
        self.devices.read().clone()
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Create a surface for presenting to a window.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::FeatureNotSupported`] on non-Vulkan instances;
    /// GL devices present through their platform context instead.
    #[cfg(feature = "vulkan-backend")]
    pub fn create_surface<W>(&self, window: &W) -> GraphicsResult<Arc<Surface>>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let vulkan = self.vulkan.as_ref().ok_or_else(|| {
            GraphicsError::FeatureNotSupported(format!(
                "{} instances have no window surfaces",
                self.parameters.backend.name()
            ))
        })?;
        Ok(Arc::new(Surface::new(Arc::clone(vulkan), window)?))
    }

    /// Strong reference to this instance, while one exists.
    pub fn arc_self(&self) -> Option<Arc<GraphicsInstance>> {
        self.self_ref.read().upgrade()
    }
}

impl std::fmt::Debug for GraphicsInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsInstance")
            .field("backend", &self.parameters.backend)
            .field("device_count", &self.device_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsInstance: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::gl::{HeadlessPlatform, RecordingGl};

    fn test_instance() -> Arc<GraphicsInstance> {
        GraphicsInstance::new(InstanceParameters::new().with_backend(BackendType::Test)).unwrap()
    }

    fn gl_connection(version: &str) -> Connection {
        Connection::gl(
            Arc::new(HeadlessPlatform::new()),
            Arc::new(RecordingGl::with_version(version)),
        )
    }

    #[test]
    fn test_parameters_builder() {
        let params = InstanceParameters::new()
            .with_backend(BackendType::Gl3)
            .with_validation(false)
            .with_application_name("demo");
        assert_eq!(params.backend, BackendType::Gl3);
        assert!(!params.validation);
        assert_eq!(params.application_name, "demo");
    }

    #[test]
    fn test_instance_creation() {
        let instance = test_instance();
        assert_eq!(instance.device_count(), 0);
        assert_eq!(instance.backend_type(), BackendType::Test);
        assert!(Arc::ptr_eq(&instance.arc_self().unwrap(), &instance));
    }

    #[test]
    fn test_create_device() {
        let instance = test_instance();
        let device = instance.create_device(Connection::headless()).unwrap();
        assert_eq!(device.backend_type(), BackendType::Test);
        assert_eq!(instance.device_count(), 1);
    }

    #[test]
    fn test_create_multiple_devices() {
        let instance = test_instance();
        let a = instance.create_device(Connection::headless()).unwrap();
        let b = instance.create_device(Connection::headless()).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(instance.devices().len(), 2);
    }

    #[test]
    fn test_platform_mismatch() {
        let instance = test_instance();
        let result = instance.create_device(gl_connection("4.6"));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        assert_eq!(instance.device_count(), 0);
    }

    #[test]
    fn test_gl_devices() {
        let gl3 = GraphicsInstance::new(InstanceParameters::new().with_backend(BackendType::Gl3))
            .unwrap();
        let device = gl3.create_device(gl_connection("3.3.0 core")).unwrap();
        assert_eq!(device.backend_type(), BackendType::Gl3);
        assert!(!device.capabilities().compute);

        let gl4 = GraphicsInstance::new(InstanceParameters::new().with_backend(BackendType::Gl4))
            .unwrap();
        let device = gl4.create_device(gl_connection("4.6.0")).unwrap();
        assert!(device.capabilities().compute);
    }

    #[test]
    fn test_gl4_rejects_old_context() {
        let instance =
            GraphicsInstance::new(InstanceParameters::new().with_backend(BackendType::Gl4))
                .unwrap();
        let result = instance.create_device(gl_connection("3.3.0 core"));
        assert!(matches!(result, Err(GraphicsError::InitializationFailed(_))));
    }
}

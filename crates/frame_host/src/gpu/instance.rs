//! Vulkan instance and validation messenger

use std::ffi::{c_char, c_void, CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry};

use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
const ENGINE_NAME: &str = "frame_host";

struct Messenger {
    debug_utils: DebugUtils,
    messenger: vk::DebugUtilsMessengerEXT,
}

/// Vulkan instance with RAII cleanup
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    messenger: Option<Messenger>,
}

impl Instance {
    /// Create an instance with the platform's surface extensions
    ///
    /// Validation is enabled when the config asks for it and the layer is
    /// installed; a missing layer only logs a warning.
    pub fn new(config: &RuntimeConfig, platform_extensions: &[String]) -> RuntimeResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| RuntimeError::DeviceUnavailable(format!("Failed to load Vulkan: {e}")))?;

        let app_name = c_string(&config.application_name)?;
        let engine_name = c_string(ENGINE_NAME)?;
        let (major, minor, patch) = config.application_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_1);

        let validation = config.validation_enabled() && layer_available(&entry, VALIDATION_LAYER);
        if config.validation_enabled() && !validation {
            log::warn!("{VALIDATION_LAYER} requested but not installed; continuing without it");
        }

        let mut extension_names = platform_extensions
            .iter()
            .map(|name| c_string(name))
            .collect::<RuntimeResult<Vec<_>>>()?;
        if validation {
            extension_names.push(DebugUtils::name().to_owned());
        }
        let extension_ptrs: Vec<*const c_char> = extension_names.iter().map(|name| name.as_ptr()).collect();

        let layer_names = if validation {
            vec![c_string(VALIDATION_LAYER)?]
        } else {
            Vec::new()
        };
        let layer_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(RuntimeError::vk("instance creation"))?
        };

        let messenger = if validation {
            match create_messenger(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(error) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(error);
                }
            }
        } else {
            None
        };

        log::info!(
            "Vulkan instance created for '{}' (validation {})",
            config.application_name,
            if validation { "on" } else { "off" }
        );

        Ok(Self { entry, instance, messenger })
    }

    /// Loader entry points
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Instance function table
    pub fn raw(&self) -> &ash::Instance {
        &self.instance
    }

    /// Whether validation messages are being routed to the log
    pub fn validation_enabled(&self) -> bool {
        self.messenger.is_some()
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let Some(messenger) = self.messenger.take() {
                messenger
                    .debug_utils
                    .destroy_debug_utils_messenger(messenger.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn c_string(value: &str) -> RuntimeResult<CString> {
    CString::new(value).map_err(|_| RuntimeError::invalid(format!("interior NUL in '{value}'")))
}

fn layer_available(entry: &Entry, name: &str) -> bool {
    let Ok(layers) = entry.enumerate_instance_layer_properties() else {
        return false;
    };
    layers.iter().any(|layer| {
        let layer_name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
        layer_name.to_str() == Ok(name)
    })
}

fn create_messenger(entry: &Entry, instance: &ash::Instance) -> RuntimeResult<Messenger> {
    let debug_utils = DebugUtils::new(entry, instance);
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    let messenger = unsafe {
        debug_utils
            .create_debug_utils_messenger(&create_info, None)
            .map_err(RuntimeError::vk("debug messenger creation"))?
    };

    Ok(Messenger { debug_utils, messenger })
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {message_type:?} - {message}");
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {message_type:?} - {message}");
    } else {
        log::debug!("[Vulkan] {message_type:?} - {message}");
    }

    vk::FALSE
}

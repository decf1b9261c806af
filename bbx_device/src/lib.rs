//! # BBX Device
//!
//! Composite-device binding for the binaural spatializer core: a `cpal` stream pair, the
//! zero-allocation render callback, and the stream state machine the control thread drives.
//!
//! ```ignore
//! use std::sync::Arc;
//! use arc_swap::ArcSwapOption;
//! use bbx_device::stream::CompositeDeviceStream;
//!
//! let slot = Arc::new(ArcSwapOption::from(None));
//! let device = CompositeDeviceStream::new(slot);
//! device.configure_stream(8, 8, 0, 48_000, 256)?;
//! device.start()?;
//! # Ok::<(), bbx_device::error::DeviceError>(())
//! ```

pub mod error;
pub mod stream;

pub use error::{DeviceError, Result};
pub use stream::{CompositeDeviceStream, StreamLifecycle};

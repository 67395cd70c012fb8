//! Compute backend selection.
//!
//! Backends are compiled in through cargo features. Estimators that accept a
//! backend name check it against the compiled capabilities, which are probed
//! once per process.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[cfg(feature = "backend-ndarray")]
pub use burn_ndarray::NdArray;

#[cfg(feature = "backend-wgpu")]
pub use burn_wgpu::Wgpu;

#[cfg(feature = "backend-tch")]
pub use burn_tch::LibTorch;

/// A named compute backend.
///
/// Names are case-sensitive: `"cpu"`, `"gpu"` and `"tch"`.
///
/// ```rust
/// use tsforge_core::ComputeBackend;
///
/// let backend: ComputeBackend = "cpu".parse().unwrap();
/// assert_eq!(backend, ComputeBackend::Cpu);
/// assert!("CPU".parse::<ComputeBackend>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ComputeBackend {
    /// Pure-Rust CPU backend (`burn-ndarray`).
    #[default]
    Cpu,
    /// WebGPU backend (`burn-wgpu`).
    Wgpu,
    /// LibTorch backend (`burn-tch`).
    LibTorch,
}

#[derive(Debug, Clone, Copy)]
struct Capabilities {
    ndarray: bool,
    wgpu: bool,
    tch: bool,
}

fn capabilities() -> &'static Capabilities {
    static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();
    CAPABILITIES.get_or_init(|| {
        let caps = Capabilities {
            ndarray: cfg!(feature = "backend-ndarray"),
            wgpu: cfg!(feature = "backend-wgpu"),
            tch: cfg!(feature = "backend-tch"),
        };
        tracing::debug!(?caps, "Compute backend capabilities");
        caps
    })
}

impl ComputeBackend {
    /// Accepted backend names.
    pub const NAMES: [&'static str; 3] = ["cpu", "gpu", "tch"];

    /// The backend's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            ComputeBackend::Cpu => "cpu",
            ComputeBackend::Wgpu => "gpu",
            ComputeBackend::LibTorch => "tch",
        }
    }

    /// Cargo feature that compiles this backend in.
    #[must_use]
    pub const fn feature(&self) -> &'static str {
        match self {
            ComputeBackend::Cpu => "backend-ndarray",
            ComputeBackend::Wgpu => "backend-wgpu",
            ComputeBackend::LibTorch => "backend-tch",
        }
    }

    /// Whether this build includes the backend.
    #[must_use]
    pub fn is_available(&self) -> bool {
        let caps = capabilities();
        match self {
            ComputeBackend::Cpu => caps.ndarray,
            ComputeBackend::Wgpu => caps.wgpu,
            ComputeBackend::LibTorch => caps.tch,
        }
    }

    /// All backends this build includes.
    #[must_use]
    pub fn available() -> Vec<ComputeBackend> {
        [ComputeBackend::Cpu, ComputeBackend::Wgpu, ComputeBackend::LibTorch]
            .into_iter()
            .filter(ComputeBackend::is_available)
            .collect()
    }

    /// Fail unless this build includes the backend.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDependency`] naming the feature to enable.
    pub fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CoreError::MissingDependency {
                backend: self.name().to_string(),
                feature: self.feature(),
            })
        }
    }
}

impl FromStr for ComputeBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(ComputeBackend::Cpu),
            "gpu" => Ok(ComputeBackend::Wgpu),
            "tch" => Ok(ComputeBackend::LibTorch),
            _ => Err(CoreError::UnknownBackend {
                name: s.to_string(),
                valid: Self::NAMES.to_vec(),
            }),
        }
    }
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for ComputeBackend {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ComputeBackend> for String {
    fn from(backend: ComputeBackend) -> Self {
        backend.name().to_string()
    }
}

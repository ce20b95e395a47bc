/// Process-wide configuration for Tessera.
///
/// ```no_run
/// use tessera_core::config::Config;
///
/// Config::from_env().apply();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub profiling: ProfilingMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfilingMode {
    /// Profiling scopes are compiled in but not recorded
    #[default]
    Off,
    /// Scopes are recorded and can be inspected in-process
    On,
    /// Scopes are recorded and served to `puffin_viewer` over HTTP
    WithWebserver,
}

impl ProfilingMode {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "0" | "off" => ProfilingMode::Off,
            "http" => ProfilingMode::WithWebserver,
            _ => ProfilingMode::On,
        }
    }
}

impl Config {
    /// Environment variable selecting the profiling mode.
    pub const PROFILE_ENV: &'static str = "TESSERA_PROFILE";

    /// Read the profiling mode from `TESSERA_PROFILE`.
    ///
    /// `http` serves scopes to `puffin_viewer`, any other non-empty value
    /// records them in-process.
    pub fn from_env() -> Self {
        let profiling = std::env::var(Self::PROFILE_ENV)
            .ok()
            .map_or(ProfilingMode::Off, |value| ProfilingMode::parse(&value));
        Self { profiling }
    }

    /// Apply the profiling mode to the global puffin profiler.
    pub fn apply(&self) {
        tracing::debug!("Profiling mode: {:?}", self.profiling);
        match self.profiling {
            ProfilingMode::Off => puffin::set_scopes_on(false),
            ProfilingMode::On => puffin::set_scopes_on(true),
            ProfilingMode::WithWebserver => {
                crate::profiling::init_profiling(crate::profiling::ProfilingBackend::PuffinHttp)
            }
        }
    }
}

//! Application constants and configuration values

/// Volume curve constants
pub mod volume {
    /// Default dynamic range covered by the slider, in dB
    pub const DEFAULT_RANGE_DB: f64 = 60.0;
    /// Below this fraction of slider travel the curve is a linear ramp
    pub const LINEAR_KNEE: f64 = 0.1;
    /// Largest accepted dynamic range, in dB
    pub const MAX_RANGE_DB: f64 = 120.0;
}

/// CamillaDSP connection constants
pub mod camilla {
    /// Default websocket host
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    /// Default websocket port
    pub const DEFAULT_PORT: u16 = 1234;
    /// Upper bound for a single request/reply exchange
    pub const REQUEST_TIMEOUT_MS: u64 = 5000;
}

/// ALSA mixer constants
pub mod mixer {
    /// Default ALSA dummy device
    pub const DEFAULT_DEVICE: &str = "hw:Dummy";
    /// Default dummy mixer control
    pub const DEFAULT_CONTROL: &str = "Master";
}

/// Fallback state file constants
pub mod state {
    /// Where the last computed volume and mute flag are written
    pub const DEFAULT_STATE_FILE: &str = "/var/lib/cdsp/camilladsp_volume_state";
}

/// Curve table constants
pub mod table {
    /// Default step between printed percentages
    pub const DEFAULT_STEP: u8 = 10;
}

//! Commands sent by companion apps to the phone.

/// A recognised inbound command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    /// The app asks for the latest readings.
    GetData,
    /// The app asks for the latest readings, bypassing any app-side cache.
    ForceGetData,
}

impl InboundCommand {
    /// Parse a raw message. Unknown messages yield `None` and are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "getData" => Some(Self::GetData),
            "forceGetData" => Some(Self::ForceGetData),
            _ => None,
        }
    }

    /// Whether this command should trigger a reading push.
    pub fn requests_readings(&self) -> bool {
        matches!(self, Self::GetData | Self::ForceGetData)
    }
}

use crate::protocol::ClientSdkInfo;

/// The version of the SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The user agent the SDK reports to the server.
pub const USER_AGENT: &str = concat!("argus.rust/", env!("CARGO_PKG_VERSION"));

/// The SDK info attached to outgoing events.
pub fn sdk_info() -> ClientSdkInfo {
    ClientSdkInfo {
        name: "argus.rust".into(),
        version: VERSION.into(),
    }
}

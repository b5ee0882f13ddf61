use std::str::FromStr;

use config::ConfigError;

use crate::Error;
use crate::ModelError;
use crate::ModuleError;
use crate::SystemError;
use crate::ThingUid;

#[test]
fn io_error_converts_into_system_error() {
    let e: Error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();

    assert!(matches!(e, Error::System(SystemError::Io(_))));
    assert_eq!(e.to_string(), "IO error: denied");
}

#[test]
fn config_error_is_transparent() {
    let e: Error = ConfigError::Message("module_timeout_ms must be at least 1ms".into()).into();

    assert_eq!(e.to_string(), "module_timeout_ms must be at least 1ms");
}

#[test]
fn model_error_converts_into_error() {
    let e: Error = ThingUid::from_str("hue").unwrap_err().into();

    assert!(matches!(e, Error::Model(ModelError::InvalidThingUid(_))));
}

#[test]
fn module_error_messages_name_the_bridge() {
    let uid = ThingUid::from_str("hue:bridge:b1").unwrap();

    assert_eq!(
        ModuleError::BridgeUnavailable(uid).to_string(),
        "Bridge hue:bridge:b1 is not available"
    );

    let boxed: Box<dyn std::error::Error + Send + Sync> = "socket closed".into();
    assert_eq!(ModuleError::from(boxed).to_string(), "socket closed");
}

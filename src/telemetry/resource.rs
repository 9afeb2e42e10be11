//! Resource descriptor construction
//!
//! Builds the immutable attribute set attached to every span, metric and log
//! record exported by this process. The resulting [`Resource`] is cloned into
//! each provider; clones share the same underlying attributes.

use crate::config::ResourceConfig;
use crate::telemetry::error::TelemetryError;
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

const SERVICE_NAME: &str = "service.name";
const SERVICE_VERSION: &str = "service.version";
const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment.name";

/// Build the shared resource descriptor.
///
/// # Errors
///
/// Returns [`TelemetryError::ResourceBuild`] if the service name is blank or
/// any attribute key or value is malformed.
pub fn build_resource(config: &ResourceConfig) -> Result<Resource, TelemetryError> {
    let service_name = config.service_name.trim();
    if service_name.is_empty() {
        return Err(TelemetryError::resource(
            SERVICE_NAME,
            "service name cannot be empty",
        ));
    }
    validate_value(SERVICE_NAME, service_name)?;

    let mut attributes = Vec::with_capacity(config.attributes.len() + 2);
    for (key, value) in &config.attributes {
        validate_key(key)?;
        validate_value(key, value)?;
        attributes.push(KeyValue::new(key.clone(), value.clone()));
    }

    if let Some(version) = &config.service_version {
        validate_value(SERVICE_VERSION, version)?;
        attributes.push(KeyValue::new(SERVICE_VERSION, version.clone()));
    }

    if let Some(env) = &config.deployment_environment {
        validate_value(DEPLOYMENT_ENVIRONMENT, env)?;
        attributes.push(KeyValue::new(DEPLOYMENT_ENVIRONMENT, env.clone()));
    }

    Ok(Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attributes(attributes)
        .build())
}

fn validate_key(key: &str) -> Result<(), TelemetryError> {
    if key.is_empty() {
        return Err(TelemetryError::resource(key, "attribute key cannot be empty"));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TelemetryError::resource(
            key,
            "attribute key cannot contain whitespace or control characters",
        ));
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), TelemetryError> {
    if value.chars().any(char::is_control) {
        return Err(TelemetryError::resource(
            key,
            "attribute value cannot contain control characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::{Key, Value};

    fn attr(resource: &Resource, key: &'static str) -> Option<Value> {
        resource.get(&Key::from_static_str(key))
    }

    #[test]
    fn test_default_service_name() {
        let resource = build_resource(&ResourceConfig::default()).unwrap();
        assert_eq!(attr(&resource, "service.name"), Some(Value::from("go-service")));
    }

    #[test]
    fn test_optional_attributes() {
        let mut config = ResourceConfig {
            service_name: "checkout".into(),
            service_version: Some("1.2.3".into()),
            deployment_environment: Some("staging".into()),
            ..Default::default()
        };
        config.attributes.insert("team".into(), "payments".into());

        let resource = build_resource(&config).unwrap();
        assert_eq!(attr(&resource, "service.name"), Some(Value::from("checkout")));
        assert_eq!(attr(&resource, "service.version"), Some(Value::from("1.2.3")));
        assert_eq!(
            attr(&resource, "deployment.environment.name"),
            Some(Value::from("staging"))
        );
        assert_eq!(attr(&resource, "team"), Some(Value::from("payments")));
    }

    #[test]
    fn test_blank_service_name_rejected() {
        let config = ResourceConfig {
            service_name: "   ".into(),
            ..Default::default()
        };
        let err = build_resource(&config).unwrap_err();
        assert!(matches!(err, TelemetryError::ResourceBuild { ref key, .. } if key == "service.name"));
    }

    #[test]
    fn test_malformed_attribute_rejected() {
        let mut config = ResourceConfig::default();
        config.attributes.insert("bad key".into(), "value".into());
        assert!(build_resource(&config).is_err());

        let mut config = ResourceConfig::default();
        config.attributes.insert("host".into(), "line\nbreak".into());
        assert!(build_resource(&config).is_err());
    }
}

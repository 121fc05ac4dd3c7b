use super::{CollectorError, ConfigError, StorageError, ValidationError};

impl From<&'static str> for ValidationError {
    fn from(message: &'static str) -> Self {
        ValidationError::TestExpectation { message }
    }
}

impl From<String> for ValidationError {
    fn from(value: String) -> Self {
        ValidationError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        ConfigError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for CollectorError {
    fn from(message: &'static str) -> Self {
        CollectorError::TestExpectation { message }
    }
}

impl From<String> for CollectorError {
    fn from(value: String) -> Self {
        CollectorError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for StorageError {
    fn from(message: &'static str) -> Self {
        StorageError::TestExpectation { message }
    }
}

impl From<String> for StorageError {
    fn from(value: String) -> Self {
        StorageError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{DaemonError, Result};
    use std::error::Error;
    use std::io;

    #[test]
    fn test_daemon_error_display() {
        let err = DaemonError::ServerError("supervisor init failed".to_string());
        assert_eq!(err.to_string(), "Server error: supervisor init failed");

        let err = DaemonError::ConfigError("helper.args[0]: cannot be empty".to_string());
        assert_eq!(err.to_string(), "Config error: helper.args[0]: cannot be empty");

        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err = DaemonError::IoError(io_err);
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_daemon_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let daemon_err: DaemonError = io_err.into();

        if let DaemonError::IoError(_) = daemon_err {
            // Expected variant
        } else {
            panic!("Expected DaemonError::IoError variant");
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<u32> {
            Ok(42)
        }

        fn returns_err() -> Result<u32> {
            Err(DaemonError::ServerError("test failure".to_string()))
        }

        assert_eq!(returns_ok().unwrap(), 42);
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_trait_implementation() {
        let err = DaemonError::ConfigError("test".to_string());

        let _: &dyn Error = &err;
        assert!(err.source().is_none());
    }
}

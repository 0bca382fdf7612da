// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal and surface before any data is collected.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required configuration: {0}")]
    MissingField(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_missing_field() {
        let error = ConfigError::MissingField("cluster.org".to_string());
        assert_eq!(
            error.to_string(),
            "Missing required configuration: cluster.org"
        );
    }

    #[test]
    fn test_invalid() {
        let error = ConfigError::Invalid("analysis.hours must be positive".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: analysis.hours must be positive"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let config_error: ConfigError = io_error.into();

        match config_error {
            ConfigError::IoError(_) => {
                assert!(config_error.to_string().contains("IO error"));
            }
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<u32>("[not, a, number]").unwrap_err();
        let config_error: ConfigError = yaml_error.into();

        match config_error {
            ConfigError::YamlError(_) => {
                assert!(config_error.to_string().contains("YAML parse error"));
            }
            _ => panic!("Expected YamlError variant"),
        }
    }

    #[test]
    fn test_error_debug_format() {
        let error = ConfigError::MissingField("axonops.token".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("MissingField"));
    }
}

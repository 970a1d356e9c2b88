//! Environment variable loading

use crate::{Result, ToolingError};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Load a variable as a string; `Ok(None)` when unset
pub fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ToolingError::InvalidUnicode(key.to_string())),
    }
}

/// Load and parse a variable
///
/// ```rust,ignore
/// let port: Option<u16> = get_env_parse("PARLEY_PORT")?;
/// ```
pub fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env(key)? {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ToolingError::Parse {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

pub fn get_env_or(key: &str, default: impl Into<String>) -> Result<String> {
    Ok(get_env(key)?.unwrap_or_else(|| default.into()))
}

/// Parsed value, or `default` when unset. A set but malformed value is still an error.
pub fn get_env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_env_parse(key)?.unwrap_or(default))
}

/// Load a boolean variable
///
/// Accepts `true/1/yes/on` and `false/0/no/off`, case-insensitive.
pub fn get_env_bool(key: &str) -> Result<Option<bool>> {
    match get_env(key)? {
        Some(val) => match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ToolingError::Parse {
                key: key.to_string(),
                message: format!("'{}' is not a boolean", val),
            }),
        },
        None => Ok(None),
    }
}

/// Comma-separated list; blank items are dropped
pub fn get_env_list(key: &str) -> Result<Option<Vec<String>>> {
    Ok(get_env(key)?.map(|val| {
        val.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }))
}

/// Whole seconds as a [`Duration`]
pub fn get_env_secs(key: &str) -> Result<Option<Duration>> {
    Ok(get_env_parse::<u64>(key)?.map(Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_missing() {
        assert!(get_env("TOOLING_TEST_MISSING_VAR_12345").unwrap().is_none());
        assert_eq!(
            get_env_or("TOOLING_TEST_MISSING_VAR_12345", "default").unwrap(),
            "default"
        );
    }

    #[test]
    fn test_get_env_parse() {
        env::set_var("TOOLING_TEST_NUMBER", " 42 ");
        let result: Option<u16> = get_env_parse("TOOLING_TEST_NUMBER").unwrap();
        assert_eq!(result, Some(42));
        env::remove_var("TOOLING_TEST_NUMBER");
    }

    #[test]
    fn test_get_env_parse_invalid() {
        env::set_var("TOOLING_TEST_INVALID_NUMBER", "not_a_number");
        let result = get_env_parse::<i32>("TOOLING_TEST_INVALID_NUMBER");
        assert!(matches!(result, Err(ToolingError::Parse { .. })));
        // the default does not hide a malformed value
        assert!(get_env_parse_or("TOOLING_TEST_INVALID_NUMBER", 1).is_err());
        env::remove_var("TOOLING_TEST_INVALID_NUMBER");
    }

    #[test]
    fn test_get_env_bool() {
        for (value, expected) in [
            ("true", true),
            ("YES", true),
            ("1", true),
            ("on", true),
            ("false", false),
            ("Off", false),
            ("0", false),
        ] {
            env::set_var("TOOLING_TEST_BOOL", value);
            assert_eq!(
                get_env_bool("TOOLING_TEST_BOOL").unwrap(),
                Some(expected),
                "value: {}",
                value
            );
        }
        env::set_var("TOOLING_TEST_BOOL", "maybe");
        assert!(get_env_bool("TOOLING_TEST_BOOL").is_err());
        env::remove_var("TOOLING_TEST_BOOL");
    }

    #[test]
    fn test_get_env_list() {
        env::set_var("TOOLING_TEST_LIST", "http://a.cl, ,http://b.cl ");
        assert_eq!(
            get_env_list("TOOLING_TEST_LIST").unwrap(),
            Some(vec!["http://a.cl".to_string(), "http://b.cl".to_string()])
        );
        env::remove_var("TOOLING_TEST_LIST");
    }

    #[test]
    fn test_get_env_secs() {
        env::set_var("TOOLING_TEST_SECS", "90");
        assert_eq!(
            get_env_secs("TOOLING_TEST_SECS").unwrap(),
            Some(Duration::from_secs(90))
        );
        env::remove_var("TOOLING_TEST_SECS");
    }
}

//! Environment-driven configuration
//!
//! Every loader distinguishes "unset" (`Ok(None)`) from "set but unusable" (`Err`), so
//! callers can layer environment values over file defaults without masking typos.
//!
//! ```rust
//! use tooling::config::{get_env_list, get_env_parse_or};
//!
//! let port: u16 = get_env_parse_or("DOC_EXAMPLE_UNSET_PORT", 8080).unwrap();
//! assert_eq!(port, 8080);
//! assert_eq!(get_env_list("DOC_EXAMPLE_UNSET_LIST").unwrap(), None);
//! ```

mod env;

pub use env::{
    get_env, get_env_bool, get_env_list, get_env_or, get_env_parse, get_env_parse_or,
    get_env_secs,
};

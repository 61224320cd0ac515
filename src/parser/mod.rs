//! Parser module for depscope.
//!
//! This module parses npm `package.json` manifests and flattens their
//! `dependencies`, `devDependencies` and `peerDependencies` maps into
//! [`PackageDescriptor`]s.
//!
//! # Example
//!
//! ```
//! use depscope::parser::{extract_descriptors, parse_str, DependencyType};
//!
//! let pkg = parse_str(r#"{"dependencies": {"react": "^18.0.0"}}"#).unwrap();
//! let deps = extract_descriptors(&pkg);
//!
//! assert_eq!(deps.len(), 1);
//! assert_eq!(deps[0].dep_type, DependencyType::Production);
//! ```

pub mod package_json;
pub mod types;

pub use package_json::{
    extract_descriptors, parse_str, ParseError, ParseResult,
};

pub use types::{DependencyMap, DependencyType, PackageDescriptor, PackageJson};

//! Reference-system tags and the authority-code resolution boundary.
//!
//! The compiler only resolves `AUTHORITY:code` identifiers to an opaque tag;
//! coordinate transformation math lives outside this crate.

/// Authority namespace assumed when an identifier carries none.
pub const DEFAULT_AUTHORITY: &str = "EPSG";

/// A resolved reference-system tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crs {
    authority: String,
    code: String,
}

impl Crs {
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

/// Failure to resolve an authority-code identifier, after the default
/// authority retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrsError {
    pub identifier: String,
}

impl std::fmt::Display for CrsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot resolve reference system '{}' (also tried '{}:{}')",
            self.identifier, DEFAULT_AUTHORITY, self.identifier
        )
    }
}

impl std::error::Error for CrsError {}

/// Resolve an authority-code string such as `EPSG:4326`. An identifier with
/// no authority part is retried once under [`DEFAULT_AUTHORITY`]; further
/// failure is fatal to the caller.
pub fn resolve(identifier: &str) -> Result<Crs, CrsError> {
    if let Some(crs) = try_parse(identifier) {
        return Ok(crs);
    }
    try_parse(&format!("{}:{}", DEFAULT_AUTHORITY, identifier)).ok_or(CrsError {
        identifier: identifier.to_string(),
    })
}

fn try_parse(identifier: &str) -> Option<Crs> {
    let (authority, code) = identifier.split_once(':')?;
    if authority.is_empty() || !authority.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(Crs {
        authority: authority.to_ascii_uppercase(),
        code: code.to_string(),
    })
}

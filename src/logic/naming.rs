use crate::error::ServiceError;

const MAX_NAME_LENGTH: usize = 255;

/// Serial numbers: printable, no path separators or wildcard characters,
/// bounded length.
pub fn check_serial_number(name: &str) -> Result<(), ServiceError> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        return Err(ServiceError::InvalidName(name.to_string()));
    }
    let valid = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '));
    if !valid || name.starts_with(' ') || name.ends_with(' ') {
        return Err(ServiceError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// File names: same character policy as serial numbers, plus a dot-only
/// name is rejected.
pub fn check_file_name(name: &str) -> Result<(), ServiceError> {
    check_serial_number(name)?;
    if name.chars().all(|c| c == '.') {
        return Err(ServiceError::InvalidName(name.to_string()));
    }
    Ok(())
}

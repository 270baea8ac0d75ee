/// Used when a tenant name sanitizes down to nothing.
pub const DEFAULT_STACK_NAME: &str = "MyTenant";

/// Whether `name` is usable as a stack name as-is (`^[A-Za-z][A-Za-z0-9-]*$`).
pub fn is_valid_stack_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        _ => false,
    }
}

/// Turn an arbitrary tenant name into a valid stack name, staying as close
/// to the input as possible.
pub fn sanitize_stack_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());

    for c in name.chars() {
        let c = if c == '_' || c == ' ' { '-' } else { c };
        if c == '-' {
            if !sanitized.ends_with('-') {
                sanitized.push('-');
            }
        } else if c.is_ascii_alphanumeric() {
            sanitized.push(c);
        }
    }

    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() {
        return DEFAULT_STACK_NAME.to_string();
    }

    if trimmed.starts_with(|c: char| c.is_ascii_alphabetic()) {
        trimmed.to_string()
    } else {
        format!("S{}", trimmed)
    }
}

/// The stack name for a tenant: the tenant name itself when valid, otherwise
/// its sanitized form. The tenant name still names the Connect resources.
pub fn stack_name_for(tenant_name: &str) -> String {
    if is_valid_stack_name(tenant_name) {
        tenant_name.to_string()
    } else {
        sanitize_stack_name(tenant_name)
    }
}

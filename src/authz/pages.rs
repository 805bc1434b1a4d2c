use super::permission::Requirement;
use super::registry::{Registry, RouteGuard, RouteMatch};

/// Strip query string, fragment and trailing slashes. `/` stays `/`.
pub fn normalize_route(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Guard entry governing `path`, if any.
///
/// Exact entries win. Otherwise the longest matching prefix applies; equal
/// lengths go to the entry declared first.
pub fn resolve_route<'r>(registry: &'r Registry, path: &str) -> Option<&'r RouteGuard> {
    let path = normalize_route(path);

    let mut best: Option<(&RouteGuard, usize)> = None;
    for guard in registry.routes() {
        let pattern = normalize_route(&guard.path);
        match guard.matching {
            RouteMatch::Exact if pattern == path => return Some(guard),
            RouteMatch::Prefix if prefix_matches(pattern, path) => {
                if best.map_or(true, |(_, len)| pattern.len() > len) {
                    best = Some((guard, pattern.len()));
                }
            }
            _ => {}
        }
    }

    best.map(|(guard, _)| guard)
}

/// Requirement for `path`. Unmatched routes resolve to the empty requirement.
pub fn route_requirement<'r>(registry: &'r Registry, path: &str) -> &'r Requirement {
    guard_requirement(resolve_route(registry, path))
}

/// Requirement of an already resolved guard; `None` means open.
pub fn guard_requirement(guard: Option<&RouteGuard>) -> &Requirement {
    static OPEN: Requirement = Requirement::AnyOf(Vec::new());
    guard.map_or(&OPEN, |guard| &guard.requirement)
}

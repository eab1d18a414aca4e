//! Paths handed to the axum router, checked for conflicts before mounting.
//!
//! axum refuses some combinations at insert time by panicking: parameters
//! with different names at the same position, a catch-all next to any other
//! route at its position, or one path served by two different services.
//! The builder checks every mount up front and reports `GatewayError::Config`.

use portico_core::{GatewayError, Result};

/// What serves a mounted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// REST handlers; several methods on one path merge.
    Rest,
    WebSocket,
    Static,
    /// Static folder at `/`, served as the router fallback.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub path: String,
    pub kind: MountKind,
}

impl Mount {
    pub fn new(path: impl Into<String>, kind: MountKind) -> Self {
        Self { path: path.into(), kind }
    }
}

enum Seg<'a> {
    Literal(&'a str),
    Param(&'a str),
    CatchAll,
}

fn seg(s: &str) -> Seg<'_> {
    if let Some(name) = s.strip_prefix(':') {
        Seg::Param(name)
    } else if s.starts_with('*') {
        Seg::CatchAll
    } else {
        Seg::Literal(s)
    }
}

/// True when axum cannot hold both templates: equal paths, or templates
/// that reach the same position with different parameter names or a
/// catch-all.
pub fn overlaps(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    for (x, y) in a.split('/').zip(b.split('/')) {
        match (seg(x), seg(y)) {
            (Seg::Literal(l), Seg::Literal(r)) if l == r => continue,
            (Seg::Param(l), Seg::Param(r)) if l == r => continue,
            (Seg::Param(_), Seg::Param(_)) => return true,
            (Seg::CatchAll, _) | (_, Seg::CatchAll) => return true,
            // static segments take priority over parameters
            _ => return false,
        }
    }
    false
}

fn conflicting(a: &Mount, b: &Mount) -> bool {
    if a.kind == MountKind::Fallback || b.kind == MountKind::Fallback {
        return a.kind == b.kind;
    }
    if a.path == b.path {
        return !(a.kind == MountKind::Rest && b.kind == MountKind::Rest);
    }
    overlaps(&a.path, &b.path)
}

/// Reject any pair of mounts axum would refuse.
pub fn check(mounts: &[Mount]) -> Result<()> {
    for (i, a) in mounts.iter().enumerate() {
        if let Some(b) = mounts[i + 1..].iter().find(|b| conflicting(a, b)) {
            return Err(GatewayError::Config(format!(
                "route {} ({:?}) conflicts with {} ({:?})",
                a.path, a.kind, b.path, b.kind
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(p: &str) -> Mount {
        Mount::new(p, MountKind::Rest)
    }

    #[test]
    fn parameter_names_must_agree() {
        assert!(check(&[rest("/v1/a/:x"), rest("/v1/a/:x")]).is_ok());
        assert!(check(&[rest("/v1/a/:x"), rest("/v1/a/:x/b")]).is_ok());
        assert!(check(&[rest("/v1/a/:x"), rest("/v1/a/:y")]).is_err());
        assert!(check(&[rest("/v1/a/:x"), rest("/v1/a/:y/b")]).is_err());
    }

    #[test]
    fn literals_may_sit_next_to_parameters() {
        assert!(check(&[rest("/v1/users/:id"), rest("/v1/users/me")]).is_ok());
        assert!(check(&[rest("/v1/a"), rest("/v2/:x")]).is_ok());
    }

    #[test]
    fn catch_all_owns_its_position() {
        let static_tail = Mount::new("/doc/*tail", MountKind::Static);
        assert!(check(&[static_tail.clone(), rest("/doc/:id")]).is_err());
        assert!(check(&[static_tail.clone(), rest("/doc/readme")]).is_err());
        assert!(check(&[static_tail, rest("/docs/:id")]).is_ok());
    }

    #[test]
    fn one_path_one_service() {
        let ws = Mount::new("/ws/demo", MountKind::WebSocket);
        assert!(check(&[ws.clone(), rest("/ws/demo")]).is_err());
        assert!(check(&[ws.clone(), ws]).is_err());

        let root = Mount::new("/", MountKind::Fallback);
        assert!(check(&[root.clone(), rest("/")]).is_ok());
        assert!(check(&[root.clone(), root]).is_err());
    }
}
